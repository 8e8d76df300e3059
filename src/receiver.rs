use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::env;

pub const DEFAULT_CLOCK_HZ: u32 = 100_000_000;
pub const DEFAULT_BAUD: u32 = 115_200;

/// Serial link timing. `clock_hz / baud` gives the bit interval in clock
/// ticks; an interval that rounds to zero is a configuration defect, never a
/// runtime fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UartConfig {
    pub clock_hz: u32,
    pub baud: u32,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self {
            clock_hz: DEFAULT_CLOCK_HZ,
            baud: DEFAULT_BAUD,
        }
    }
}

impl UartConfig {
    /// Strict bit interval: refuses a configuration whose interval rounds
    /// to zero ticks.
    pub fn bit_time(&self) -> Result<u32> {
        if self.baud == 0 {
            return Err(CoreError::InvalidConfig("baud rate is zero".into()));
        }
        let ticks = self.clock_hz / self.baud;
        if ticks == 0 {
            return Err(CoreError::InvalidConfig(format!(
                "clock {} Hz too slow for {} baud (bit interval rounds to 0 ticks)",
                self.clock_hz, self.baud
            )));
        }
        Ok(ticks)
    }

    /// Lenient bit interval: clamps to 1 tick instead of refusing, matching
    /// the bring-up path where the link runs one bit per clock.
    pub fn bit_time_clamped(&self) -> u32 {
        let ticks = match self.baud {
            0 => 0,
            baud => self.clock_hz / baud,
        };
        if ticks == 0 {
            if env::var("RVBOOT_TRACE").is_ok() {
                eprintln!(
                    "[uart-config] clock {} Hz too slow for {} baud, clamping to 1 tick/bit",
                    self.clock_hz, self.baud
                );
            }
            1
        } else {
            ticks
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RxState {
    Idle,
    Start,
    /// Index of the data bit sampled when the current interval elapses.
    Data(u8),
    Stop,
}

/// A byte reconstructed from one serial frame. `framing_error` means the
/// stop bit sampled low; the byte is delivered anyway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxByte {
    pub value: u8,
    pub framing_error: bool,
}

/// Receiver for the 8N1 wire format: one low start bit, eight data bits LSB
/// first, one high stop bit. Advanced by one `tick` per clock cycle; the
/// line is sampled on the first tick of each bit cell.
pub struct BitReceiver {
    bit_time: u32,
    state: RxState,
    countdown: u32,
    shift: u8,
    framing_errors: u64,
    bytes_received: u64,
}

impl BitReceiver {
    pub fn new(config: &UartConfig) -> Result<Self> {
        Ok(Self::with_bit_time(config.bit_time()?))
    }

    /// `bit_time` is clamped to a minimum of one tick; sampling at an
    /// undefined rate is never allowed.
    pub fn with_bit_time(bit_time: u32) -> Self {
        Self {
            bit_time: bit_time.max(1),
            state: RxState::Idle,
            countdown: 0,
            shift: 0,
            framing_errors: 0,
            bytes_received: 0,
        }
    }

    pub fn bit_time(&self) -> u32 {
        self.bit_time
    }

    /// True from start-bit detection until the stop bit has been sampled.
    pub fn busy(&self) -> bool {
        self.state != RxState::Idle
    }

    pub fn framing_errors(&self) -> u64 {
        self.framing_errors
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    /// Synchronous reset: back to `Idle`, partial frame discarded. Counters
    /// survive reset; they are diagnostics, not machine state.
    pub fn reset(&mut self) {
        self.state = RxState::Idle;
        self.countdown = 0;
        self.shift = 0;
    }

    /// Advance one clock cycle with the current level of the serial line.
    /// Returns a completed byte exactly once per frame.
    pub fn tick(&mut self, line: bool) -> Option<RxByte> {
        match self.state {
            RxState::Idle => {
                if !line {
                    self.state = RxState::Start;
                    self.countdown = self.bit_time - 1;
                    self.shift = 0;
                }
                None
            }
            RxState::Start => {
                if self.countdown > 0 {
                    self.countdown -= 1;
                    return None;
                }
                // First tick of the data-0 cell.
                self.shift = line as u8;
                self.state = RxState::Data(1);
                self.countdown = self.bit_time - 1;
                None
            }
            RxState::Data(index) => {
                if self.countdown > 0 {
                    self.countdown -= 1;
                    return None;
                }
                self.shift |= (line as u8) << index;
                self.state = if index >= 7 {
                    RxState::Stop
                } else {
                    RxState::Data(index + 1)
                };
                self.countdown = self.bit_time - 1;
                None
            }
            RxState::Stop => {
                if self.countdown > 0 {
                    self.countdown -= 1;
                    return None;
                }
                let framing_error = !line;
                if framing_error {
                    self.framing_errors = self.framing_errors.wrapping_add(1);
                    if env::var("RVBOOT_TRACE").is_ok() {
                        eprintln!(
                            "[uart-framing] stop bit low, byte=0x{:02X} delivered anyway",
                            self.shift
                        );
                    }
                }
                self.bytes_received = self.bytes_received.wrapping_add(1);
                self.state = RxState::Idle;
                Some(RxByte {
                    value: self.shift,
                    framing_error,
                })
            }
        }
    }
}
