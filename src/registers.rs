use std::collections::VecDeque;

pub const UART_DATA_ADDR: u32 = 0x8000_0004;
pub const UART_CTRL_ADDR: u32 = 0x8000_0008;
pub const UART_STATUS_ADDR: u32 = 0x8000_000C;

/// CTRL bit 1 drives the programming gate. Remaining bits are reserved for
/// link/session control owned by the executing core; they are stored and
/// read back but have no effect here.
pub const CTRL_PROGRAM_ENABLE: u32 = 1 << 1;

pub const STATUS_SESSION_ACTIVE: u32 = 1 << 0;
pub const STATUS_RECEIVER_BUSY: u32 = 1 << 1;

/// DATA/CTRL/STATUS register bank behind the fixed bus addresses. STATUS is
/// composed at read time from live session/receiver state, so the bank only
/// stores what it owns: the last received byte, the CTRL latch, and the
/// outbound byte queue.
pub struct RegisterFile {
    data: u8,
    ctrl: u32,
    tx_queue: VecDeque<u8>,
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterFile {
    pub fn new() -> Self {
        Self {
            data: 0,
            ctrl: 0,
            tx_queue: VecDeque::new(),
        }
    }

    pub fn reset(&mut self) {
        self.data = 0;
        self.ctrl = 0;
        self.tx_queue.clear();
    }

    pub fn is_uart_addr(addr: u32) -> bool {
        matches!(addr, UART_DATA_ADDR | UART_CTRL_ADDR | UART_STATUS_ADDR)
    }

    /// Bus read decode. Returns `None` for addresses outside the register
    /// bank so the caller can fall through to the memory windows.
    pub fn handle_read(&self, addr: u32, session_active: bool, receiver_busy: bool) -> Option<u32> {
        match addr {
            UART_DATA_ADDR => Some(self.data as u32),
            UART_CTRL_ADDR => Some(self.ctrl),
            UART_STATUS_ADDR => {
                let mut status = 0;
                if session_active {
                    status |= STATUS_SESSION_ACTIVE;
                }
                if receiver_busy {
                    status |= STATUS_RECEIVER_BUSY;
                }
                Some(status)
            }
            _ => None,
        }
    }

    /// Bus write decode. Returns true when the address belonged to the
    /// bank. STATUS is read-only; writes to it are accepted and dropped.
    pub fn handle_write(&mut self, addr: u32, value: u32) -> bool {
        match addr {
            UART_DATA_ADDR => {
                self.tx_queue.push_back((value & 0xFF) as u8);
                true
            }
            UART_CTRL_ADDR => {
                self.ctrl = value;
                true
            }
            UART_STATUS_ADDR => true,
            _ => false,
        }
    }

    pub fn program_enable(&self) -> bool {
        self.ctrl & CTRL_PROGRAM_ENABLE != 0
    }

    /// Latch a byte completed by the receiver; visible on the next DATA read.
    pub fn record_rx_byte(&mut self, byte: u8) {
        self.data = byte;
    }

    pub fn last_rx_byte(&self) -> u8 {
        self.data
    }

    /// Drain one byte queued for transmission. The transmit wire itself is
    /// outside this core; the host or test harness consumes the queue.
    pub fn take_tx_byte(&mut self) -> Option<u8> {
        self.tx_queue.pop_front()
    }

    pub fn tx_pending(&self) -> usize {
        self.tx_queue.len()
    }
}
