//! Serial bootloader and memory subsystem model for a small RISC-V core.
//!
//! The modeled hardware lets a host reprogram the core's instruction store
//! over a one-wire serial link while the normal memory-mapped bus keeps
//! serving data accesses. Everything is single-clock-domain: each component
//! is an explicit state machine advanced by one [`BootSystem::tick`] call
//! per clock cycle, and the only "suspension" anywhere is the bit-interval
//! countdown inside the receiver.
//!
//! Pipeline: serial line -> [`BitReceiver`] -> byte -> [`ProgramLoader`]
//! (gate + word assembler) -> bounds-checked [`InstructionMemory`] write.
//! The executing core reaches the same stores and the [`RegisterFile`]
//! through [`BootSystem::bus_read`]/[`BootSystem::bus_write`], and fetches
//! through [`BootSystem::fetch`], which stalls while a programming session
//! is open.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod loader;
pub mod memory;
pub mod receiver;
pub mod registers;

pub use loader::{ProgramLoader, WORD_BYTES};
pub use memory::{
    DataMemory, InstructionMemory, DMEM_BASE_ADDR, DMEM_BYTES, IMEM_BASE_ADDR, IMEM_WORDS,
    NOP_ENCODING,
};
pub use receiver::{BitReceiver, RxByte, UartConfig, DEFAULT_BAUD, DEFAULT_CLOCK_HZ};
pub use registers::{
    RegisterFile, CTRL_PROGRAM_ENABLE, STATUS_RECEIVER_BUSY, STATUS_SESSION_ACTIVE,
    UART_CTRL_ADDR, UART_DATA_ADDR, UART_STATUS_ADDR,
};

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialize error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Serializable summary of the live machine state, for diagnostics and the
/// CLI's state dump.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SystemSnapshot {
    pub cycles: u64,
    pub session_active: bool,
    pub receiver_busy: bool,
    pub write_cursor: u32,
    pub pending_bytes: usize,
    pub words_written: u64,
    pub bytes_received: u64,
    pub bytes_dropped: u64,
    pub framing_errors: u64,
    pub last_rx_byte: u8,
    pub imem_oob_writes: u64,
}

/// The whole subsystem wired together: receiver, gate/assembler, both
/// bounds-checked stores, and the register bank, advanced in lockstep.
pub struct BootSystem {
    pub imem: InstructionMemory,
    pub dmem: DataMemory,
    pub registers: RegisterFile,
    receiver: BitReceiver,
    loader: ProgramLoader,
    cycles: u64,
}

impl BootSystem {
    pub fn new(config: &UartConfig) -> Result<Self> {
        Ok(Self::with_bit_time(config.bit_time()?))
    }

    pub fn with_bit_time(bit_time: u32) -> Self {
        Self {
            imem: InstructionMemory::new(),
            dmem: DataMemory::new(),
            registers: RegisterFile::new(),
            receiver: BitReceiver::with_bit_time(bit_time),
            loader: ProgramLoader::new(),
            cycles: 0,
        }
    }

    pub fn bit_time(&self) -> u32 {
        self.receiver.bit_time()
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn session_active(&self) -> bool {
        self.loader.session_active()
    }

    pub fn receiver_busy(&self) -> bool {
        self.receiver.busy()
    }

    /// Synchronous reset: every state machine back to its initial state in
    /// one call. Memory contents survive, matching the hardware where reset
    /// does not clear the arrays.
    pub fn reset(&mut self) {
        self.receiver.reset();
        self.loader.reset();
        self.registers.reset();
        self.cycles = 0;
    }

    /// One rising clock edge. `rx_line` is the sampled level of the serial
    /// input; hold it high while the link is idle.
    pub fn tick(&mut self, rx_line: bool) {
        self.cycles = self.cycles.wrapping_add(1);
        if let Some(rx) = self.receiver.tick(rx_line) {
            self.registers.record_rx_byte(rx.value);
            self.loader.push_byte(rx.value, &mut self.imem);
        }
    }

    /// Instruction fetch for the executing core. Held (returns `None`) for
    /// the entire duration a programming session is open; the instruction
    /// store must never be read while it is being rewritten.
    pub fn fetch(&self, word_addr: u32) -> Option<u32> {
        if self.loader.session_active() {
            return None;
        }
        Some(self.imem.peek(word_addr))
    }

    /// Core-side bus read: UART registers, then the data-store window, then
    /// the instruction-store window. Unmapped or out-of-range addresses
    /// yield the owning store's safe default.
    pub fn bus_read(&mut self, addr: u32) -> u32 {
        let session_active = self.loader.session_active();
        let receiver_busy = self.receiver.busy();
        if let Some(value) = self
            .registers
            .handle_read(addr, session_active, receiver_busy)
        {
            return value;
        }
        if addr >= DMEM_BASE_ADDR {
            return self.dmem.read_word(addr - DMEM_BASE_ADDR);
        }
        self.imem.read((addr - IMEM_BASE_ADDR) / 4)
    }

    /// Core-side bus write. A CTRL write moves the programming gate on the
    /// same edge. Writes into the instruction-store window are honored only
    /// while no session is open; the loader is the sole writer during
    /// programming.
    pub fn bus_write(&mut self, addr: u32, value: u32) {
        if self.registers.handle_write(addr, value) {
            self.loader.set_enabled(self.registers.program_enable());
            return;
        }
        if addr >= DMEM_BASE_ADDR {
            self.dmem.write_word(addr - DMEM_BASE_ADDR, value);
            return;
        }
        if !self.loader.session_active() {
            self.imem.write((addr - IMEM_BASE_ADDR) / 4, value);
        }
    }

    /// Drive one complete 8N1 frame on the serial line, each bit held for
    /// exactly one bit interval. Convenience for hosts and tests; the
    /// timing is identical to toggling `tick` by hand.
    pub fn feed_byte_frame(&mut self, byte: u8) {
        let bit_time = self.receiver.bit_time();
        let hold = |sys: &mut Self, level: bool| {
            for _ in 0..bit_time {
                sys.tick(level);
            }
        };
        hold(self, false);
        for bit in 0..8 {
            hold(self, (byte >> bit) & 1 == 1);
        }
        hold(self, true);
    }

    /// Hold the line idle for `ticks` cycles.
    pub fn idle(&mut self, ticks: u32) {
        for _ in 0..ticks {
            self.tick(true);
        }
    }

    pub fn snapshot(&self) -> SystemSnapshot {
        SystemSnapshot {
            cycles: self.cycles,
            session_active: self.loader.session_active(),
            receiver_busy: self.receiver.busy(),
            write_cursor: self.loader.write_cursor(),
            pending_bytes: self.loader.pending_bytes(),
            words_written: self.loader.words_written(),
            bytes_received: self.receiver.bytes_received(),
            bytes_dropped: self.loader.bytes_dropped(),
            framing_errors: self.receiver.framing_errors(),
            last_rx_byte: self.registers.last_rx_byte(),
            imem_oob_writes: self.imem.oob_writes(),
        }
    }
}
