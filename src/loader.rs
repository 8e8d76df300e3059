use crate::memory::InstructionMemory;
use std::env;

pub const WORD_BYTES: usize = 4;

/// Programming gate and word assembler. Mirrors CTRL bit 1: while the gate
/// is open, received bytes accumulate into little-endian words and program
/// the instruction store sequentially from word 0; while closed, bytes are
/// consumed and dropped.
pub struct ProgramLoader {
    active: bool,
    partial: [u8; WORD_BYTES],
    count: usize,
    cursor: u32,
    words_written: u64,
    bytes_dropped: u64,
}

impl Default for ProgramLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramLoader {
    pub fn new() -> Self {
        Self {
            active: false,
            partial: [0; WORD_BYTES],
            count: 0,
            cursor: 0,
            words_written: 0,
            bytes_dropped: 0,
        }
    }

    pub fn session_active(&self) -> bool {
        self.active
    }

    /// Word-indexed address the next completed word will be written to.
    /// Meaningless while no session is open.
    pub fn write_cursor(&self) -> u32 {
        self.cursor
    }

    pub fn pending_bytes(&self) -> usize {
        self.count
    }

    pub fn words_written(&self) -> u64 {
        self.words_written
    }

    pub fn bytes_dropped(&self) -> u64 {
        self.bytes_dropped
    }

    /// Apply the CTRL programming-enable level. Only edges have an effect:
    /// opening starts a fresh session at the store base; closing discards
    /// any partial word without writing it.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled == self.active {
            return;
        }
        self.active = enabled;
        if enabled {
            self.cursor = 0;
            self.count = 0;
            if env::var("RVBOOT_TRACE").is_ok() {
                eprintln!("[loader] programming session opened");
            }
        } else {
            if self.count > 0 && env::var("RVBOOT_TRACE").is_ok() {
                eprintln!(
                    "[loader] session closed with {} partial byte(s) discarded",
                    self.count
                );
            }
            self.count = 0;
        }
    }

    /// Synchronous reset: session closed, buffer cleared.
    pub fn reset(&mut self) {
        self.active = false;
        self.count = 0;
        self.cursor = 0;
    }

    /// Consume one byte from the receiver. Writes a word to `imem` each
    /// time four bytes have arrived while the session is open.
    pub fn push_byte(&mut self, byte: u8, imem: &mut InstructionMemory) {
        if !self.active {
            self.bytes_dropped = self.bytes_dropped.wrapping_add(1);
            return;
        }
        self.partial[self.count] = byte;
        self.count += 1;
        if self.count == WORD_BYTES {
            let word = u32::from_le_bytes(self.partial);
            imem.write(self.cursor, word);
            if env::var("RVBOOT_TRACE").is_ok() {
                eprintln!(
                    "[loader] word 0x{word:08X} -> imem[{cursor}]",
                    cursor = self.cursor
                );
            }
            self.cursor = self.cursor.wrapping_add(1);
            self.words_written = self.words_written.wrapping_add(1);
            self.count = 0;
        }
    }
}
