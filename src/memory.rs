use std::env;

/// Canonical no-operation encoding (`addi x0, x0, 0`). Returned for any
/// out-of-range instruction fetch so the pipeline always decodes something
/// harmless.
pub const NOP_ENCODING: u32 = 0x0000_0013;

pub const IMEM_WORDS: usize = 64;
pub const DMEM_BYTES: usize = 1024;

pub const IMEM_BASE_ADDR: u32 = 0x0000_0000;
pub const DMEM_BASE_ADDR: u32 = 0x1000_0000;

fn trace_enabled() -> bool {
    env::var("RVBOOT_TRACE").is_ok()
}

/// Word-indexed instruction store. Every access is range-checked before the
/// backing array is touched; invalid reads return [`NOP_ENCODING`] and
/// invalid writes are dropped.
#[derive(Clone)]
pub struct InstructionMemory {
    words: Vec<u32>,
    oob_reads: u64,
    oob_writes: u64,
}

impl Default for InstructionMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl InstructionMemory {
    pub fn new() -> Self {
        Self::with_capacity(IMEM_WORDS)
    }

    pub fn with_capacity(words: usize) -> Self {
        Self {
            words: vec![NOP_ENCODING; words],
            oob_reads: 0,
            oob_writes: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.words.len()
    }

    pub fn read(&mut self, word_addr: u32) -> u32 {
        match self.words.get(word_addr as usize) {
            Some(word) => *word,
            None => {
                self.oob_reads = self.oob_reads.wrapping_add(1);
                if trace_enabled() {
                    eprintln!("[imem-oob-read] word_addr=0x{word_addr:08X}");
                }
                NOP_ENCODING
            }
        }
    }

    /// Read without recording an out-of-range event. Used by fetch paths
    /// that only peek (the stall check re-reads after the session closes).
    pub fn peek(&self, word_addr: u32) -> u32 {
        self.words
            .get(word_addr as usize)
            .copied()
            .unwrap_or(NOP_ENCODING)
    }

    pub fn write(&mut self, word_addr: u32, word: u32) {
        match self.words.get_mut(word_addr as usize) {
            Some(slot) => *slot = word,
            None => {
                self.oob_writes = self.oob_writes.wrapping_add(1);
                if trace_enabled() {
                    eprintln!("[imem-oob-write] word_addr=0x{word_addr:08X} word=0x{word:08X}");
                }
            }
        }
    }

    pub fn load_words(&mut self, blob: &[u32]) {
        let limit = self.words.len().min(blob.len());
        self.words[..limit].copy_from_slice(&blob[..limit]);
    }

    pub fn as_words(&self) -> &[u32] {
        &self.words
    }

    pub fn fill_nop(&mut self) {
        self.words.fill(NOP_ENCODING);
    }

    pub fn oob_reads(&self) -> u64 {
        self.oob_reads
    }

    pub fn oob_writes(&self) -> u64 {
        self.oob_writes
    }
}

/// Byte-indexed data store with the same contract: invalid reads return 0,
/// invalid writes never touch storage.
#[derive(Clone)]
pub struct DataMemory {
    bytes: Vec<u8>,
    oob_reads: u64,
    oob_writes: u64,
}

impl Default for DataMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl DataMemory {
    pub fn new() -> Self {
        Self::with_capacity(DMEM_BYTES)
    }

    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            bytes: vec![0; bytes],
            oob_reads: 0,
            oob_writes: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    pub fn read(&mut self, addr: u32) -> u8 {
        match self.bytes.get(addr as usize) {
            Some(byte) => *byte,
            None => {
                self.oob_reads = self.oob_reads.wrapping_add(1);
                if trace_enabled() {
                    eprintln!("[dmem-oob-read] addr=0x{addr:08X}");
                }
                0
            }
        }
    }

    pub fn write(&mut self, addr: u32, value: u8) {
        match self.bytes.get_mut(addr as usize) {
            Some(slot) => *slot = value,
            None => {
                self.oob_writes = self.oob_writes.wrapping_add(1);
                if trace_enabled() {
                    eprintln!("[dmem-oob-write] addr=0x{addr:08X} value=0x{value:02X}");
                }
            }
        }
    }

    /// Little-endian word load; each byte goes through the same bounds
    /// check as a scalar access.
    pub fn read_word(&mut self, addr: u32) -> u32 {
        let mut value = 0u32;
        for offset in 0..4u32 {
            value |= (self.read(addr.wrapping_add(offset)) as u32) << (offset * 8);
        }
        value
    }

    pub fn write_word(&mut self, addr: u32, value: u32) {
        for offset in 0..4u32 {
            let byte = ((value >> (offset * 8)) & 0xFF) as u8;
            self.write(addr.wrapping_add(offset), byte);
        }
    }

    pub fn load_bytes(&mut self, blob: &[u8]) {
        let limit = self.bytes.len().min(blob.len());
        self.bytes[..limit].copy_from_slice(&blob[..limit]);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn oob_reads(&self) -> u64 {
        self.oob_reads
    }

    pub fn oob_writes(&self) -> u64 {
        self.oob_writes
    }
}
