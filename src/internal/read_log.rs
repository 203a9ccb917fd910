//! The software read set.
//!
//! An ordered log of `(address, observed value)` pairs recording every
//! shared read a software transaction has performed. The only meaningful
//! operation besides recording is checking that the observations still
//! match shared memory. Duplicate addresses are permitted.

use crate::mem::TxMemory;

const READ_CAPACITY: usize = 1024;

#[derive(Clone, Copy, Debug)]
struct ReadEntry {
    addr: usize,
    observed: usize,
}

#[derive(Debug)]
pub struct ReadLog {
    entries: Vec<ReadEntry>,
}

impl ReadLog {
    #[inline]
    pub fn new() -> Self {
        ReadLog {
            entries: Vec::with_capacity(READ_CAPACITY),
        }
    }

    #[inline]
    pub fn record(&mut self, addr: usize, observed: usize) {
        self.entries.push(ReadEntry { addr, observed })
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.entries.clear()
    }

    /// True if every logged observation still matches shared memory.
    #[inline]
    pub fn still_valid(&self, mem: &TxMemory) -> bool {
        self.entries
            .iter()
            .all(|entry| mem.load(entry.addr) == entry.observed)
    }
}
