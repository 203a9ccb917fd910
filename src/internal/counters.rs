//! Per-thread hardware commit counters.
//!
//! Slot `i` is incremented by thread `i` inside its hardware transaction
//! immediately before commit, so the increment becomes visible atomically
//! with the transaction's writes. A software transaction snapshots the
//! whole array at begin; any slot that has moved by commit time proves a
//! hardware transaction committed somewhere inside the software
//! transaction's lifetime and forces revalidation of the read set.
//!
//! Each slot is single-writer multi-reader and padded to its own cache
//! line.

use crossbeam_utils::CachePadded;
use hynorec_htm::{HardwareTx, HtmWord};
use std::sync::atomic::Ordering::Acquire;

/// Counter slots provisioned. Sized past the thread cap so the array never
/// shares its tail with unrelated data.
pub const COUNTER_SLOTS: usize = 72;

#[derive(Debug)]
pub struct CommitCounters {
    slots: Box<[CachePadded<HtmWord>]>,
}

impl CommitCounters {
    pub fn new() -> Self {
        CommitCounters {
            slots: (0..COUNTER_SLOTS)
                .map(|_| CachePadded::new(HtmWord::new(0)))
                .collect(),
        }
    }

    /// Transactional increment of `slot`, rolled back by the hardware if
    /// the surrounding transaction aborts.
    #[inline]
    pub fn bump(&self, slot: usize, htx: &HardwareTx) {
        let word = &self.slots[slot];
        word.set(htx, word.get(htx) + 1);
    }

    /// Copies every slot into the caller's snapshot buffer.
    #[inline]
    pub fn snapshot_into(&self, snapshot: &mut CounterSnapshot) {
        for (seen, slot) in snapshot.values.iter_mut().zip(self.slots.iter()) {
            *seen = slot.load(Acquire);
        }
    }

    /// True if any slot has moved since `snapshot` was taken.
    #[inline]
    pub fn changed_since(&self, snapshot: &CounterSnapshot) -> bool {
        self.slots
            .iter()
            .zip(snapshot.values.iter())
            .any(|(slot, &seen)| slot.load(Acquire) != seen)
    }

    /// Untracked increment standing in for a hardware commit in tests.
    #[cfg(test)]
    pub fn bump_untracked(&self, slot: usize) {
        use std::sync::atomic::Ordering::Release;
        let _ = self.slots[slot].fetch_add(1, Release);
    }
}

/// A caller-owned copy of the counter array, taken at software begin.
#[derive(Debug)]
pub struct CounterSnapshot {
    values: Box<[usize]>,
}

impl CounterSnapshot {
    pub fn new() -> Self {
        CounterSnapshot {
            values: vec![0; COUNTER_SLOTS].into_boxed_slice(),
        }
    }
}
