//! The global sequence lock.
//!
//! A single padded counter whose parity encodes the lock state: even means
//! no software transaction is in its write-back phase, odd means exactly
//! one is. The value is monotone and every successful software write-back
//! advances it by exactly 2, so a sampled even value doubles as a logical
//! timestamp for read validation.

use crossbeam_utils::{Backoff, CachePadded};
use std::sync::atomic::{
    AtomicUsize,
    Ordering::{AcqRel, Acquire, Relaxed, Release},
};

/// A sampled sequence lock value.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct Version(usize);

impl Version {
    /// True while a software transaction owns the write-back phase.
    #[inline]
    pub fn is_write_locked(self) -> bool {
        self.0 & 1 != 0
    }

    #[inline]
    fn acquired(self) -> usize {
        debug_assert!(
            !self.is_write_locked(),
            "acquiring the sequence lock from an odd version"
        );
        self.0 + 1
    }

    #[cfg(test)]
    pub fn value(self) -> usize {
        self.0
    }
}

#[derive(Debug)]
pub struct SeqLock {
    value: CachePadded<AtomicUsize>,
}

impl SeqLock {
    #[inline]
    pub fn new() -> Self {
        SeqLock {
            value: CachePadded::new(AtomicUsize::new(0)),
        }
    }

    /// Atomically samples the current version.
    #[inline]
    pub fn sample(&self) -> Version {
        Version(self.value.load(Acquire))
    }

    /// Spins until the lock is even, returning the observed version.
    #[inline]
    pub fn await_even(&self) -> Version {
        let backoff = Backoff::new();
        loop {
            let v = self.sample();
            if !v.is_write_locked() {
                return v;
            }
            backoff.spin();
        }
    }

    /// Attempts to move the lock from the even version `rv` to the odd
    /// version `rv + 1`, claiming exclusive write-back rights. Fails if any
    /// other software transaction committed after `rv` was sampled.
    #[inline]
    #[must_use]
    pub fn try_acquire(&self, rv: Version) -> bool {
        self.value
            .compare_exchange(rv.0, rv.acquired(), AcqRel, Relaxed)
            .is_ok()
    }

    /// Restores even parity, publishing the write-back.
    ///
    /// Must only be called by the thread that acquired the lock, exactly
    /// once per acquisition.
    #[inline]
    pub fn release(&self) {
        let prev = self.value.fetch_add(1, Release);
        debug_assert!(prev & 1 == 1, "released a sequence lock that was not held");
    }
}

#[cfg(test)]
mod tests {
    use super::SeqLock;

    #[test]
    fn starts_even() {
        let lock = SeqLock::new();
        assert!(!lock.sample().is_write_locked());
        assert_eq!(lock.sample().value(), 0);
    }

    #[test]
    fn acquire_release_transitions() {
        let lock = SeqLock::new();
        let rv = lock.await_even();
        assert!(lock.try_acquire(rv));
        // Acquisition moves v to v + 1 and no further.
        assert!(lock.sample().is_write_locked());
        assert_eq!(lock.sample().value(), rv.value() + 1);
        lock.release();
        // Release lands on exactly v + 2, even again.
        assert!(!lock.sample().is_write_locked());
        assert_eq!(lock.sample().value(), rv.value() + 2);
    }

    #[test]
    fn stale_acquire_fails() {
        let lock = SeqLock::new();
        let stale = lock.await_even();
        assert!(lock.try_acquire(stale));
        lock.release();
        assert!(!lock.try_acquire(stale));
        let fresh = lock.await_even();
        assert!(lock.try_acquire(fresh));
        lock.release();
        assert_eq!(lock.sample().value(), stale.value() + 4);
    }
}
