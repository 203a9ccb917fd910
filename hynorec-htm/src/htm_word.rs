use crate::HardwareTx;
use std::{
    cell::UnsafeCell,
    ops::{Deref, DerefMut},
    sync::atomic::AtomicUsize,
};

/// A word-sized memory cell readable from both sides of a hybrid runtime.
///
/// Inside a hardware transaction the cell is accessed through plain loads
/// and stores, witnessed by `&HardwareTx`; the hardware tracks and rolls
/// them back on abort. Everywhere else the cell derefs to an ordinary
/// atomic, which is what software-side validation and write-back use.
#[derive(Debug)]
#[repr(transparent)]
pub struct HtmWord {
    inner: UnsafeCell<AtomicUsize>,
}

unsafe impl Send for HtmWord {}
unsafe impl Sync for HtmWord {}

impl HtmWord {
    #[inline]
    pub const fn new(value: usize) -> Self {
        HtmWord {
            inner: UnsafeCell::new(AtomicUsize::new(value)),
        }
    }

    #[inline(always)]
    fn as_raw(&self, _: &HardwareTx) -> *mut usize {
        self.inner.get() as *mut usize
    }

    /// Transactional load.
    #[inline(always)]
    pub fn get(&self, htx: &HardwareTx) -> usize {
        unsafe { *self.as_raw(htx) }
    }

    /// Transactional store, rolled back if the transaction aborts.
    #[inline(always)]
    pub fn set(&self, htx: &HardwareTx, value: usize) {
        unsafe { *self.as_raw(htx) = value }
    }
}

impl Deref for HtmWord {
    type Target = AtomicUsize;

    #[inline(always)]
    fn deref(&self) -> &Self::Target {
        unsafe { &*self.inner.get() }
    }
}

impl DerefMut for HtmWord {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.inner.get() }
    }
}

#[cfg(test)]
mod tests {
    use super::HtmWord;
    use std::sync::atomic::Ordering::{Acquire, Release};

    #[test]
    fn atomic_view() {
        let word = HtmWord::new(7);
        assert_eq!(word.load(Acquire), 7);
        word.store(13, Release);
        assert_eq!(word.load(Acquire), 13);
        assert_eq!(word.fetch_add(1, Release), 13);
        assert_eq!(word.load(Acquire), 14);
    }
}
