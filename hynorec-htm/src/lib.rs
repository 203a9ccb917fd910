//! Hardware transactional memory primitives.
//!
//! This crate brackets a region of code in a best-effort hardware
//! transaction: every load and store between [`begin`] and [`end`] either
//! commits atomically or is rolled back, with control rewinding to the
//! begin point carrying an abort status.
//!
//! Two backends exist. On `x86_64` with the `rtm` cargo feature enabled,
//! the bracket maps to Intel RTM (`xbegin`/`xend`/`xabort`/`xtest`).
//! Every other configuration gets the `unsupported` backend, whose
//! [`htm_supported`] reports `false` so callers can stay on a software
//! path; its other entry points are unreachable in a correct caller and
//! panic if reached.
//!
//! The safe way in is [`HardwareTx`], an RAII bracket whose retry handler
//! decides after every failed begin whether to try again.

cfg_if::cfg_if! {
    if #[cfg(all(target_arch = "x86_64", feature = "rtm"))] {
        #[path = "x86_64.rs"]
        mod back;
    } else {
        #[path = "unsupported.rs"]
        mod back;
    }
}

mod htm_word;

pub use htm_word::HtmWord;

use std::marker::PhantomData;

/// Status returned by [`begin`].
///
/// Either the transaction started, or it aborted and the predicates below
/// describe why.
#[repr(transparent)]
#[derive(PartialEq, Eq, Ord, PartialOrd, Copy, Clone, Debug, Hash)]
pub struct BeginCode(back::BeginCode);

impl BeginCode {
    #[inline]
    pub fn is_started(&self) -> bool {
        self.0.is_started()
    }

    #[inline]
    pub fn is_explicit_abort(&self) -> bool {
        self.0.is_explicit_abort()
    }

    #[inline]
    pub fn is_retry(&self) -> bool {
        self.0.is_retry()
    }

    #[inline]
    pub fn is_conflict(&self) -> bool {
        self.0.is_conflict()
    }

    #[inline]
    pub fn is_capacity(&self) -> bool {
        self.0.is_capacity()
    }
}

/// Status returned by [`test`].
#[repr(transparent)]
#[derive(PartialEq, Eq, Ord, PartialOrd, Copy, Clone, Debug, Hash)]
pub struct TestCode(back::TestCode);

impl TestCode {
    #[inline]
    pub fn in_transaction(&self) -> bool {
        self.0.in_transaction()
    }
}

/// Starts a hardware transaction, or reports why one could not start.
///
/// # Safety
///
/// Must not be called while a hardware transaction is already active on
/// this thread, and the caller must pair a started transaction with [`end`]
/// or [`abort`] on the same thread.
#[inline]
pub unsafe fn begin() -> BeginCode {
    BeginCode(back::begin())
}

/// Aborts the active hardware transaction, rolling back its effects.
///
/// Control rewinds to the matching [`begin`], which returns again with a
/// [`BeginCode`] carrying the explicit-abort flag and the sentinel code.
///
/// # Safety
///
/// A hardware transaction must be active on this thread; outside one the
/// instruction is a no-op and the declared divergence is a lie.
#[inline]
pub unsafe fn abort() -> ! {
    back::abort()
}

/// Probes whether a hardware transaction is active on this thread.
///
/// # Safety
///
/// Requires a backend with hardware support.
#[inline]
pub unsafe fn test() -> TestCode {
    TestCode(back::test())
}

/// Commits the active hardware transaction.
///
/// # Safety
///
/// A hardware transaction must be active on this thread.
#[inline]
pub unsafe fn end() {
    back::end()
}

/// True if the running processor and build support hardware transactions.
#[inline]
pub fn htm_supported() -> bool {
    back::htm_supported()
}

/// An active hardware transaction, committed when dropped.
///
/// `HardwareTx` doubles as a witness: APIs that must only run inside a
/// transaction (raw [`HtmWord`] access, for one) take `&HardwareTx`.
#[derive(Debug)]
pub struct HardwareTx {
    _private: PhantomData<*mut ()>,
}

impl Drop for HardwareTx {
    #[inline]
    fn drop(&mut self) {
        unsafe { end() }
    }
}

impl HardwareTx {
    /// Begins a hardware transaction, consulting `retry_handler` after
    /// every failed begin: `Ok(())` tries again, `Err` gives up.
    ///
    /// Any abort between a successful begin and the end of the bracket
    /// rewinds execution into this loop with the hardware state rolled
    /// back, so the handler also observes aborts that happen "later".
    ///
    /// # Safety
    ///
    /// Same contract as [`begin`]. The returned bracket must be dropped on
    /// this thread before another one is started.
    #[inline]
    pub unsafe fn begin<F, E>(mut retry_handler: F) -> Result<Self, E>
    where
        F: FnMut(BeginCode) -> Result<(), E>,
    {
        loop {
            let b = begin();
            if b.is_started() {
                return Ok(HardwareTx {
                    _private: PhantomData,
                });
            } else {
                retry_handler(b)?
            }
        }
    }

    /// Explicitly aborts this transaction. Never returns; see [`abort`].
    #[inline(always)]
    pub fn abort(&self) -> ! {
        unsafe { abort() }
    }
}
