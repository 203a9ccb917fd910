//! Per-thread software transaction state and the NOrec engine.
//!
//! NOrec keeps no per-location metadata. Consistency comes from two global
//! facts: the sequence lock (software commits serialize on it and advance
//! it) and the hardware commit counters (a moved slot proves a hardware
//! commit overlapped this transaction). Everything per-thread lives in
//! [`TxContext`]; a [`SwTx`] borrows it for the duration of one software
//! attempt.

use crate::{
    internal::{
        counters::{CommitCounters, CounterSnapshot},
        read_log::ReadLog,
        seqlock::{SeqLock, Version},
        write_log::WriteLog,
    },
    mem::TxMemory,
    tx::Error,
};
use std::sync::atomic::{fence, Ordering::SeqCst};

/// Thread-local transactional state, reused across attempts so the logs
/// keep their capacity.
#[derive(Debug)]
pub struct TxContext {
    read_log: ReadLog,
    write_log: WriteLog,
    rv: Version,
    snapshot: CounterSnapshot,
}

impl TxContext {
    pub fn new() -> Self {
        TxContext {
            read_log: ReadLog::new(),
            write_log: WriteLog::new(),
            rv: Version::default(),
            snapshot: CounterSnapshot::new(),
        }
    }

    /// Discards both logs. This is the abort path; the dispatcher calls it
    /// before retrying.
    pub fn clear(&mut self) {
        self.read_log.clear();
        self.write_log.clear();
    }
}

/// One in-flight software transaction.
#[derive(Debug)]
pub struct SwTx<'tx> {
    seqlock: &'tx SeqLock,
    counters: &'tx CommitCounters,
    mem: &'tx TxMemory,
    ctx: &'tx mut TxContext,
}

impl<'tx> SwTx<'tx> {
    /// Starts a software transaction: waits for a quiescent sequence lock,
    /// records it as the read version, then snapshots the hardware commit
    /// frontier. The snapshot is taken only after the lock has been
    /// observed even, and the fence keeps it ordered before the
    /// transaction's first shared read.
    #[inline]
    pub fn begin(
        seqlock: &'tx SeqLock,
        counters: &'tx CommitCounters,
        mem: &'tx TxMemory,
        ctx: &'tx mut TxContext,
    ) -> Self {
        ctx.rv = seqlock.await_even();
        counters.snapshot_into(&mut ctx.snapshot);
        fence(SeqCst);
        SwTx {
            seqlock,
            counters,
            mem,
            ctx,
        }
    }

    /// Transactional read. Buffered writes shadow shared memory; otherwise
    /// the load is revalidated until it is consistent with `rv`.
    #[inline]
    pub fn read(&mut self, addr: usize) -> Result<usize, Error> {
        if let Some(buffered) = self.ctx.write_log.find_latest(addr) {
            return Ok(buffered);
        }
        let mut value = self.mem.load(addr);
        // A software committer published since begin; re-establish a
        // consistent read version before trusting the load.
        while self.ctx.rv != self.seqlock.sample() {
            self.validate()?;
            value = self.mem.load(addr);
        }
        self.ctx.read_log.record(addr, value);
        Ok(value)
    }

    /// Transactional write: buffered until commit, visible to later reads
    /// of the same address within this transaction.
    #[inline]
    pub fn write(&mut self, addr: usize, value: usize) -> Result<(), Error> {
        self.ctx.write_log.record(addr, value);
        Ok(())
    }

    /// Re-establishes read-set consistency against a stable even sequence
    /// lock value and refreshes `rv` to it.
    fn validate(&mut self) -> Result<(), Error> {
        loop {
            let rv = self.seqlock.await_even();
            if !self.ctx.read_log.still_valid(self.mem) {
                return Err(Error::CONFLICT);
            }
            if self.seqlock.sample() == rv {
                self.ctx.rv = rv;
                return Ok(());
            }
        }
    }

    /// The commit algorithm. On `Err` the caller owns cleanup via
    /// [`TxContext::clear`]; the sequence lock is always even again by the
    /// time this returns.
    pub fn commit(mut self) -> Result<(), Error> {
        if self.ctx.write_log.is_empty() {
            // Read-only transactions validate as they go and publish
            // nothing; the sequence lock is left untouched.
            self.ctx.read_log.clear();
            return Ok(());
        }
        while !self.seqlock.try_acquire(self.ctx.rv) {
            self.validate()?;
        }
        // The lock is now odd: every in-flight hardware transaction holds
        // it in its read set and aborts rather than commit under us, so
        // shared memory is stable for the rest of the commit.
        if self.counters.changed_since(&self.ctx.snapshot)
            && !self.ctx.read_log.still_valid(self.mem)
        {
            // A hardware commit invalidated a read. Restore even parity
            // before surfacing the abort.
            self.seqlock.release();
            return Err(Error::CONFLICT);
        }
        for (addr, value) in self.ctx.write_log.iter() {
            self.mem.store(addr, value);
        }
        self.seqlock.release();
        self.ctx.clear();
        Ok(())
    }
}
