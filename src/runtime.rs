//! Runtime lifecycle and the per-worker dispatcher.
//!
//! [`Runtime`] owns everything process-wide: shared memory, the sequence
//! lock and the hardware commit counters. Workers each claim a
//! [`TxExecutor`] for their slot and run transactions through it; the
//! executor is the dispatcher, attempting the hardware path within a
//! budget and escalating to the software path on exhaustion.

use crate::{
    internal::{
        counters::{CommitCounters, COUNTER_SLOTS},
        seqlock::SeqLock,
        thread::{SwTx, TxContext},
    },
    mem::TxMemory,
    stats::Stats,
    tx::{Error, Tx},
};
use hynorec_htm::HardwareTx;
use std::sync::atomic::{
    AtomicBool,
    Ordering::{AcqRel, Release},
};

/// Maximum number of worker threads a runtime can be configured for.
pub const MAX_THREADS: usize = 64;

/// Default number of hardware attempts before the software fallback.
pub const DEFAULT_HTM_BUDGET: u32 = 5;

/// Errors surfaced by runtime construction and slot claiming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    #[error("thread count must be between 1 and {MAX_THREADS}, got {0}")]
    InvalidThreadCount(usize),
    #[error("shared memory must hold at least one word")]
    EmptyMemory,
    #[error("thread slot {0} is out of range")]
    SlotOutOfRange(usize),
    #[error("thread slot {0} is already claimed")]
    SlotClaimed(usize),
}

/// Runtime construction parameters.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Worker thread cap, `1..=MAX_THREADS`. Also the number of claimable
    /// executor slots.
    pub num_threads: usize,
    /// Number of word cells in shared memory.
    pub num_words: usize,
    /// Value every cell starts with.
    pub initial_word: usize,
    /// Hardware attempts per transaction before escalating to software.
    /// Zero disables the hardware path outright.
    pub htm_budget: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            num_threads: 1,
            num_words: 1024,
            initial_word: 0,
            htm_budget: DEFAULT_HTM_BUDGET,
        }
    }
}

/// The hybrid transactional memory runtime.
///
/// Created with a [`Config`]; dropping it is shutdown. All transactional
/// state lives here, so independent runtimes are fully isolated.
///
/// # Examples
///
/// ```
/// use hynorec::{Config, Runtime};
///
/// let rt = Runtime::with_config(Config {
///     num_threads: 1,
///     num_words: 2,
///     initial_word: 100,
///     ..Config::default()
/// })
/// .unwrap();
///
/// let mut exec = rt.executor(0).unwrap();
/// exec.run(|tx| {
///     let a = tx.read(0)?;
///     let b = tx.read(1)?;
///     tx.write(0, a - 10)?;
///     tx.write(1, b + 10)?;
///     Ok(())
/// });
///
/// assert_eq!(rt.word(0), 90);
/// assert_eq!(rt.word(1), 110);
/// assert_eq!(rt.total(), 200);
/// ```
#[derive(Debug)]
pub struct Runtime {
    seqlock: SeqLock,
    counters: CommitCounters,
    mem: TxMemory,
    claimed: Box<[AtomicBool]>,
    htm_budget: u32,
}

impl Runtime {
    /// Builds a runtime from `config`, validating it.
    pub fn with_config(config: Config) -> Result<Self, RuntimeError> {
        if config.num_threads == 0 || config.num_threads > MAX_THREADS {
            return Err(RuntimeError::InvalidThreadCount(config.num_threads));
        }
        if config.num_words == 0 {
            return Err(RuntimeError::EmptyMemory);
        }
        debug_assert!(COUNTER_SLOTS >= MAX_THREADS);
        Ok(Runtime {
            seqlock: SeqLock::new(),
            counters: CommitCounters::new(),
            mem: TxMemory::new(config.num_words, config.initial_word),
            claimed: (0..config.num_threads)
                .map(|_| AtomicBool::new(false))
                .collect(),
            htm_budget: config.htm_budget,
        })
    }

    /// Builds a runtime with `num_threads` worker slots over `num_words`
    /// zeroed cells and default tuning.
    pub fn new(num_threads: usize, num_words: usize) -> Result<Self, RuntimeError> {
        Runtime::with_config(Config {
            num_threads,
            num_words,
            ..Config::default()
        })
    }

    /// Number of claimable worker slots.
    #[inline]
    pub fn num_threads(&self) -> usize {
        self.claimed.len()
    }

    /// Number of cells in shared memory.
    #[inline]
    pub fn len(&self) -> usize {
        self.mem.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mem.len() == 0
    }

    /// Non-transactional load of one cell. Only meaningful while no
    /// transactions are running.
    #[inline]
    pub fn word(&self, addr: usize) -> usize {
        self.mem.load(addr)
    }

    /// Sum of all cells. Only meaningful while no transactions are
    /// running.
    pub fn total(&self) -> usize {
        self.mem.total()
    }

    /// True if no software transaction currently owns the write-back
    /// phase.
    #[inline]
    pub fn is_quiescent(&self) -> bool {
        !self.seqlock.sample().is_write_locked()
    }

    /// Claims worker slot `slot`, yielding the executor that worker runs
    /// its transactions through. The slot stays claimed until the executor
    /// drops, keeping its commit-counter cell single-writer.
    pub fn executor(&self, slot: usize) -> Result<TxExecutor<'_>, RuntimeError> {
        let flag = self
            .claimed
            .get(slot)
            .ok_or(RuntimeError::SlotOutOfRange(slot))?;
        if flag.swap(true, AcqRel) {
            return Err(RuntimeError::SlotClaimed(slot));
        }
        Ok(TxExecutor {
            runtime: self,
            slot,
            ctx: TxContext::new(),
            stats: Stats::default(),
            htm_budget: self.htm_budget,
        })
    }
}

/// Budget exhausted without a hardware commit.
struct HtmExhausted;

/// A claimed worker slot: the per-thread dispatcher.
#[derive(Debug)]
pub struct TxExecutor<'rt> {
    runtime: &'rt Runtime,
    slot: usize,
    ctx: TxContext,
    stats: Stats,
    htm_budget: u32,
}

impl Drop for TxExecutor<'_> {
    fn drop(&mut self) {
        self.runtime.claimed[self.slot].store(false, Release);
    }
}

impl<'rt> TxExecutor<'rt> {
    /// The slot this executor was claimed for.
    #[inline]
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Counts accumulated by this executor so far.
    #[inline]
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Overrides the hardware attempt budget for this executor.
    pub fn set_htm_budget(&mut self, budget: u32) {
        self.htm_budget = budget;
    }

    /// Runs `body` as one atomic transaction, retrying until it commits,
    /// and returns the committed body's output.
    ///
    /// The body may run several times and on either path; it must confine
    /// its shared-memory access to [`Tx::read`] and [`Tx::write`] and stay
    /// free of side effects it cannot afford to repeat.
    pub fn run<F, O>(&mut self, mut body: F) -> O
    where
        F: FnMut(&mut Tx<'_>) -> Result<O, Error>,
    {
        loop {
            if hynorec_htm::htm_supported() && self.htm_budget > 0 {
                if let Ok(out) = self.run_hardware(&mut body) {
                    self.stats.hardware_commits += 1;
                    return out;
                }
            }
            match self.run_software(&mut body) {
                Ok(out) => {
                    self.stats.software_commits += 1;
                    return out;
                }
                Err(_) => {
                    // Retry the whole attempt: after a software abort the
                    // hardware path may well succeed now.
                    self.stats.software_aborts += 1;
                }
            }
        }
    }

    /// One budgeted pass over the hardware path. `Err` means the budget
    /// was spent without a commit.
    fn run_hardware<F, O>(&mut self, body: &mut F) -> Result<O, HtmExhausted>
    where
        F: FnMut(&mut Tx<'_>) -> Result<O, Error>,
    {
        let rt = self.runtime;
        let mut attempts = self.htm_budget;
        let retries = &mut self.stats.hardware_retries;
        let htx = unsafe {
            HardwareTx::begin(|_code| {
                *retries += 1;
                attempts -= 1;
                if attempts == 0 {
                    Err(HtmExhausted)
                } else {
                    Ok(())
                }
            })
        }?;
        // A software committer may be mid write-back; bail out and let the
        // handler spend budget. Reading the lock here also subscribes this
        // transaction to it, so a software acquire from now on aborts us
        // instead of committing under us.
        if rt.seqlock.sample().is_write_locked() {
            htx.abort();
        }
        let mut tx = Tx::hardware(&rt.mem, &htx);
        match body(&mut tx) {
            Ok(out) => {
                // Published atomically with the transaction's writes.
                rt.counters.bump(self.slot, &htx);
                drop(htx);
                Ok(out)
            }
            Err(_) => htx.abort(),
        }
    }

    /// One software attempt: begin, run the body, commit. Any `Err` is an
    /// abort; state is cleared here so the dispatcher can simply retry.
    fn run_software<F, O>(&mut self, body: &mut F) -> Result<O, Error>
    where
        F: FnMut(&mut Tx<'_>) -> Result<O, Error>,
    {
        let rt = self.runtime;
        let result = {
            let sw = SwTx::begin(&rt.seqlock, &rt.counters, &rt.mem, &mut self.ctx);
            let mut tx = Tx::software(sw);
            match body(&mut tx) {
                Ok(out) => tx.into_software().commit().map(|()| out),
                Err(err) => Err(err),
            }
        };
        if result.is_err() {
            self.ctx.clear();
        }
        result
    }
}
