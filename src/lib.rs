//! A hybrid transactional memory runtime.
//!
//! `hynorec` executes speculative critical sections against a shared word
//! array. Each transaction first tries the processor's hardware
//! transactional memory; after a bounded number of hardware aborts it falls
//! back to a NOrec-style software path built on a single global sequence
//! lock and per-thread read/write sets. The two paths run concurrently and
//! their commits interleave without giving up single-lock semantics:
//!
//! * a hardware transaction reads the sequence lock right after it starts,
//!   so it aborts instead of committing over a software write-back;
//! * a hardware transaction bumps its thread's commit counter as its last
//!   transactional write, so a software transaction that overlapped it
//!   revalidates its reads before writing back.
//!
//! # Examples
//!
//! ```
//! use hynorec::{Config, Runtime};
//!
//! let rt = Runtime::with_config(Config {
//!     num_threads: 2,
//!     num_words: 4,
//!     initial_word: 1000,
//!     ..Config::default()
//! })
//! .unwrap();
//!
//! let mut exec = rt.executor(0).unwrap();
//! let moved = exec.run(|tx| {
//!     let from = tx.read(0)?;
//!     if from < 50 {
//!         return Ok(0);
//!     }
//!     let to = tx.read(3)?;
//!     tx.write(0, from - 50)?;
//!     tx.write(3, to + 50)?;
//!     Ok(50)
//! });
//!
//! assert_eq!(moved, 50);
//! assert_eq!(rt.total(), 4000);
//! ```
//!
//! Worker threads each claim their own executor slot; see
//! [`Runtime::executor`]. Without hardware support (or without the `rtm`
//! cargo feature) the dispatcher runs every transaction on the software
//! path, which is correct on its own.

#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]
#![deny(unused_must_use)]

mod internal;
mod mem;
mod runtime;

pub mod stats;
pub mod tx;

pub use runtime::{Config, Runtime, RuntimeError, TxExecutor, DEFAULT_HTM_BUDGET, MAX_THREADS};

#[doc(inline)]
pub use hynorec_htm as htm;
