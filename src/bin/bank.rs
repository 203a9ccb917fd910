//! Bank-transfer driver for the hybrid runtime.
//!
//! The classic STM microbenchmark: a pool of accounts, every transaction
//! moving a fixed amount between random pairs. The total balance is the
//! correctness witness; any torn, lost or doubly applied update shows up
//! as created or destroyed money.

use clap::Parser;
use crossbeam_utils::thread;
use hynorec::{stats::Stats, Config, Runtime};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use std::{process, sync::Barrier, time::Instant};

/// Transfers attempted per transaction.
const TRANSFERS_PER_TXN: usize = 10;

#[derive(Debug, Parser)]
#[command(
    name = "bank",
    about = "Random account transfers over the hybrid transactional memory runtime"
)]
struct Args {
    /// Number of worker threads.
    #[arg(value_parser = clap::value_parser!(u64).range(1..=64))]
    threads: u64,

    /// Number of accounts in shared memory.
    #[arg(long, default_value_t = 1000)]
    accounts: usize,

    /// Total number of transactions, split across threads.
    #[arg(long, default_value_t = 100_000)]
    transactions: usize,

    /// Amount moved by each transfer.
    #[arg(long, default_value_t = 50)]
    transfer: usize,

    /// Initial balance of every account.
    #[arg(long, default_value_t = 1000)]
    balance: usize,

    /// Hardware attempts per transaction before the software fallback.
    #[arg(long, default_value_t = hynorec::DEFAULT_HTM_BUDGET)]
    htm_budget: u32,
}

fn main() {
    let args = Args::parse();
    let num_threads = args.threads as usize;
    if args.accounts < 2 {
        eprintln!("bank: need at least 2 accounts to transfer between");
        process::exit(1);
    }

    let rt = Runtime::with_config(Config {
        num_threads,
        num_words: args.accounts,
        initial_word: args.balance,
        htm_budget: args.htm_budget,
    })
    .unwrap_or_else(|err| {
        eprintln!("bank: {err}");
        process::exit(1);
    });

    println!("Number of threads: {num_threads}");
    let total_before = rt.total();

    let barrier = Barrier::new(num_threads);
    let workload = args.transactions / num_threads;
    let accounts = args.accounts;
    let amount = args.transfer;

    let start = Instant::now();
    let per_thread: Vec<Stats> = thread::scope(|scope| {
        let handles: Vec<_> = (0..num_threads)
            .map(|slot| {
                let rt = &rt;
                let barrier = &barrier;
                scope.spawn(move |_| {
                    let mut exec = rt.executor(slot).expect("executor slot already claimed");
                    let mut rng = SmallRng::seed_from_u64(slot as u64 + 1);
                    barrier.wait();
                    for _ in 0..workload {
                        exec.run(|tx| {
                            for _ in 0..TRANSFERS_PER_TXN {
                                let src = rng.gen_range(0..accounts);
                                let mut dst = rng.gen_range(0..accounts);
                                while dst == src {
                                    dst = rng.gen_range(0..accounts);
                                }
                                let from = tx.read(src)?;
                                if from < amount {
                                    break;
                                }
                                let to = tx.read(dst)?;
                                tx.write(src, from - amount)?;
                                tx.write(dst, to + amount)?;
                            }
                            Ok(())
                        });
                    }
                    *exec.stats()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    })
    .unwrap();
    let elapsed = start.elapsed();

    let mut combined = Stats::default();
    for (slot, stats) in per_thread.iter().enumerate() {
        combined.merge(stats);
        println!(
            "Thread ID: {slot}\tHardware Count: {}\tSoftware Count: {}\tTotal: {}",
            stats.hardware_commits,
            stats.software_commits,
            stats.commits()
        );
    }
    let total_after = rt.total();

    println!("Total time = {} ns", elapsed.as_nanos());
    println!("Total Money Before: ${total_before}");
    println!("Total Money After:  ${total_after}");
    assert_eq!(
        combined.commits() as usize,
        workload * num_threads,
        "committed transaction count drifted from the workload"
    );
}
