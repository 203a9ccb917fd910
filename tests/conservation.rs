mod conservation {
    use crossbeam_utils::thread;
    use hynorec::{stats::Stats, Config, Runtime};
    use rand::{rngs::SmallRng, Rng, SeedableRng};
    use std::sync::Barrier;

    const TRANSFERS_PER_TXN: usize = 10;

    struct Outcome {
        total_before: usize,
        total_after: usize,
        quiescent: bool,
        stats: Stats,
    }

    /// Runs the pairwise-transfer workload and reports the sums and merged
    /// per-thread counts.
    fn run_transfers(
        num_threads: usize,
        accounts: usize,
        balance: usize,
        total_txns: usize,
        amount: usize,
    ) -> Outcome {
        let rt = Runtime::with_config(Config {
            num_threads,
            num_words: accounts,
            initial_word: balance,
            ..Config::default()
        })
        .unwrap();
        let total_before = rt.total();
        let barrier = Barrier::new(num_threads);
        let workload = total_txns / num_threads;

        let per_thread: Vec<Stats> = thread::scope(|scope| {
            let handles: Vec<_> = (0..num_threads)
                .map(|slot| {
                    let rt = &rt;
                    let barrier = &barrier;
                    scope.spawn(move |_| {
                        let mut exec = rt.executor(slot).unwrap();
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

        let mut stats = Stats::default();
        for thread_stats in &per_thread {
            stats.merge(thread_stats);
        }
        Outcome {
            total_before,
            total_after: rt.total(),
            quiescent: rt.is_quiescent(),
            stats,
        }
    }

    fn assert_conserved(outcome: &Outcome, expected_total: usize, expected_commits: u64) {
        assert_eq!(outcome.total_before, expected_total);
        assert_eq!(outcome.total_after, expected_total);
        assert!(outcome.quiescent);
        assert_eq!(outcome.stats.commits(), expected_commits);
        if !hynorec::htm::htm_supported() {
            assert_eq!(outcome.stats.hardware_commits, 0);
            assert_eq!(outcome.stats.software_commits, expected_commits);
        }
    }

    #[test]
    fn single_thread_full_workload() {
        let outcome = run_transfers(1, 1000, 1000, 100_000, 50);
        assert_conserved(&outcome, 1_000_000, 100_000);
        // Alone, nothing can invalidate a read set.
        assert_eq!(outcome.stats.software_aborts, 0);
    }

    #[test]
    fn eight_threads_conserve_the_total() {
        let outcome = run_transfers(8, 1000, 1000, 100_000, 50);
        assert_conserved(&outcome, 1_000_000, 8 * (100_000 / 8));
    }

    #[test]
    fn max_threads_conserve_the_total() {
        let outcome = run_transfers(64, 1000, 1000, 100_000, 50);
        assert_conserved(&outcome, 1_000_000, 64 * (100_000 / 64));
    }

    #[test]
    fn two_account_contention_storm() {
        let outcome = run_transfers(4, 2, 1000, 10_000, 1);
        assert_conserved(&outcome, 2000, 10_000);
    }
}
