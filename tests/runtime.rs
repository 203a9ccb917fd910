mod runtime {
    use hynorec::{tx::Error, Config, Runtime, RuntimeError, MAX_THREADS};

    #[test]
    fn thread_count_bounds() {
        assert_eq!(
            Runtime::new(0, 16).unwrap_err(),
            RuntimeError::InvalidThreadCount(0)
        );
        assert_eq!(
            Runtime::new(MAX_THREADS + 1, 16).unwrap_err(),
            RuntimeError::InvalidThreadCount(MAX_THREADS + 1)
        );
        assert!(Runtime::new(1, 16).is_ok());
        assert!(Runtime::new(MAX_THREADS, 16).is_ok());
    }

    #[test]
    fn memory_must_be_non_empty() {
        assert_eq!(Runtime::new(1, 0).unwrap_err(), RuntimeError::EmptyMemory);
    }

    #[test]
    fn slots_are_exclusive() {
        let rt = Runtime::new(2, 8).unwrap();
        let first = rt.executor(0).unwrap();
        assert_eq!(rt.executor(0).unwrap_err(), RuntimeError::SlotClaimed(0));
        assert_eq!(rt.executor(2).unwrap_err(), RuntimeError::SlotOutOfRange(2));
        let _second = rt.executor(1).unwrap();
        drop(first);
        // A dropped executor releases its slot for reuse.
        assert!(rt.executor(0).is_ok());
    }

    #[test]
    fn empty_and_read_only_transactions_commit() {
        let rt = Runtime::with_config(Config {
            num_threads: 1,
            num_words: 4,
            initial_word: 9,
            ..Config::default()
        })
        .unwrap();
        let mut exec = rt.executor(0).unwrap();

        exec.run(|_tx| Ok(()));
        let sum = exec.run(|tx| {
            let mut sum = 0;
            for addr in 0..rt.len() {
                sum += tx.read(addr)?;
            }
            Ok(sum)
        });
        assert_eq!(sum, 36);
        assert_eq!(exec.stats().commits(), 2);
        assert!(rt.is_quiescent());
        assert_eq!(rt.total(), 36);
    }

    #[test]
    fn retry_reruns_the_body() {
        // Pinned to the software path so the attempt count is exact.
        let rt = Runtime::with_config(Config {
            num_threads: 1,
            num_words: 2,
            htm_budget: 0,
            ..Config::default()
        })
        .unwrap();
        let mut exec = rt.executor(0).unwrap();

        let mut calls = 0;
        let out = exec.run(|tx| {
            calls += 1;
            if calls == 1 {
                return Err(Error::RETRY);
            }
            tx.write(0, calls)?;
            Ok(calls)
        });
        assert_eq!(out, 2);
        assert_eq!(rt.word(0), 2);
        assert_eq!(exec.stats().commits(), 1);
        assert_eq!(exec.stats().software_aborts, 1);
    }

    #[test]
    fn buffered_writes_are_invisible_until_commit() {
        // Pinned to the software path: the probe below peeks at shared
        // memory mid-transaction, which only makes sense with buffering.
        let rt = Runtime::with_config(Config {
            num_threads: 1,
            num_words: 2,
            htm_budget: 0,
            ..Config::default()
        })
        .unwrap();
        let mut exec = rt.executor(0).unwrap();

        exec.run(|tx| {
            tx.write(0, 41)?;
            tx.write(0, 42)?;
            // The runtime cell is untouched while the write sits in the log.
            assert_eq!(rt.word(0), 0);
            assert_eq!(tx.read(0)?, 42);
            Ok(())
        });
        assert_eq!(rt.word(0), 42);
    }
}
