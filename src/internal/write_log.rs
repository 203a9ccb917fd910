//! The software write set.
//!
//! Pending writes in program order. Reads inside the transaction see the
//! newest buffered value for an address (latest-wins, scanned newest
//! first); commit replays the log oldest first, so a duplicate address
//! naturally ends at its final value.

const WRITE_CAPACITY: usize = 1024;

#[derive(Clone, Copy, Debug)]
struct WriteEntry {
    addr: usize,
    value: usize,
}

#[derive(Debug)]
pub struct WriteLog {
    entries: Vec<WriteEntry>,
}

impl WriteLog {
    #[inline]
    pub fn new() -> Self {
        WriteLog {
            entries: Vec::with_capacity(WRITE_CAPACITY),
        }
    }

    #[inline]
    pub fn record(&mut self, addr: usize, value: usize) {
        self.entries.push(WriteEntry { addr, value })
    }

    /// The most recent pending write to `addr`, if any.
    #[inline]
    pub fn find_latest(&self, addr: usize) -> Option<usize> {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.addr == addr)
            .map(|entry| entry.value)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.entries.clear()
    }

    /// Pending writes, oldest first, for write-back.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.entries.iter().map(|entry| (entry.addr, entry.value))
    }
}

#[cfg(test)]
mod tests {
    use super::WriteLog;

    #[test]
    fn latest_wins() {
        let mut log = WriteLog::new();
        assert!(log.is_empty());
        assert_eq!(log.find_latest(0), None);

        log.record(0, 1);
        log.record(1, 2);
        log.record(0, 3);
        assert_eq!(log.find_latest(0), Some(3));
        assert_eq!(log.find_latest(1), Some(2));
        assert_eq!(log.find_latest(2), None);
    }

    #[test]
    fn replays_in_program_order() {
        let mut log = WriteLog::new();
        log.record(5, 1);
        log.record(6, 2);
        log.record(5, 3);
        let replay: Vec<_> = log.iter().collect();
        assert_eq!(replay, vec![(5, 1), (6, 2), (5, 3)]);
    }
}
