//! Append-only log with half-truncation.

use std::collections::VecDeque;

/// Append-only log with a hard cap.
///
/// When a push takes the log past its cap, the oldest half is dropped in one
/// pass instead of evicting one entry per push.
#[derive(Debug, Clone)]
pub struct BoundedLog<T> {
    cap: usize,
    entries: VecDeque<T>,
}

impl<T> BoundedLog<T> {
    /// Create a log; a zero cap is raised to one.
    pub fn new(cap: usize) -> Self {
        Self {
            cap: cap.max(1),
            entries: VecDeque::new(),
        }
    }

    /// Append an entry and return how many old entries were dropped.
    pub fn push(&mut self, entry: T) -> usize {
        self.entries.push_back(entry);
        if self.entries.len() <= self.cap {
            return 0;
        }
        let dropped = self.entries.len() / 2;
        self.entries.drain(..dropped);
        dropped
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T: Clone> BoundedLog<T> {
    /// Snapshot of the entries, oldest first.
    pub fn to_vec(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::BoundedLog;
    use pretty_assertions::assert_eq;

    #[test]
    fn drops_oldest_half_once_cap_is_exceeded() {
        let mut log = BoundedLog::new(4);
        for value in 0..4 {
            assert_eq!(log.push(value), 0);
        }
        assert_eq!(log.len(), 4);

        let dropped = log.push(4);

        assert_eq!(dropped, 2);
        assert_eq!(log.to_vec(), vec![2, 3, 4]);
    }

    #[test]
    fn zero_cap_still_keeps_the_latest_entry() {
        let mut log = BoundedLog::new(0);
        assert_eq!(log.cap(), 1);
        log.push("first");
        assert_eq!(log.push("second"), 1);
        assert_eq!(log.to_vec(), vec!["second"]);
    }

    #[test]
    fn most_recent_entries_survive_repeated_truncation() {
        let mut log = BoundedLog::new(10);
        for value in 0..100 {
            log.push(value);
        }
        assert!(log.len() <= 10);
        assert_eq!(log.iter().last(), Some(&99));
        let snapshot = log.to_vec();
        assert!(snapshot.windows(2).all(|pair| pair[1] == pair[0] + 1));
    }
}
