//! Bounded retention of historical files.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A bounded FIFO of historical file paths.
///
/// When the queue is full, pushing evicts the oldest path and deletes its
/// file before retrying. The queue never holds more than `capacity` entries.
#[derive(Debug)]
pub struct RetentionQueue {
    tx: Sender<PathBuf>,
    rx: Receiver<PathBuf>,
    capacity: usize,
}

impl RetentionQueue {
    /// Creates a queue keeping at most `capacity` files.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero; retention is disabled by not creating a
    /// queue at all.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "retention capacity must be positive");
        let (tx, rx) = bounded(capacity);
        Self { tx, rx, capacity }
    }

    /// Records `path` as the newest historical file.
    ///
    /// Returns the paths that were evicted to make room.
    pub fn push(&self, path: PathBuf) -> Vec<PathBuf> {
        let mut evicted = Vec::new();
        let mut pending = path;

        loop {
            match self.tx.try_send(pending) {
                Ok(()) => return evicted,
                Err(TrySendError::Full(back)) => {
                    pending = back;
                    if let Ok(oldest) = self.rx.try_recv() {
                        remove_historical(&oldest);
                        evicted.push(oldest);
                    }
                }
                // Both ends live in `self`.
                Err(TrySendError::Disconnected(_)) => return evicted,
            }
        }
    }

    /// Number of files currently retained.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Returns true if no file is retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Maximum number of retained files.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

fn remove_historical(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "evicted historical file"),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => warn!(path = %path.display(), error = %err, "failed to remove historical file"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn push_within_capacity_keeps_everything() {
        let dir = tempdir().unwrap();
        let queue = RetentionQueue::new(3);

        for i in 0..3 {
            let path = dir.path().join(format!("f{i}"));
            std::fs::write(&path, b"x").unwrap();
            assert!(queue.push(path).is_empty());
        }

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.capacity(), 3);
    }

    #[test]
    fn push_past_capacity_evicts_oldest() {
        let dir = tempdir().unwrap();
        let queue = RetentionQueue::new(2);
        let paths: Vec<_> = (0..4).map(|i| dir.path().join(format!("f{i}"))).collect();
        for path in &paths {
            std::fs::write(path, b"x").unwrap();
        }

        assert!(queue.push(paths[0].clone()).is_empty());
        assert!(queue.push(paths[1].clone()).is_empty());
        assert_eq!(queue.push(paths[2].clone()), vec![paths[0].clone()]);
        assert_eq!(queue.push(paths[3].clone()), vec![paths[1].clone()]);

        assert!(!paths[0].exists());
        assert!(!paths[1].exists());
        assert!(paths[2].exists());
        assert!(paths[3].exists());
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn evicting_missing_file_is_not_an_error() {
        let dir = tempdir().unwrap();
        let queue = RetentionQueue::new(1);

        queue.push(dir.path().join("never-created"));
        let evicted = queue.push(dir.path().join("second"));
        assert_eq!(evicted.len(), 1);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    #[should_panic(expected = "retention capacity must be positive")]
    fn zero_capacity_panics() {
        let _ = RetentionQueue::new(0);
    }
}
