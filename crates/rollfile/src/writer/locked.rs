//! Mutex-serialized rolling writer.

use super::{RollingWriter, Writer};
use crate::config::WriterMode;
use crate::error::WriterResult;
use parking_lot::Mutex;
use std::path::Path;

/// A rolling writer that serializes every write and rotation under one lock.
///
/// Safe for any number of concurrent callers; bytes from different threads
/// land in the file in lock acquisition order.
#[derive(Debug)]
pub struct LockedWriter {
    inner: Writer,
    lock: Mutex<()>,
}

impl LockedWriter {
    /// Wraps an opened base writer.
    #[must_use]
    pub fn new(inner: Writer) -> Self {
        Self {
            inner,
            lock: Mutex::new(()),
        }
    }

    /// The wrapped base writer.
    #[must_use]
    pub fn inner(&self) -> &Writer {
        &self.inner
    }
}

impl RollingWriter for LockedWriter {
    fn write(&self, buf: &[u8]) -> WriterResult<usize> {
        // The guard is released on every return path, including errors.
        let _guard = self.lock.lock();
        if let Some(rotation) = self.inner.poll_rotation() {
            self.inner.rotate(rotation)?;
        }
        self.inner.write_current(buf)
    }

    fn flush(&self) -> WriterResult<()> {
        let _guard = self.lock.lock();
        self.inner.flush()
    }

    fn close(&self) -> WriterResult<()> {
        let _guard = self.lock.lock();
        self.inner.close_handle()
    }

    fn mode(&self) -> WriterMode {
        WriterMode::Lock
    }

    fn path(&self) -> &Path {
        self.inner.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::WriterError;
    use crate::manager::{ManualManager, RotationTrigger};
    use std::sync::Arc;
    use std::thread;
    use tempfile::tempdir;

    fn open_locked(config: Config) -> (Arc<LockedWriter>, RotationTrigger) {
        let config = Arc::new(config);
        let manager = ManualManager::new(Arc::clone(&config));
        let trigger = manager.trigger();
        let inner = Writer::open(config, Box::new(manager)).unwrap();
        (Arc::new(LockedWriter::new(inner)), trigger)
    }

    #[test]
    fn concurrent_writes_are_not_interleaved() {
        let dir = tempdir().unwrap();
        let (writer, _) = open_locked(Config::new(dir.path(), "app"));

        let handles: Vec<_> = (0..8u8)
            .map(|t| {
                let writer = Arc::clone(&writer);
                thread::spawn(move || {
                    let record = vec![b'a' + t; 64];
                    for _ in 0..200 {
                        writer.write(&record).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        writer.close().unwrap();

        let content = std::fs::read(writer.path()).unwrap();
        assert_eq!(content.len(), 8 * 200 * 64);
        for record in content.chunks(64) {
            assert!(record.iter().all(|&b| b == record[0]));
        }
    }

    #[test]
    fn rotation_under_lock() {
        let dir = tempdir().unwrap();
        let (writer, trigger) = open_locked(Config::new(dir.path(), "app"));
        let target = dir.path().join("app.log.1");

        writer.write(b"old").unwrap();
        trigger.rotate_to(&target);
        writer.write(b"new").unwrap();
        writer.close().unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"old");
        assert_eq!(std::fs::read(writer.path()).unwrap(), b"new");
    }

    #[test]
    fn flush_after_close_fails() {
        let dir = tempdir().unwrap();
        let (writer, _) = open_locked(Config::new(dir.path(), "app"));

        writer.write(b"x").unwrap();
        assert!(writer.flush().is_ok());
        writer.close().unwrap();
        assert!(matches!(writer.flush(), Err(WriterError::Closed)));
    }

    #[test]
    fn rotation_error_releases_lock() {
        let dir = tempdir().unwrap();
        let (writer, trigger) = open_locked(Config::new(dir.path(), "app"));
        writer.inner().close_handle().unwrap();

        trigger.rotate_to(dir.path().join("app.log.1"));
        assert!(matches!(writer.write(b"x"), Err(WriterError::Closed)));
        // A second call would deadlock if the first had kept the lock.
        assert!(matches!(writer.write(b"y"), Err(WriterError::Closed)));
        assert!(matches!(writer.close(), Err(WriterError::Closed)));
    }
}
