//! Test fixtures and log directory helpers.
//!
//! Provides temporary log directories whose writers rotate on demand, plus
//! readers for active, historical and compressed files.

use flate2::read::GzDecoder;
use rollfile::{
    naming, new_writer_with_manager, Config, ManualManager, RollingWriter, RotationTrigger,
    WriterMode,
};
use std::fs;
use std::io::Read;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Every write strategy, in declaration order.
pub const ALL_MODES: [WriterMode; 4] = [
    WriterMode::None,
    WriterMode::Lock,
    WriterMode::Async,
    WriterMode::Buffer,
];

/// A temporary log directory with automatic cleanup.
pub struct TestLog {
    config: Config,
    /// The temporary directory (kept alive to prevent cleanup).
    dir: TempDir,
}

impl TestLog {
    /// Creates an empty log directory for files named `name`.
    pub fn new(name: &str) -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        Self {
            config: Config::new(dir.path(), name),
            dir,
        }
    }

    /// Adjusts the configuration used by subsequently opened writers.
    #[must_use]
    pub fn with_config(mut self, f: impl FnOnce(Config) -> Config) -> Self {
        self.config = f(self.config);
        self
    }

    /// The base configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The log directory.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Path of `name` inside the log directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Path of the active file.
    pub fn active_path(&self) -> PathBuf {
        naming::active_path(&self.config)
    }

    /// Opens a writer of the given mode that rotates only when asked.
    pub fn open(&self, mode: WriterMode) -> TestWriter {
        let config = Arc::new(self.config.clone().with_writer_mode(mode));
        let manager = ManualManager::new(Arc::clone(&config));
        let trigger = manager.trigger();
        let writer =
            new_writer_with_manager(config, Box::new(manager)).expect("Failed to open writer");
        TestWriter {
            writer,
            trigger,
            dir: self.dir.path().to_path_buf(),
        }
    }

    /// Reads the active file.
    pub fn read_active(&self) -> Vec<u8> {
        fs::read(self.active_path()).expect("Failed to read active file")
    }

    /// Historical files in name order, excluding the active file.
    pub fn historical_files(&self) -> Vec<PathBuf> {
        let active = self.active_path();
        let prefix = format!(
            "{}.",
            active.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()
        );
        self.files_matching(|name| name.starts_with(&prefix) && !name.ends_with(naming::TMP_SUFFIX))
    }

    /// Leftover `.tmp` files from compression.
    pub fn tmp_files(&self) -> Vec<PathBuf> {
        self.files_matching(|name| name.ends_with(naming::TMP_SUFFIX))
    }

    /// Reads every historical file in name order, then the active file, and
    /// concatenates them. Compressed files are decoded.
    pub fn read_all(&self) -> Vec<u8> {
        let mut content = Vec::new();
        for path in self.historical_files() {
            content.extend(read_log_file(&path));
        }
        content.extend(self.read_active());
        content
    }

    fn files_matching(&self, keep: impl Fn(&str) -> bool) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = fs::read_dir(self.dir.path())
            .expect("Failed to list log directory")
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .map(|name| keep(&name.to_string_lossy()))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();
        files
    }
}

/// A writer opened from a [`TestLog`], together with its rotation trigger.
pub struct TestWriter {
    writer: Box<dyn RollingWriter>,
    trigger: RotationTrigger,
    dir: PathBuf,
}

impl TestWriter {
    /// Requests a rotation to `name` inside the log directory.
    pub fn rotate_to(&self, name: &str) -> bool {
        self.trigger.rotate_to(self.dir.join(name))
    }

    /// The rotation trigger.
    pub fn trigger(&self) -> RotationTrigger {
        self.trigger.clone()
    }

    /// Converts into a shareable writer and its trigger.
    pub fn into_shared(self) -> (Arc<dyn RollingWriter>, RotationTrigger) {
        (Arc::from(self.writer), self.trigger)
    }
}

impl Deref for TestWriter {
    type Target = dyn RollingWriter;

    fn deref(&self) -> &Self::Target {
        self.writer.as_ref()
    }
}

/// Decompresses a gzip file.
pub fn read_gzip(path: &Path) -> Vec<u8> {
    let file = fs::File::open(path).expect("Failed to open gzip file");
    let mut content = Vec::new();
    GzDecoder::new(file)
        .read_to_end(&mut content)
        .expect("Invalid gzip stream");
    content
}

/// Reads a log file, decompressing it when it carries the gzip suffix.
pub fn read_log_file(path: &Path) -> Vec<u8> {
    if path.to_string_lossy().ends_with(naming::GZIP_SUFFIX) {
        read_gzip(path)
    } else {
        fs::read(path).expect("Failed to read log file")
    }
}

/// Runs `f` once per write strategy, each in a fresh log directory.
pub fn for_each_mode<F>(name: &str, mut f: F)
where
    F: FnMut(&TestLog, WriterMode),
{
    for mode in ALL_MODES {
        let log = TestLog::new(name);
        f(&log, mode);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_historical_files_exclude_active_and_tmp() {
        let log = TestLog::new("app");
        fs::write(log.active_path(), b"").unwrap();
        fs::write(log.file("app.log.2"), b"").unwrap();
        fs::write(log.file("app.log.1"), b"").unwrap();
        fs::write(log.file("app.log.3.gz.tmp"), b"").unwrap();
        fs::write(log.file("other.log.1"), b"").unwrap();

        assert_eq!(
            log.historical_files(),
            vec![log.file("app.log.1"), log.file("app.log.2")]
        );
        assert_eq!(log.tmp_files(), vec![log.file("app.log.3.gz.tmp")]);
    }

    #[test]
    fn test_writer_rotates_on_request() {
        let log = TestLog::new("app");
        let writer = log.open(WriterMode::Lock);
        writer.write(b"old").unwrap();
        assert!(writer.rotate_to("app.log.1"));
        writer.write(b"new").unwrap();
        writer.close().unwrap();

        assert_eq!(fs::read(log.file("app.log.1")).unwrap(), b"old");
        assert_eq!(log.read_all(), b"oldnew");
    }
}
