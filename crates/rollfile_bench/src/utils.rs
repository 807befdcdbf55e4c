//! Benchmark utilities.

use rand::Rng;
use rollfile::{new_writer_with_manager, Config, ManualManager, RollingWriter, RotationTrigger, WriterMode};
use std::sync::Arc;
use tempfile::TempDir;

/// Generate random log line data of the specified size, ending in `\n`.
pub fn random_line(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    let mut line: Vec<u8> = (0..size.saturating_sub(1))
        .map(|_| rng.gen_range(b' '..=b'~'))
        .collect();
    line.push(b'\n');
    line
}

/// Generate a batch of log lines.
pub fn generate_lines(count: usize, size: usize) -> Vec<Vec<u8>> {
    (0..count).map(|_| random_line(size)).collect()
}

/// Open a writer in a fresh temporary directory, rotating only on request.
///
/// The directory lives as long as the returned `TempDir`.
pub fn open_writer(mode: WriterMode) -> (TempDir, Box<dyn RollingWriter>, RotationTrigger) {
    open_writer_with(mode, |config| config)
}

/// Like [`open_writer`], with a configuration adjustment.
pub fn open_writer_with(
    mode: WriterMode,
    adjust: impl FnOnce(Config) -> Config,
) -> (TempDir, Box<dyn RollingWriter>, RotationTrigger) {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let config = Arc::new(adjust(Config::new(dir.path(), "bench").with_writer_mode(mode)));
    let manager = ManualManager::new(Arc::clone(&config));
    let trigger = manager.trigger();
    let writer = new_writer_with_manager(config, Box::new(manager)).expect("Failed to open writer");
    (dir, writer, trigger)
}
