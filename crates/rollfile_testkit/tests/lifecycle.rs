//! Close semantics and strategy-specific flushing guarantees.

use rollfile::{new_writer, new_writer_from_config, WriterOption};
use rollfile_testkit::prelude::*;

#[test]
fn test_close_twice_reports_closed_for_every_mode() {
    for_each_mode("close", |log, mode| {
        let writer = log.open(mode);
        writer.write(b"data").unwrap();
        writer.close().unwrap();

        assert!(
            matches!(writer.close(), Err(WriterError::Closed)),
            "mode {mode}"
        );
        assert_eq!(log.read_active(), b"data", "mode {mode}");
    });
}

#[test]
fn test_write_after_close_fails_for_every_mode() {
    for_each_mode("late", |log, mode| {
        let writer = log.open(mode);
        writer.close().unwrap();
        let err = writer.write(b"late").unwrap_err();
        assert!(err.is_closed(), "mode {mode}: {err}");
        assert!(log.read_active().is_empty(), "mode {mode}");
    });
}

#[test]
fn test_flush_makes_accepted_bytes_visible_for_every_mode() {
    for_each_mode("flush", |log, mode| {
        let writer = log.open(mode);
        let record = vec![b'f'; 4096];
        for _ in 0..256 {
            writer.write(&record).unwrap();
        }
        writer.flush().unwrap();
        assert_eq!(log.read_active().len(), 256 * 4096, "mode {mode}");

        writer.close().unwrap();
        let err = writer.flush().unwrap_err();
        assert!(err.is_closed(), "mode {mode}: {err}");
    });
}

#[test]
fn test_async_close_flushes_every_accepted_byte() {
    let log = TestLog::new("async");
    let writer = log.open(WriterMode::Async);

    let record = vec![b'q'; 1000];
    for _ in 0..5_000 {
        writer.write(&record).unwrap();
    }
    writer.close().unwrap();

    assert_eq!(log.read_active().len(), 5_000 * 1000);
}

#[test]
fn test_async_exposes_error_channel() {
    let log = TestLog::new("chan");
    for mode in ALL_MODES {
        let writer = log.open(mode);
        assert_eq!(writer.error_channel().is_some(), mode == WriterMode::Async);
        writer.close().unwrap();
    }
}

#[test]
fn test_buffered_one_byte_writes_flush_once_past_threshold() {
    let log = TestLog::new("buf").with_config(|c| c.with_buffer_threshold(1024));
    let writer = log.open(WriterMode::Buffer);

    let expected: Vec<u8> = (0..2000u32).map(|i| b'0' + (i % 10) as u8).collect();
    for byte in &expected {
        writer.write(std::slice::from_ref(byte)).unwrap();
    }
    // One intermediate flush of 1025 bytes, the rest still in memory.
    assert_eq!(log.read_active().len(), 1025);

    writer.close().unwrap();
    assert_eq!(log.read_active(), expected);
}

#[test]
fn test_buffered_flush_makes_bytes_visible() {
    let log = TestLog::new("flush");
    let writer = log.open(WriterMode::Buffer);
    writer.write(b"pending").unwrap();
    assert!(log.read_active().is_empty());

    writer.flush().unwrap();
    assert_eq!(log.read_active(), b"pending");
    writer.close().unwrap();
}

#[test]
fn test_drop_without_close_keeps_bytes() {
    for_each_mode("drop", |log, mode| {
        {
            let writer = log.open(mode);
            writer.write(b"dropped").unwrap();
        }
        assert_eq!(log.read_active(), b"dropped", "mode {mode}");
    });
}

#[test]
fn test_factory_from_options_creates_directory() {
    let log = TestLog::new("unused");
    let nested = log.dir().join("a").join("b");

    let writer = new_writer([
        WriterOption::LogPath(nested.clone()),
        WriterOption::FileName("svc".into()),
        WriterOption::FileExtension("txt".into()),
        WriterOption::Mode(WriterMode::None),
    ])
    .unwrap();
    writer.write(b"hello").unwrap();
    writer.close().unwrap();

    assert_eq!(std::fs::read(nested.join("svc.txt")).unwrap(), b"hello");
}

#[test]
fn test_size_policy_rotates_active_file() {
    let log = TestLog::new("sized");
    let config = log
        .config()
        .clone()
        .with_size_rotation(256)
        .with_size_check_interval(std::time::Duration::from_millis(5))
        .with_writer_mode(WriterMode::Lock);
    let writer = new_writer_from_config(config).unwrap();

    let record = [b'z'; 64];
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
    let mut written = 0usize;
    while log.historical_files().is_empty() && std::time::Instant::now() < deadline {
        writer.write(&record).unwrap();
        written += record.len();
        std::thread::sleep(std::time::Duration::from_millis(2));
    }
    writer.close().unwrap();

    let history = log.historical_files();
    assert!(!history.is_empty(), "size policy never rotated");
    let total: usize = history
        .iter()
        .map(|p| read_log_file(p).len())
        .sum::<usize>()
        + log.read_active().len();
    assert_eq!(total, written);
}
