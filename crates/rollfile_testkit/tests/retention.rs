//! Retention and compression of historical files.

use rollfile_testkit::prelude::*;

const MAX_REMAIN: usize = 3;

/// Writes `entry i` then rotates to `<prefix>.<i+1><suffix>`, `rotations`
/// times, then writes a final entry.
fn rotate_n(writer: &TestWriter, prefix: &str, suffix: &str, rotations: usize) {
    for i in 0..rotations {
        writer.write(format!("entry {i}\n").as_bytes()).unwrap();
        assert!(writer.rotate_to(&format!("{prefix}.{}{suffix}", i + 1)));
    }
    writer.write(format!("entry {rotations}\n").as_bytes()).unwrap();
}

#[test]
fn test_retention_deletes_oldest_for_every_mode() {
    for mode in ALL_MODES {
        let log = TestLog::new("ret").with_config(|c| c.with_max_remain(MAX_REMAIN));
        let writer = log.open(mode);

        rotate_n(&writer, "ret.log", "", MAX_REMAIN + 1);
        writer.close().unwrap();

        let remaining = log.historical_files();
        assert_eq!(remaining.len(), MAX_REMAIN, "mode {mode}");
        assert!(!log.file("ret.log.1").exists(), "oldest kept in mode {mode}");
        for i in 2..=MAX_REMAIN + 1 {
            assert_eq!(
                std::fs::read(log.file(&format!("ret.log.{i}"))).unwrap(),
                format!("entry {}\n", i - 1).as_bytes(),
                "mode {mode}"
            );
        }
    }
}

#[test]
fn test_retention_disabled_keeps_everything() {
    let log = TestLog::new("keep");
    let writer = log.open(WriterMode::Lock);
    rotate_n(&writer, "keep.log", "", 10);
    writer.close().unwrap();

    assert_eq!(log.historical_files().len(), 10);
}

#[test]
fn test_compressed_rotation_is_valid_gzip_for_every_mode() {
    for mode in ALL_MODES {
        let log = TestLog::new("gz").with_config(|c| c.with_compress(true));
        let writer = log.open(mode);

        let before: Vec<u8> = (0..10_000u32).flat_map(|i| i.to_le_bytes()).collect();
        writer.write(&before).unwrap();
        writer.rotate_to("gz.log.1.gz");
        writer.write(b"after").unwrap();
        writer.close().unwrap();

        assert_eq!(read_gzip(&log.file("gz.log.1.gz")), before, "mode {mode}");
        assert!(log.tmp_files().is_empty(), "mode {mode}");
        assert_eq!(log.read_active(), b"after", "mode {mode}");
    }
}

#[test]
fn test_compression_with_retention() {
    let log = TestLog::new("both").with_config(|c| c.with_compress(true).with_max_remain(2));
    let writer = log.open(WriterMode::Async);

    rotate_n(&writer, "both.log", ".gz", 5);
    writer.close().unwrap();

    let remaining = log.historical_files();
    assert_eq!(remaining, vec![log.file("both.log.4.gz"), log.file("both.log.5.gz")]);
    assert_eq!(read_gzip(&remaining[0]), b"entry 3\n");
    assert_eq!(read_gzip(&remaining[1]), b"entry 4\n");
    assert!(log.tmp_files().is_empty());
}

#[test]
fn test_retained_files_reported_by_base_writer() {
    let log = TestLog::new("count").with_config(|c| c.with_max_remain(2));
    let config = std::sync::Arc::new(log.config().clone());
    let manager = rollfile::ManualManager::new(std::sync::Arc::clone(&config));
    let trigger = manager.trigger();
    let writer = rollfile::Writer::open(config, Box::new(manager)).unwrap();

    assert_eq!(writer.retained_files(), Some(0));
    for i in 0..4 {
        writer.write(b"x").unwrap();
        trigger.rotate_to(log.file(&format!("count.log.{i}")));
    }
    writer.write(b"x").unwrap();
    writer.close().unwrap();

    assert_eq!(writer.retained_files(), Some(2));
}
