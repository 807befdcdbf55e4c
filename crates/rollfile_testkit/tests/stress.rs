//! Concurrent writers, with and without rotations underneath them.

use rollfile_testkit::prelude::*;

const CONCURRENT_MODES: [WriterMode; 3] = [WriterMode::Lock, WriterMode::Async, WriterMode::Buffer];

#[test]
fn test_concurrent_writes_keep_records_whole() {
    let config = StressConfig::default();
    for mode in CONCURRENT_MODES {
        let log = TestLog::new("stress").with_config(|c| c.with_buffer_threshold(1000));
        let (writer, _) = log.open(mode).into_shared();

        let result = stress_concurrent_writes(&writer, &config);
        writer.close().unwrap();

        assert_eq!(result.failed_ops, 0, "mode {mode}");
        verify_records(&log.read_active(), &config)
            .unwrap_or_else(|err| panic!("mode {mode}: {err}"));
    }
}

#[test]
fn test_concurrent_writes_survive_rotations() {
    let config = StressConfig {
        operations: 2_000,
        threads: 4,
        record_size: 32,
    };
    for mode in CONCURRENT_MODES {
        let log = TestLog::new("churn").with_config(|c| c.with_buffer_threshold(512));
        let (writer, trigger) = log.open(mode).into_shared();

        let result = stress_rotating_writes(&writer, &trigger, log.dir(), "churn.log", &config);
        writer.close().unwrap();
        result.print_summary(&format!("rotating writes ({mode})"));

        assert_eq!(result.failed_ops, 0, "mode {mode}");
        verify_records(&log.read_all(), &config)
            .unwrap_or_else(|err| panic!("mode {mode}: {err}"));
        for file in log.historical_files() {
            let content = read_log_file(&file);
            assert_eq!(content.len() % config.record_size, 0, "{}", file.display());
        }
    }
}

#[test]
fn test_concurrent_rotations_with_compression_and_retention() {
    let config = StressConfig {
        operations: 500,
        threads: 4,
        record_size: 16,
    };
    let log = TestLog::new("mix").with_config(|c| c.with_compress(true).with_max_remain(4));
    let (writer, trigger) = log.open(WriterMode::Lock).into_shared();

    let result = stress_rotating_writes(&writer, &trigger, log.dir(), "mix.log", &config);
    writer.close().unwrap();

    assert_eq!(result.failed_ops, 0);
    assert!(log.historical_files().len() <= 4);
    assert!(log.tmp_files().is_empty());
}
