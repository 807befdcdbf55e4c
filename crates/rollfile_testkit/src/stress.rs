//! Stress tests for rolling writers.
//!
//! These helpers hammer a writer from several threads, optionally rotating
//! underneath them, and check that every record landed whole.

use rollfile::{RollingWriter, RotationTrigger};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Rotations requested while writing.
    pub rotations: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            rotations: 0,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Rotations: {}", self.rotations);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Writes per thread.
    pub operations: usize,
    /// Number of concurrent writer threads.
    pub threads: usize,
    /// Size of each record in bytes, including the trailing newline.
    pub record_size: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 1_000,
            threads: 4,
            record_size: 64,
        }
    }
}

impl StressConfig {
    /// Total bytes the run writes when every operation succeeds.
    pub fn expected_bytes(&self) -> usize {
        self.operations * self.threads * self.record_size
    }
}

/// Builds the record thread `thread` writes: its tag byte repeated, then `\n`.
pub fn record_for(thread: usize, record_size: usize) -> Vec<u8> {
    assert!(record_size >= 2, "records need a tag and a newline");
    let mut record = vec![b'A' + (thread % 26) as u8; record_size - 1];
    record.push(b'\n');
    record
}

/// Writes records concurrently from `config.threads` threads.
pub fn stress_concurrent_writes(
    writer: &Arc<dyn RollingWriter>,
    config: &StressConfig,
) -> StressTestResult {
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let writer = Arc::clone(writer);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let record = record_for(t, config.record_size);
            let operations = config.operations;

            thread::spawn(move || {
                for _ in 0..operations {
                    match writer.write(&record) {
                        Ok(_) => successful.fetch_add(1, Ordering::Relaxed),
                        Err(_) => failed.fetch_add(1, Ordering::Relaxed),
                    };
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Writer thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Writes records concurrently while another thread keeps requesting
/// rotations to `<dir>/<prefix>.NNNN`.
pub fn stress_rotating_writes(
    writer: &Arc<dyn RollingWriter>,
    trigger: &RotationTrigger,
    dir: &Path,
    prefix: &str,
    config: &StressConfig,
) -> StressTestResult {
    let done = Arc::new(AtomicBool::new(false));

    let rotator = {
        let done = Arc::clone(&done);
        let trigger = trigger.clone();
        let dir = dir.to_path_buf();
        let prefix = prefix.to_string();
        thread::spawn(move || {
            let mut rotations = 0usize;
            while !done.load(Ordering::Acquire) {
                if trigger.rotate_to(dir.join(format!("{prefix}.{rotations:04}"))) {
                    rotations += 1;
                }
                thread::sleep(Duration::from_millis(1));
            }
            rotations
        })
    };

    let mut result = stress_concurrent_writes(writer, config);
    done.store(true, Ordering::Release);
    result.rotations = rotator.join().expect("Rotator thread panicked");
    result
}

/// Checks that `content` is made of whole records from `config`, with each
/// thread's records all present.
pub fn verify_records(content: &[u8], config: &StressConfig) -> Result<(), String> {
    if content.len() != config.expected_bytes() {
        return Err(format!(
            "expected {} bytes, found {}",
            config.expected_bytes(),
            content.len()
        ));
    }

    let mut per_thread = vec![0usize; config.threads];
    for (i, record) in content.chunks(config.record_size).enumerate() {
        let thread = match record[0].checked_sub(b'A') {
            Some(tag) => tag as usize,
            None => return Err(format!("record {i} has no thread tag")),
        };
        if thread >= config.threads || record != record_for(thread, config.record_size).as_slice() {
            return Err(format!("record {i} is torn or interleaved"));
        }
        per_thread[thread] += 1;
    }

    match per_thread.iter().position(|&n| n != config.operations) {
        Some(t) => Err(format!(
            "thread {t} wrote {} records, expected {}",
            per_thread[t], config.operations
        )),
        None => Ok(()),
    }
}
