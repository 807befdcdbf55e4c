//! Write throughput per strategy.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rollfile::WriterMode;
use rollfile_bench::{generate_lines, open_writer};
use std::sync::Arc;
use std::thread;

const MODES: [WriterMode; 4] = [
    WriterMode::None,
    WriterMode::Lock,
    WriterMode::Async,
    WriterMode::Buffer,
];

/// Benchmark single-threaded writes of various line sizes.
fn bench_single_thread(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_thread");

    for size in [64usize, 512, 4096] {
        let lines = generate_lines(256, size);
        group.throughput(Throughput::Bytes((size * lines.len()) as u64));

        for mode in MODES {
            group.bench_with_input(BenchmarkId::new(mode.as_str(), size), &lines, |b, lines| {
                let (_dir, writer, _trigger) = open_writer(mode);
                b.iter(|| {
                    for line in lines {
                        black_box(writer.write(line).unwrap());
                    }
                });
                writer.close().unwrap();
            });
        }
    }

    group.finish();
}

/// Benchmark writes from several threads sharing one writer.
fn bench_concurrent(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent");
    let threads = 4usize;
    let lines = Arc::new(generate_lines(128, 128));
    group.throughput(Throughput::Elements((threads * lines.len()) as u64));

    // The unsynchronized writer is single producer only.
    for mode in [WriterMode::Lock, WriterMode::Async, WriterMode::Buffer] {
        group.bench_function(BenchmarkId::new(mode.as_str(), threads), |b| {
            let (_dir, writer, _trigger) = open_writer(mode);
            let writer: Arc<dyn rollfile::RollingWriter> = Arc::from(writer);
            b.iter(|| {
                let handles: Vec<_> = (0..threads)
                    .map(|_| {
                        let writer = Arc::clone(&writer);
                        let lines = Arc::clone(&lines);
                        thread::spawn(move || {
                            for line in lines.iter() {
                                writer.write(line).unwrap();
                            }
                        })
                    })
                    .collect();
                for handle in handles {
                    handle.join().unwrap();
                }
            });
            writer.close().unwrap();
        });
    }

    group.finish();
}

criterion_group!(benches, bench_single_thread, bench_concurrent);
criterion_main!(benches);
