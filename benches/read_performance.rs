//! Performance benchmarks for keyswap-config.
//!
//! These benchmarks cover the lookup paths and show that readers keep
//! making progress while the store is being replaced:
//! - `try_get`/`get`/`contains` latency
//! - Snapshot latency
//! - Scaling with concurrent readers
//! - Reads during continuous reconfiguration

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use keyswap_config::prelude::*;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Deserialize, PartialEq)]
struct BenchConfig {
    value: i32,
    name: String,
    flag: bool,
    items: Vec<String>,
}

type Manager = ConfigurationManager<String, BenchConfig>;

fn document(entries: usize, version: usize) -> String {
    let body: Vec<String> = (0..entries)
        .map(|i| {
            format!(
                r#""key_{i}": {{"value": {version}, "name": "entry_{i}", "flag": true, "items": ["a", "b", "c"]}}"#
            )
        })
        .collect();
    format!("{{{}}}", body.join(", "))
}

fn loaded_manager(entries: usize) -> Manager {
    let manager = Manager::new();
    manager
        .configure_from_str(&document(entries, 0), "json")
        .unwrap();
    manager
}

/// Benchmark single-threaded lookup latency
fn benchmark_read_latency(c: &mut Criterion) {
    let manager = loaded_manager(100);
    let present = "key_42".to_string();
    let absent = "missing".to_string();

    let mut group = c.benchmark_group("read_latency");
    group.bench_function("try_get", |b| {
        b.iter(|| {
            let entry = manager.try_get(black_box(&present));
            black_box(entry.map(|config| config.value));
        });
    });
    group.bench_function("get", |b| {
        b.iter(|| {
            let entry = manager.get(black_box(&present)).unwrap();
            black_box(entry.value);
        });
    });
    group.bench_function("get_missing", |b| {
        b.iter(|| {
            black_box(manager.get(black_box(&absent)).is_err());
        });
    });
    group.bench_function("contains", |b| {
        b.iter(|| {
            black_box(manager.contains(black_box(&present)));
        });
    });
    group.finish();
}

/// Benchmark snapshot acquisition
fn benchmark_snapshot(c: &mut Criterion) {
    let manager = loaded_manager(100);
    let present = "key_7".to_string();

    let mut group = c.benchmark_group("snapshot");
    group.bench_function("snapshot_and_get", |b| {
        b.iter(|| {
            let snapshot = manager.snapshot();
            black_box(snapshot.get(&present).map(|config| config.value));
        });
    });
    group.bench_function("all_keys_100", |b| {
        b.iter(|| {
            black_box(manager.all_keys());
        });
    });
    group.finish();
}

/// Benchmark concurrent reads with varying thread counts
fn benchmark_concurrent_reads(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_reads");

    for num_threads in [1, 2, 4, 8, 16] {
        group.throughput(Throughput::Elements(num_threads as u64 * 1000));

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_threads", num_threads)),
            &num_threads,
            |b, &num_threads| {
                let manager = Arc::new(loaded_manager(100));
                let barrier = Arc::new(Barrier::new(num_threads + 1));

                b.iter_custom(|iters| {
                    let mut handles = vec![];

                    for t in 0..num_threads {
                        let manager = Arc::clone(&manager);
                        let barrier = Arc::clone(&barrier);
                        let key = format!("key_{}", t % 100);

                        handles.push(thread::spawn(move || {
                            barrier.wait();

                            let start = Instant::now();
                            for _ in 0..iters {
                                let entry = manager.try_get(&key);
                                black_box(entry.map(|config| config.value));
                            }
                            start.elapsed()
                        }));
                    }

                    barrier.wait();

                    let total_duration: Duration =
                        handles.into_iter().map(|h| h.join().unwrap()).sum();
                    total_duration / num_threads as u32
                });
            },
        );
    }

    group.finish();
}

/// Benchmark reads while the store is continuously replaced
fn benchmark_reads_during_reconfigure(c: &mut Criterion) {
    let mut group = c.benchmark_group("reads_during_reconfigure");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("reconfigure_with_8_readers", |b| {
        b.iter_custom(|iters| {
            let manager = Arc::new(loaded_manager(100));
            let running = Arc::new(AtomicBool::new(true));
            let reads = Arc::new(AtomicUsize::new(0));

            let readers: Vec<_> = (0..8)
                .map(|t| {
                    let manager = Arc::clone(&manager);
                    let running = Arc::clone(&running);
                    let reads = Arc::clone(&reads);
                    let key = format!("key_{}", t);
                    thread::spawn(move || {
                        while running.load(Ordering::Relaxed) {
                            let entry = manager.get(&key).unwrap();
                            black_box(entry.value);
                            reads.fetch_add(1, Ordering::Relaxed);
                        }
                    })
                })
                .collect();

            let documents: Vec<String> = (0..iters as usize).map(|i| document(100, i)).collect();
            let start = Instant::now();
            for text in &documents {
                manager.configure_from_str(text, "json").unwrap();
            }
            let duration = start.elapsed();

            running.store(false, Ordering::Relaxed);
            for reader in readers {
                reader.join().unwrap();
            }
            println!(
                "  Completed {} reads during {} reconfigurations",
                reads.load(Ordering::Relaxed),
                iters
            );

            duration
        });
    });

    group.finish();
}

/// Benchmark a full parse-decode-swap cycle per format
fn benchmark_configure(c: &mut Criterion) {
    let json = document(100, 1);
    let yaml: String = (0..100)
        .map(|i| format!("key_{i}:\n  value: 1\n  name: entry_{i}\n  flag: true\n  items: [a, b, c]\n"))
        .collect();
    let xml = format!(
        "<entries>{}</entries>",
        (0..100)
            .map(|i| format!(
                r#"<entry key="key_{i}" value="1" name="entry_{i}" flag="true"><items>a</items><items>b</items></entry>"#
            ))
            .collect::<String>()
    );

    let manager = Manager::new();
    let mut group = c.benchmark_group("configure");
    for (format, text) in [("json", &json), ("yaml", &yaml), ("xml", &xml)] {
        group.bench_with_input(BenchmarkId::from_parameter(format), text, |b, text| {
            b.iter(|| manager.configure_from_str(black_box(text), format).unwrap());
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    benchmark_read_latency,
    benchmark_snapshot,
    benchmark_concurrent_reads,
    benchmark_reads_during_reconfigure,
    benchmark_configure,
);

criterion_main!(benches);
