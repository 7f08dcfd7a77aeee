use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use snapkeep::config::Config;
use snapkeep::BackupService;
use std::fs;
use tempfile::TempDir;

/// Fixture generator for a populated snapshot directory
mod fixtures {
    use super::*;

    /// Live store of `size` bytes plus `snapshots` registered copies
    pub fn populated(size: usize, snapshots: usize) -> (TempDir, BackupService) {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::rooted(temp_dir.path());
        fs::write(&config.live_path, vec![0xA5u8; size]).unwrap();

        let service = BackupService::open(&config).unwrap();
        for _ in 0..snapshots {
            service.create().unwrap();
        }

        // unregistered strays for verify to find
        for i in 0..snapshots / 10 {
            fs::write(
                config.snapshot_dir.join(format!("backup-stray-{i}.snapshot")),
                b"stray",
            )
            .unwrap();
        }

        (temp_dir, service)
    }
}

/// Benchmark: create cost as the live store grows
fn bench_create(c: &mut Criterion) {
    let mut group = c.benchmark_group("create");

    for size_kb in [64, 1024, 8192] {
        group.bench_with_input(BenchmarkId::new("live_kb", size_kb), &size_kb, |b, &size_kb| {
            let (_temp_dir, service) = fixtures::populated(size_kb * 1024, 0);

            b.iter(|| {
                let record = service.create().unwrap();
                black_box(record);
            });
        });
    }

    group.finish();
}

/// Benchmark: verify over a directory with many snapshots
fn bench_verify(c: &mut Criterion) {
    let mut group = c.benchmark_group("verify");

    for count in [10, 100, 500] {
        group.bench_with_input(BenchmarkId::new("snapshots", count), &count, |b, &count| {
            let (_temp_dir, service) = fixtures::populated(4 * 1024, count);

            b.iter(|| {
                let report = service.verify().unwrap();
                black_box(report);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_create, bench_verify);

criterion_main!(benches);
