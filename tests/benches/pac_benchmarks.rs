//! # PAC Benchmarks
//!
//! | Area | Measured |
//! |------|----------|
//! | pac-01 certificate | SHA-256 over read/write sets of growing size |
//! | pac-01 locks | acquire + release of a write set |
//! | pac-02 commit | full PROPOSE..DECIDE round over two in-process shards |

#![allow(clippy::excessive_nesting)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pac_01_shard_contract::{compute_certificate, LockTable, RwSet};
use pac_02_coordinator::CoordinatorApi;
use pac_tests::fixtures::{transfer_scenario, TwoShards};
use shared_types::GlobalTxId;
use std::time::Duration;

fn rw_set(size: usize) -> RwSet {
    let mut set = RwSet::default();
    for i in 0..size {
        let key = format!("account{i}");
        set.reads.insert(key.clone(), Some(i as u64 + 1));
        set.writes
            .insert(key, Some(format!(r#"{{"balance":"{i}.5"}}"#).into_bytes()));
    }
    set
}

fn bench_certificate(c: &mut Criterion) {
    let mut group = c.benchmark_group("pac-01-certificate");

    for size in [1, 10, 100, 1000] {
        let set = rw_set(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("compute", size), &set, |b, set| {
            b.iter(|| black_box(compute_certificate(set)))
        });
    }

    group.finish();
}

fn bench_locks(c: &mut Criterion) {
    let mut group = c.benchmark_group("pac-01-locks");

    for size in [1, 10, 100] {
        let keys: Vec<String> = (0..size).map(|i| format!("asset{i}")).collect();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("acquire_release", size), &keys, |b, keys| {
            let mut table = LockTable::new();
            let tx = GlobalTxId::new();
            b.iter(|| {
                let acquired = table.acquire(keys.iter().map(String::as_str), &tx);
                black_box(acquired.is_ok());
                table.release_all(&tx);
            })
        });
    }

    group.finish();
}

fn bench_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("pac-02-commit");
    group.measurement_time(Duration::from_secs(10));

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => panic!("tokio runtime: {err}"),
    };
    let shards = runtime.block_on(TwoShards::new());

    group.bench_function("two_shard_transfer", |b| {
        b.iter(|| {
            let result = runtime.block_on(
                shards
                    .coordinator
                    .execute("bench", transfer_scenario()),
            );
            black_box(result.is_ok())
        })
    });

    group.finish();
}

criterion_group!(benches, bench_certificate, bench_locks, bench_commit);
criterion_main!(benches);
