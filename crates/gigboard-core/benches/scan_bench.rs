//! Benchmarks for the linear-scan query layer.
//!
//! The scan is lookup-bound in production; against the in-memory ledger it
//! measures the per-key overhead of the scan loop itself (predicate,
//! accumulation, final sort).
//!
//! Run with: cargo bench -p gigboard-core --bench scan_bench

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use gigboard_core::record::{AccountId, Job, JobStatus};
use gigboard_core::scan::scan_jobs;
use gigboard_core::view::ViewSpec;
use gigboard_harness::MemoryLedger;

fn seeded_ledger(jobs: u64) -> MemoryLedger {
    let ledger = MemoryLedger::new();
    for i in 0..jobs {
        let client = AccountId::new(format!("0xc{}", i % 7));
        ledger.post(|k| {
            let mut job = Job::open(k, client.clone(), format!("job {i}"))
                .category(if i % 2 == 0 { "dev" } else { "design" })
                .max_budget(u128::from((i * 31) % 997));
            if i % 3 == 0 {
                job.status = JobStatus::InProgress;
            }
            job
        });
    }
    ledger
}

fn bench_scan(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    let mut group = c.benchmark_group("scan/jobs");
    for jobs in [100u64, 1_000, 10_000] {
        group.throughput(Throughput::Elements(jobs));
        let ledger = seeded_ledger(jobs);

        let open_by_budget = ViewSpec::with_default_page_size()
            .filter(|job| job.status == JobStatus::Open)
            .order_by(|a, b| b.max_budget.cmp(&a.max_budget));
        group.bench_with_input(BenchmarkId::new("open_by_budget", jobs), &(), |b, _| {
            b.iter(|| {
                let snapshot = runtime
                    .block_on(scan_jobs(&ledger, &open_by_budget))
                    .unwrap();
                black_box(snapshot)
            })
        });

        let match_all = ViewSpec::with_default_page_size();
        group.bench_with_input(BenchmarkId::new("match_all", jobs), &(), |b, _| {
            b.iter(|| {
                let snapshot = runtime.block_on(scan_jobs(&ledger, &match_all)).unwrap();
                black_box(snapshot)
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_scan);
criterion_main!(benches);
