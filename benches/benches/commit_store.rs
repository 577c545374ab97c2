//! Benchmarks for the commit store behind `BranchManager`.
//!
//! Performance-critical paths:
//! - `BranchManager::commit`: order assignment and insert in one statement
//! - `BranchManager::latest`: tip lookup on the `(branch_slug, commit_order)` index
//! - `BranchManager::history`: full line scan, newest first

use conservation_kernel::branch_manager::{BranchManager, CommitDraft, Owner, Slug};
use conservation_kernel::store::{connect, migrate};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use serde_json::json;
use tokio::runtime::Runtime;

fn owner() -> Owner {
    Owner {
        first_name: "Bench".to_string(),
        last_name: "Runner".to_string(),
        email: "bench@example.org".to_string(),
        id: "bench".to_string(),
    }
}

fn draft(i: usize) -> CommitDraft {
    CommitDraft::new(
        Some(format!("edit {i}")),
        Some(json!({
            "type": "FeatureCollection",
            "features": [{"type": "Feature", "properties": {"id": i}}],
        })),
    )
}

/// Manager over an in-memory database with one branch of `depth` commits.
async fn seeded(depth: usize) -> (BranchManager, Slug) {
    let pool = connect("sqlite::memory:", 1)
        .await
        .expect("in-memory pool");
    migrate(&pool, "schweinfurthii").await.expect("migration");
    let manager = BranchManager::new(pool, "schweinfurthii");

    let slug = manager
        .create(&owner(), None, "bench", draft(0))
        .await
        .expect("create")
        .branch
        .slug;
    for i in 1..depth {
        manager.commit(&slug, draft(i)).await.expect("commit");
    }
    (manager, slug)
}

fn bench_append(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let mut group = c.benchmark_group("commit_store/append");

    for depth in [1usize, 100, 1_000] {
        let (manager, slug) = rt.block_on(seeded(depth));
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.to_async(&rt).iter(|| async {
                black_box(manager.commit(&slug, draft(0)).await.expect("commit"))
            });
        });
    }

    group.finish();
}

fn bench_latest(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let mut group = c.benchmark_group("commit_store/latest");

    for depth in [10usize, 1_000] {
        let (manager, slug) = rt.block_on(seeded(depth));
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.to_async(&rt)
                .iter(|| async { black_box(manager.latest(&slug).await.expect("latest")) });
        });
    }

    group.finish();
}

fn bench_history(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let mut group = c.benchmark_group("commit_store/history");

    for depth in [10usize, 100, 1_000] {
        let (manager, slug) = rt.block_on(seeded(depth));
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.to_async(&rt)
                .iter(|| async { black_box(manager.history(&slug).await.expect("history")) });
        });
    }

    group.finish();
}

fn bench_merge(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let (manager, _) = rt.block_on(seeded(1));

    c.bench_function("commit_store/create_and_merge", |b| {
        b.to_async(&rt).iter(|| async {
            let created = manager
                .create(&owner(), None, "merge", draft(1))
                .await
                .expect("create");
            black_box(manager.merge(&created.branch.slug).await.expect("merge"))
        });
    });
}

criterion_group!(benches, bench_append, bench_latest, bench_history, bench_merge);
criterion_main!(benches);
