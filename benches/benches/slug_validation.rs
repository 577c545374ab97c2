//! Benchmarks for slug handling on the request path.

use conservation_kernel::branch_manager::Slug;
use criterion::{Criterion, black_box, criterion_group, criterion_main};

fn bench_slug(c: &mut Criterion) {
    let mut group = c.benchmark_group("slug");

    group.bench_function("generate", |b| b.iter(|| black_box(Slug::generate())));

    let valid = "a3f9c2d4e5b6a7c8";
    group.bench_function("validate_ok", |b| {
        b.iter(|| black_box(Slug::new(black_box(valid))))
    });

    let long = "x".repeat(200);
    group.bench_function("validate_too_long", |b| {
        b.iter(|| black_box(Slug::new(black_box(long.as_str()))))
    });

    group.finish();
}

criterion_group!(benches, bench_slug);
criterion_main!(benches);
