use criterion::{criterion_group, criterion_main};


criterion_group!(
    benches,
    generate_bench::register_benchmarks,
    acquisition_bench::register_benchmarks
);
criterion_main!(benches);
