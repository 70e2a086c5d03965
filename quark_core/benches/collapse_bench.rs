//! Quantum value collapse and raise benchmarks.
//!
//! Measures the Value fast path against the cost of raising and catching a
//! stored failure.

use criterion::{Criterion, criterion_group, criterion_main};
use quark_core::prelude::*;
use std::hint::black_box;

#[derive(Debug, Clone)]
struct BenchFailure;

impl Diagnosable for BenchFailure {
    const REASON: Option<&'static str> = Some("bench failure");
}

fn bench_collapse_value(c: &mut Criterion) {
    let q = QuantumValue::from(42u64);

    c.bench_function("collapse_value", |b| {
        b.iter(|| black_box(*black_box(&q).get()));
    });
}

fn bench_inspect_error(c: &mut Criterion) {
    let q: QuantumValue<u64> = QuantumValue::failure(BenchFailure);

    c.bench_function("inspect_error_type", |b| {
        b.iter(|| black_box(black_box(&q).is_error_of::<BenchFailure>()));
    });
}

fn bench_raise_and_catch(c: &mut Criterion) {
    let q: QuantumValue<u64> = QuantumValue::failure(BenchFailure);

    c.bench_function("raise_and_catch", |b| {
        b.iter(|| {
            let caught = catch::<BenchFailure, u64>(|| *black_box(&q).get());
            black_box(caught.is_err())
        });
    });
}

fn bench_frame_clone(c: &mut Criterion) {
    let frame = FailureFrame::capture(String::from("cloned failure"));

    c.bench_function("frame_try_clone", |b| {
        b.iter(|| black_box(frame.try_clone()));
    });
}

criterion_group!(
    benches,
    bench_collapse_value,
    bench_inspect_error,
    bench_raise_and_catch,
    bench_frame_clone,
);
criterion_main!(benches);
