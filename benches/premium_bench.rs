//! Premium Benchmarks — Per-item Arithmetic Cost
//!
//! Benchmarks the domain functions every (token, network) item runs through
//! once per cycle, plus the payload amount parser.
//!
//! Run with: cargo bench --bench premium_bench

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rust_decimal_macros::dec;

use lst_price_fetcher::adapters::quotes::types::parse_base_units;
use lst_price_fetcher::domain::observation::to_reference_units;
use lst_price_fetcher::domain::premium::{describe, premium};

/// Benchmark the premium of a secondary quote over its benchmark.
fn bench_premium(c: &mut Criterion) {
    c.bench_function("premium_secondary_over_primary", |b| {
        b.iter(|| {
            let _ratio = premium(black_box(dec!(1.098765432109876543)), black_box(dec!(1.1)));
        });
    });
}

/// Benchmark base-unit conversion of an 18-decimal rate.
fn bench_reference_units(c: &mut Criterion) {
    c.bench_function("to_reference_units_18dp", |b| {
        b.iter(|| {
            let _rate = to_reference_units(black_box(1_098_765_432_109_876_543));
        });
    });
}

/// Benchmark the full quote path: payload string to stored premium.
fn bench_quote_to_premium(c: &mut Criterion) {
    let benchmark = dec!(1.1);

    c.bench_function("quote_string_to_premium", |b| {
        b.iter(|| {
            let raw = parse_base_units(black_box("1150000000000000000"));
            let price = raw.and_then(to_reference_units);
            let _ratio = price.map(|p| premium(benchmark, p));
        });
    });
}

/// Benchmark the log rendering of a premium.
fn bench_describe(c: &mut Criterion) {
    c.bench_function("describe_premium", |b| {
        b.iter(|| {
            let _text = describe(black_box(dec!(-0.0213)));
        });
    });
}

criterion_group!(
    benches,
    bench_premium,
    bench_reference_units,
    bench_quote_to_premium,
    bench_describe,
);
criterion_main!(benches);
