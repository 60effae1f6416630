/// Intake and reporting overhead benchmarks
///
/// Measures the per-record cost of the guarded intake path (capacity poll
/// plus append), the aggregation pass, and report rendering. Intake is the
/// hot path: it runs once per memory operand of the profiled program.
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::time::Duration;

use huella::cli::RankBy;
use huella::engine::{EngineConfig, WssEngine};
use huella::filter::UnitFilter;
use huella::report::render;

const RECORDS: usize = 100_000;

fn bench_engine(max_records: usize) -> WssEngine {
    WssEngine::new(EngineConfig {
        line_bytes: 64,
        max_records,
        max_instructions: u64::MAX,
    })
    .expect("valid config")
}

/// Guarded intake: poll + record for every access
fn bench_record_intake(c: &mut Criterion) {
    let mut group = c.benchmark_group("intake");
    group.measurement_time(Duration::from_secs(10));
    group.throughput(Throughput::Elements(RECORDS as u64));

    group.bench_function("guarded_record_read", |b| {
        b.iter(|| {
            let mut engine = bench_engine(RECORDS);
            let unit = engine.register_unit("bench", 0x1000);
            for i in 0..RECORDS as u64 {
                if engine.at_capacity() {
                    break;
                }
                engine.record_read(unit, i * 8);
            }
            black_box(engine.recorded_reads());
        });
    });

    group.finish();
}

/// Intake plus the full finalization pass (aggregation + row snapshot)
fn bench_finalization(c: &mut Criterion) {
    let mut group = c.benchmark_group("finalize");
    group.measurement_time(Duration::from_secs(10));
    group.throughput(Throughput::Elements(RECORDS as u64));

    // Addresses cycle through 4096 lines so the hash sets stay hot but
    // non-trivial.
    group.bench_function("aggregate_100k_records", |b| {
        b.iter(|| {
            let mut engine = bench_engine(RECORDS);
            let unit = engine.register_unit("bench", 0x1000);
            for i in 0..RECORDS as u64 {
                engine.record_read(unit, (i % 4096) * 64);
            }
            let report = engine.on_normal_exit().expect("first finalize");
            black_box(report.wss_lines);
        });
    });

    group.finish();
}

/// Rendering a many-row report to text
fn bench_render(c: &mut Criterion) {
    let mut engine = bench_engine(RECORDS);
    let units: Vec<_> = (0..512u64)
        .map(|i| engine.register_unit(&format!("routine_{i}"), (i + 1) * 0x1000))
        .collect();
    for (i, &unit) in units.iter().enumerate() {
        engine.record_read(unit, (i as u64) * 64);
        engine.record_write(unit, (i as u64) * 128);
    }
    let report = engine.on_normal_exit().expect("first finalize");
    let filter = UnitFilter::all();

    let mut group = c.benchmark_group("render");
    group.throughput(Throughput::Elements(512));

    group.bench_function("render_512_rows", |b| {
        b.iter(|| {
            let text = render(&report, RankBy::Wss, &filter);
            black_box(text.len());
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_record_intake,
    bench_finalization,
    bench_render
);

criterion_main!(benches);
