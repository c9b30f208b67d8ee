//! Read-path micro benchmarks.
//!
//! Repeats single read operations against pre-seeded backends, so the
//! variance that one-shot phase timings hide becomes visible.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use storerace_bench::backends::{AggregationQuery, DocumentBackend, SqliteBackend};
use storerace_bench::{BackendAdapter, DatasetGenerator, Scale, Variant};

fn bench_reads(c: &mut Criterion) {
    let mut group = c.benchmark_group("reads");

    for scale in [Scale::Small, Scale::Medium] {
        let dataset = DatasetGenerator::new().generate(scale, Variant::Relational);

        let mut sqlite = SqliteBackend::in_memory();
        sqlite.connect().unwrap();
        sqlite.write_dataset(Variant::Relational, &dataset).unwrap();

        let mut document = DocumentBackend::temporary();
        document.connect().unwrap();
        document.configure_indexes(Variant::Indexed).unwrap();
        document.write_dataset(Variant::Indexed, &dataset).unwrap();

        let name = scale.count().to_string();

        group.bench_with_input(BenchmarkId::new("sqlite/filtered", &name), &(), |b, _| {
            b.iter(|| black_box(sqlite.read_posts(Variant::Relational, true).unwrap().len()));
        });
        group.bench_with_input(BenchmarkId::new("sqlite/sorted", &name), &(), |b, _| {
            b.iter(|| black_box(sqlite.read_summaries(Variant::Relational, true).unwrap().len()));
        });

        for variant in Variant::ALL {
            let label = format!("document_{variant}");
            group.bench_with_input(
                BenchmarkId::new(format!("{label}/filtered"), &name),
                &(),
                |b, _| {
                    b.iter(|| black_box(document.read_posts(variant, true).unwrap().len()));
                },
            );
            group.bench_with_input(
                BenchmarkId::new(format!("{label}/sorted"), &name),
                &(),
                |b, _| {
                    b.iter(|| black_box(document.read_summaries(variant, true).unwrap().len()));
                },
            );
        }
    }

    group.finish();
}

fn bench_aggregations(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregations");
    let dataset = DatasetGenerator::new().generate(Scale::Medium, Variant::Relational);

    let mut sqlite = SqliteBackend::in_memory();
    sqlite.connect().unwrap();
    sqlite.write_dataset(Variant::Relational, &dataset).unwrap();

    let mut document = DocumentBackend::temporary();
    document.connect().unwrap();
    document.write_dataset(Variant::Relational, &dataset).unwrap();

    for query in AggregationQuery::ALL {
        group.bench_function(BenchmarkId::new("sqlite", query.as_str()), |b| {
            b.iter(|| black_box(sqlite.aggregate(query).unwrap().len()));
        });
        group.bench_function(BenchmarkId::new("document", query.as_str()), |b| {
            b.iter(|| black_box(document.aggregate(query).unwrap().len()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_reads, bench_aggregations);
criterion_main!(benches);
