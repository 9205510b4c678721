//! Throughput benchmarks for compression and decoding.

use als_codec::{AlsCompressor, AlsParser, CompressorConfig};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;

fn sample_csv(rows: usize) -> String {
    let mut csv = String::from("id,customer,status,region,country\n");
    for i in 0..rows {
        csv.push_str(&format!(
            "{},customer-{},{},{},{}\n",
            i,
            i % 97,
            ["pending", "shipped", "delivered"][i % 3],
            ["north", "south"][i % 2],
            "United States"
        ));
    }
    csv
}

fn sample_json(records: usize) -> String {
    let items: Vec<String> = (0..records)
        .map(|i| {
            format!(
                r#"{{"id":{},"kind":"{}","owner":{{"team":"platform","tier":{}}}}}"#,
                i,
                ["event", "metric", "trace"][i % 3],
                i % 4
            )
        })
        .collect();
    format!("[{}]", items.join(","))
}

/// Compression throughput for CSV and JSON input
fn bench_compress(c: &mut Criterion) {
    let mut group = c.benchmark_group("compress");
    let compressor = AlsCompressor::new();

    for size in [1_000, 10_000] {
        let csv = sample_csv(size);
        group.throughput(Throughput::Bytes(csv.len() as u64));
        group.bench_with_input(BenchmarkId::new("csv", size), &csv, |b, csv| {
            b.iter(|| black_box(compressor.compress_csv(black_box(csv)).unwrap()))
        });

        let json = sample_json(size);
        group.throughput(Throughput::Bytes(json.len() as u64));
        group.bench_with_input(BenchmarkId::new("json", size), &json, |b, json| {
            b.iter(|| black_box(compressor.compress_json(black_box(json)).unwrap()))
        });
    }

    group.finish();
}

/// Decoding throughput
fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    let compressor = AlsCompressor::new();
    let parser = AlsParser::new();

    let als = compressor.compress_csv(&sample_csv(10_000)).unwrap();
    group.throughput(Throughput::Bytes(als.len() as u64));
    group.bench_function("csv", |b| b.iter(|| black_box(parser.to_csv(black_box(&als)).unwrap())));

    let als = compressor.compress_json(&sample_json(10_000)).unwrap();
    group.throughput(Throughput::Bytes(als.len() as u64));
    group.bench_function("json", |b| b.iter(|| black_box(parser.to_json(black_box(&als)).unwrap())));

    group.finish();
}

/// Pattern discovery scaling with worker count
fn bench_workers(c: &mut Criterion) {
    let mut group = c.benchmark_group("workers");
    let csv = sample_csv(50_000);
    group.throughput(Throughput::Bytes(csv.len() as u64));

    for workers in [1, 2, 4, 8] {
        let compressor =
            AlsCompressor::with_config(CompressorConfig::new().with_parallelism(workers)).unwrap();
        group.bench_with_input(BenchmarkId::new("threads", workers), &csv, |b, csv| {
            b.iter(|| black_box(compressor.compress_csv(black_box(csv)).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compress, bench_decode, bench_workers);
criterion_main!(benches);
