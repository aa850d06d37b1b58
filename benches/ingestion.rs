use std::fmt::Write as _;
use std::fs;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use instrument_csv_import::ingestion::{ImportOptions, Importer};
use instrument_csv_import::store::IN_MEMORY;
use tempfile::TempDir;

const ROWS: usize = 10_000;

fn generated_csv() -> String {
    let mut out = String::from("Sample ID,Temperature (°C),Pressure,Count,Operator\n");
    for i in 0..ROWS {
        let _ = writeln!(
            out,
            "S{i:05},{:.2},{:.3},{},op_{}",
            20.0 + (i % 100) as f64 * 0.1,
            101.325 + (i % 7) as f64 * 0.01,
            i % 1000,
            i % 5
        );
    }
    out
}

fn bench_import(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bench.csv");
    fs::write(&path, generated_csv()).unwrap();

    let mut group = c.benchmark_group("import_one");
    group.throughput(Throughput::Elements(ROWS as u64));
    for batch_size in [100usize, 1000, 5000] {
        group.bench_function(format!("batch_{batch_size}"), |b| {
            b.iter_batched(
                || {
                    let opts = ImportOptions {
                        batch_size,
                        log_sinks: Vec::new(),
                        ..Default::default()
                    };
                    let mut importer = Importer::new(IN_MEMORY, opts).unwrap();
                    importer.connect().unwrap();
                    importer
                },
                |mut importer| {
                    let stats = importer.import_one(&path, None).unwrap();
                    assert_eq!(stats.imported_rows, ROWS);
                    importer
                },
                BatchSize::PerIteration,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_import);
criterion_main!(benches);
