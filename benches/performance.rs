use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use ctxbound_core::config::BudgetConfig;
use ctxbound_core::types::{Column, Scalar, Table};
use ctxbound_export::ExportManager;
use ctxbound_io::ExportFormat;
use ctxbound_safety::safe_render_table;
use ctxbound_store::{Source, Store};
use ctxbound_summary::{histogram, profile, SummaryOptions};

fn make_store(rows: u64) -> Arc<Store> {
    let store = Store::open_in_memory().unwrap();
    store
        .execute_batch(&format!(
            "CREATE TABLE splits AS \
             SELECT i % 200 AS session_id, i AS split_no, \
                    4.0 + (i % 120) / 60.0 AS pace, \
                    CAST(130 + i % 50 AS INTEGER) AS hr, \
                    TIMESTAMP '2024-01-01 06:00:00' + INTERVAL (i) MINUTE AS ts \
             FROM range({rows}) t(i);"
        ))
        .unwrap();
    Arc::new(store)
}

fn bench_export(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let cfg = BudgetConfig {
        scratch_dir: dir.path().to_path_buf(),
        ..BudgetConfig::default()
    };
    let manager = ExportManager::new(make_store(100_000), &cfg);
    c.bench_function("export_parquet_100k", |b| {
        b.iter(|| {
            let h = manager.export("splits", ExportFormat::Parquet, None).unwrap();
            manager.cleanup(h.id()).unwrap();
        })
    });
}

fn bench_summaries(c: &mut Criterion) {
    let store = make_store(100_000);
    let source = Source::table("splits");
    let opts = SummaryOptions::default();
    c.bench_function("profile_100k", |b| {
        b.iter(|| profile(&store, &source, None, &opts).unwrap())
    });
    c.bench_function("histogram_100k_20_bins", |b| {
        b.iter(|| histogram(&store, &source, "pace", Some(20), None, &opts).unwrap())
    });
}

fn bench_render(c: &mut Criterion) {
    let rows = 10_000;
    let table = Table::new(vec![
        Column::new("split_no", (0..rows).map(Scalar::I64).collect()),
        Column::new("note", (0..rows).map(|i| Scalar::Str(format!("lap {i} felt steady and controlled"))).collect()),
    ])
    .unwrap();
    c.bench_function("render_10k_rows", |b| {
        b.iter(|| safe_render_table(&table, 50, None).unwrap())
    });
}

criterion_group!(benches, bench_export, bench_summaries, bench_render);
criterion_main!(benches);
