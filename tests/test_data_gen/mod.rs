//! Shared fixtures for the integration tests: a seeded fitness store,
//! a scratch-scoped budget and a controllable clock.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use ctxbound_core::prelude::*;
use ctxbound_store::Store;

pub const SESSION_ID: i64 = 42;
pub const SESSION_SPLITS: u64 = 2_000;

/// Route `tracing` output through the test harness; safe to call repeatedly.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("ctxbound=debug")
        .with_test_writer()
        .try_init();
}

/// Three short sessions plus session 42 with 2000 splits.
pub fn fitness_store() -> Arc<Store> {
    let store = Store::open_in_memory().expect("in-memory store");
    store
        .execute_batch(
            "CREATE TABLE sessions AS \
             SELECT s AS session_id, \
                    CASE WHEN s % 2 = 0 THEN 'run' ELSE 'ride' END AS sport, \
                    TIMESTAMP '2024-05-01 06:30:00' + INTERVAL (s % 30) DAY AS ts \
             FROM (SELECT unnest([1, 2, 3, 42]) AS s); \
             CREATE TABLE splits AS \
             SELECT s.session_id, k AS split_no, \
                    CAST(4.0 + (k % 120) / 60.0 AS DOUBLE) AS pace, \
                    CAST(135 + k % 30 AS INTEGER) AS hr, \
                    s.ts + INTERVAL (k) MINUTE AS ts \
             FROM sessions s, range(2000) r(k) \
             WHERE s.session_id = 42 OR k < 50;",
        )
        .expect("seed fitness tables");
    Arc::new(store)
}

/// A single `wide` table of `rows` rows with a mix of column types.
pub fn wide_store(rows: u64) -> Arc<Store> {
    let store = Store::open_in_memory().expect("in-memory store");
    store
        .execute_batch(&format!(
            "CREATE TABLE wide AS \
             SELECT i AS id, \
                    CAST(i % 97 AS DOUBLE) / 3.0 AS value, \
                    'athlete_' || CAST(i % 13 AS VARCHAR) AS athlete, \
                    DATE '2024-01-01' + CAST(i % 365 AS INTEGER) AS day \
             FROM range({rows}) t(i);"
        ))
        .expect("seed wide table");
    Arc::new(store)
}

pub fn budget(dir: &Path) -> BudgetConfig {
    BudgetConfig {
        scratch_dir: dir.join("scratch"),
        sweep_interval_secs: 0,
        ..BudgetConfig::default()
    }
}

pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(1_760_000_000_000))
}
