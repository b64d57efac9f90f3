//! Export manager: bounded handles, row caps, round trips and expiry.

mod test_data_gen;

use std::time::Duration;

use ctxbound_core::config::MAX_HANDLE_BYTES;
use ctxbound_core::error::ErrorKind;
use ctxbound_export::ExportManager;
use ctxbound_io::ExportFormat;
use ctxbound_safety::safe_load;
use test_data_gen::*;

#[test]
fn test_handle_json_is_bounded_regardless_of_result_size() {
    init_test_tracing();
    let dir = tempfile::tempdir().unwrap();
    let store = wide_store(100_000);
    let manager = ExportManager::new(store, &budget(dir.path()));

    for rows in [100u64, 10_000, 100_000] {
        let handle = manager
            .export(&format!("SELECT * FROM wide LIMIT {rows}"), ExportFormat::Parquet, None)
            .unwrap();
        assert_eq!(handle.row_count, rows);
        let json = handle.to_bounded_json().unwrap();
        assert!(json.len() < MAX_HANDLE_BYTES, "{rows} rows gave {} bytes", json.len());
        assert!(json.contains(handle.id()));
    }
}

#[test]
fn test_handle_json_drops_columns_before_exceeding_bound() {
    let dir = tempfile::tempdir().unwrap();
    let store = wide_store(10);
    let manager = ExportManager::new(store, &budget(dir.path()));

    let columns: Vec<String> = (0..60)
        .map(|i| format!("id AS a_rather_long_column_name_number_{i}"))
        .collect();
    let sql = format!("SELECT {} FROM wide", columns.join(", "));
    let handle = manager.export(&sql, ExportFormat::Csv, None).unwrap();
    assert_eq!(handle.columns.len(), 60);

    let json = handle.to_bounded_json().unwrap();
    assert!(json.len() < MAX_HANDLE_BYTES);
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert!(parsed["columns_omitted"].as_u64().unwrap() > 0);
}

#[test]
fn test_row_cap_refuses_export_and_leaves_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = wide_store(5_000);
    let manager = ExportManager::new(store, &budget(dir.path()));
    manager.init().unwrap();

    let err = manager
        .export("SELECT * FROM wide", ExportFormat::Parquet, Some(1_000))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SizeExceeded);
    assert!(err.to_string().contains("5000"));
    assert!(err.to_string().contains("GROUP BY"));

    assert!(manager.scratch().list().unwrap().is_empty());
    assert!(manager.list().unwrap().is_empty());
}

#[test]
fn test_export_then_safe_load_matches_direct_read() {
    let dir = tempfile::tempdir().unwrap();
    let store = fitness_store();
    let manager = ExportManager::new(store.clone(), &budget(dir.path()));
    let sql = "SELECT session_id, split_no, pace, hr FROM splits WHERE session_id = 1 ORDER BY split_no";

    let direct = store.query_table(sql, 1_000).unwrap();
    for format in [ExportFormat::Parquet, ExportFormat::Csv] {
        let handle = manager.export(sql, format, None).unwrap();
        let loaded = safe_load(&handle.path, 1_000).unwrap();
        assert_eq!(loaded.num_rows(), direct.num_rows());
        assert_eq!(loaded.column_names(), direct.column_names());
        assert_eq!(handle.columns, direct.column_names());
    }
}

#[test]
fn test_safe_load_refuses_oversized_export() {
    let dir = tempfile::tempdir().unwrap();
    let manager = ExportManager::new(wide_store(2_000), &budget(dir.path()));
    let handle = manager.export("wide", ExportFormat::Parquet, None).unwrap();

    let err = safe_load(&handle.path, 500).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SizeExceeded);
    assert_eq!(manager.load(handle.id(), 2_000).unwrap().num_rows(), 2_000);
}

#[test]
fn test_expired_handle_is_not_found_and_file_is_removed() {
    let dir = tempfile::tempdir().unwrap();
    let clock = manual_clock();
    let cfg = budget(dir.path());
    let manager = ExportManager::with_clock(fitness_store(), &cfg, clock.clone());

    let handle = manager.export("sessions", ExportFormat::Csv, None).unwrap();
    clock.advance(cfg.export_ttl() - Duration::from_secs(1));
    assert!(manager.get(handle.id()).is_ok());

    clock.advance(Duration::from_secs(1));
    let err = manager.get(handle.id()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HandleNotFound);
    assert!(!handle.path.exists());
}

#[test]
fn test_cleanup_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let manager = ExportManager::new(fitness_store(), &budget(dir.path()));
    let handle = manager.export("sessions", ExportFormat::Parquet, None).unwrap();

    assert!(manager.cleanup(handle.id()).unwrap());
    assert!(!manager.cleanup(handle.id()).unwrap());
    assert!(!handle.path.exists());
}

#[test]
fn test_parallel_exports_get_distinct_handles_and_files() {
    let dir = tempfile::tempdir().unwrap();
    let manager = ExportManager::new(fitness_store(), &budget(dir.path()));

    let handles: Vec<_> = std::thread::scope(|s| {
        let workers: Vec<_> = [1, 2, 3, 42, 1, 2, 3, 42]
            .into_iter()
            .map(|session| {
                let manager = &manager;
                s.spawn(move || {
                    manager
                        .export(
                            &format!("SELECT * FROM splits WHERE session_id = {session}"),
                            ExportFormat::Parquet,
                            None,
                        )
                        .map(|h| (session, h))
                })
            })
            .collect();
        workers.into_iter().map(|w| w.join().unwrap().unwrap()).collect()
    });

    let ids: std::collections::HashSet<_> = handles.iter().map(|(_, h)| h.id().to_string()).collect();
    let paths: std::collections::HashSet<_> = handles.iter().map(|(_, h)| h.path.clone()).collect();
    assert_eq!(ids.len(), 8);
    assert_eq!(paths.len(), 8);
    for (session, handle) in &handles {
        assert!(handle.path.exists());
        let expected = if *session == SESSION_ID { SESSION_SPLITS } else { 50 };
        assert_eq!(handle.row_count, expected);
        assert_eq!(safe_load(&handle.path, 5_000).unwrap().num_rows() as u64, expected);
    }
    assert_eq!(manager.list().unwrap().len(), 8);
}
