//! Export manager.
//!
//! The row count is taken inside the engine before anything is written, so an
//! oversized result never reaches disk. After `COPY` the file's own row count
//! is checked again; a store that grew in between cannot slip past the cap.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use ctxbound_core::clock::{expiry_after, system_clock, SharedClock};
use ctxbound_core::config::BudgetConfig;
use ctxbound_core::id::HandleId;
use ctxbound_core::sweep::{Sweep, SweepReport};
use ctxbound_core::types::Table;
use ctxbound_core::{Error, Result};
use ctxbound_io::{open_export, ExportFormat, ScratchDir};
use ctxbound_store::{Source, Store};

use crate::handle::ExportHandle;
use crate::registry::ExportRegistry;

pub struct ExportManager {
    store: Arc<Store>,
    scratch: ScratchDir,
    registry: Mutex<ExportRegistry>,
    clock: SharedClock,
    ttl: Duration,
    max_export_rows: u64,
}

impl ExportManager {
    pub fn new(store: Arc<Store>, cfg: &BudgetConfig) -> Self {
        Self::with_clock(store, cfg, system_clock())
    }

    pub fn with_clock(store: Arc<Store>, cfg: &BudgetConfig, clock: SharedClock) -> Self {
        Self {
            store,
            scratch: ScratchDir::new(cfg.scratch_dir.clone()),
            registry: Mutex::new(ExportRegistry::new()),
            clock,
            ttl: cfg.export_ttl(),
            max_export_rows: cfg.max_export_rows,
        }
    }

    pub fn scratch(&self) -> &ScratchDir {
        &self.scratch
    }

    fn registry(&self) -> Result<MutexGuard<'_, ExportRegistry>> {
        self.registry
            .lock()
            .map_err(|_| Error::Engine("export registry lock poisoned".into()))
    }

    /// Create the scratch directory and delete orphaned export files older
    /// than the TTL (left behind by a previous process). Returns how many
    /// were removed.
    pub fn init(&self) -> Result<usize> {
        self.scratch.ensure()?;
        let now = self.clock.now_ms();
        let ttl_ms = self.ttl.as_millis() as u64;
        let registry = self.registry()?;
        let mut removed = 0;
        for entry in self.scratch.list()? {
            if registry.contains(&entry.handle) || entry.modified_ms.saturating_add(ttl_ms) > now {
                continue;
            }
            match self.scratch.delete(&entry.path) {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => tracing::warn!(path = %entry.path.display(), error = %e, "orphan cleanup failed"),
            }
        }
        if removed > 0 {
            tracing::info!(removed, dir = %self.scratch.root().display(), "removed orphaned exports");
        }
        Ok(removed)
    }

    /// Delete every registered export file.
    pub fn teardown(&self) -> SweepReport {
        let handles = match self.registry() {
            Ok(mut reg) => reg.drain_all(),
            Err(e) => {
                tracing::warn!(error = %e, "export teardown skipped");
                return SweepReport::default();
            }
        };
        self.delete_files(handles)
    }

    /// Run `query` (or scan a table) and write the full result to a new
    /// scratch file.
    ///
    /// `max_rows` defaults to, and is clamped by, the configured export cap.
    /// More rows than that is a `SizeExceeded` and no file is left behind.
    pub fn export(
        &self,
        query: &str,
        format: ExportFormat,
        max_rows: Option<u64>,
    ) -> Result<ExportHandle> {
        let cap = match max_rows {
            Some(n) if n > self.max_export_rows => {
                tracing::warn!(requested = n, cap = self.max_export_rows, "clamping export row cap");
                self.max_export_rows
            }
            Some(n) => n,
            None => self.max_export_rows,
        };
        let sql = Source::parse(query)?.to_query();

        let rows = self.store.count(&sql)?;
        if rows > cap {
            return Err(Error::too_many_rows(rows, cap));
        }

        self.scratch.ensure()?;
        let now = self.clock.now_ms();
        let (handle, path) = loop {
            let id = HandleId::generate(now);
            let path = self.scratch.path_for(&id, format);
            if !path.exists() {
                break (id, path);
            }
        };

        if let Err(e) = self.store.copy_to(&sql, &path, format.copy_options()) {
            self.discard(&path);
            return Err(e);
        }

        let (row_count, columns) = match self.verify(&path, cap) {
            Ok(v) => v,
            Err(e) => {
                self.discard(&path);
                return Err(e);
            }
        };
        let size_bytes = self.scratch.size(&path)?;

        let handle = ExportHandle {
            handle,
            path,
            format,
            row_count,
            size_bytes,
            columns,
            created_ms: now,
            expires_ms: expiry_after(now, self.ttl),
        };
        self.registry()?.insert(handle.clone());
        tracing::info!(
            handle = %handle.handle,
            rows = row_count,
            bytes = size_bytes,
            format = %format,
            "export written"
        );
        Ok(handle)
    }

    /// Re-read the written file's row count and columns.
    fn verify(&self, path: &std::path::Path, cap: u64) -> Result<(u64, Vec<String>)> {
        let mut reader = open_export(path)?;
        let rows = reader.num_rows()?;
        if rows > cap {
            return Err(Error::too_many_rows(rows, cap));
        }
        Ok((rows, reader.column_names()))
    }

    fn discard(&self, path: &std::path::Path) {
        if let Err(e) = self.scratch.delete(path) {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove partial export");
        }
    }

    /// Live handle by identifier. Expired handles are reclaimed on the spot
    /// and reported as not found.
    pub fn get(&self, id: &str) -> Result<ExportHandle> {
        let id = HandleId::parse(id)?;
        let now = self.clock.now_ms();
        let expired = {
            let mut reg = self.registry()?;
            match reg.get(&id) {
                None => return Err(Error::HandleNotFound(id.to_string())),
                Some(h) if !h.is_expired(now) => return Ok(h.clone()),
                Some(_) => reg.remove(&id),
            }
        };
        if let Some(h) = expired {
            tracing::debug!(handle = %h.handle, "export expired on access");
            self.delete_files(vec![h]);
        }
        Err(Error::HandleNotFound(id.to_string()))
    }

    /// Path of the file behind a live handle.
    pub fn resolve(&self, id: &str) -> Result<PathBuf> {
        Ok(self.get(id)?.path)
    }

    /// Load a whole export, refusing before any row is read when it holds
    /// more than `max_rows`.
    pub fn load(&self, id: &str, max_rows: usize) -> Result<Table> {
        let path = self.resolve(id)?;
        let mut reader = open_export(&path)?;
        let rows = reader.num_rows()?;
        if rows > max_rows as u64 {
            return Err(Error::too_many_rows(rows, max_rows as u64));
        }
        reader.read_all(max_rows)
    }

    /// Delete one export now. Returns false when it was already gone.
    pub fn cleanup(&self, id: &str) -> Result<bool> {
        let id = HandleId::parse(id)?;
        let Some(handle) = self.registry()?.remove(&id) else {
            return Ok(false);
        };
        self.scratch.delete(&handle.path)?;
        tracing::info!(handle = %id, "export removed");
        Ok(true)
    }

    /// Live handles, oldest first. Expired-but-unswept handles are omitted.
    pub fn list(&self) -> Result<Vec<ExportHandle>> {
        let now = self.clock.now_ms();
        Ok(self
            .registry()?
            .handles()
            .into_iter()
            .filter(|h| !h.is_expired(now))
            .collect())
    }

    fn delete_files(&self, handles: Vec<ExportHandle>) -> SweepReport {
        let mut report = SweepReport::default();
        for h in handles {
            match self.scratch.delete(&h.path) {
                Ok(_) => report.removed += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(handle = %h.handle, error = %e, "failed to delete export");
                }
            }
        }
        report
    }
}

impl Sweep for ExportManager {
    fn name(&self) -> &'static str {
        "exports"
    }

    fn sweep(&self) -> SweepReport {
        let now = self.clock.now_ms();
        let expired = match self.registry() {
            Ok(mut reg) => reg.drain_expired(now),
            Err(e) => {
                tracing::warn!(error = %e, "export sweep skipped");
                return SweepReport::default();
            }
        };
        let report = self.delete_files(expired);
        if report.removed > 0 {
            tracing::debug!(removed = report.removed, "swept expired exports");
        }
        report
    }
}
