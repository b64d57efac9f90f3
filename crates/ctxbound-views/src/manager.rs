//! View manager.
//!
//! `materialize` holds the registry lock for the whole collision check,
//! creation and eviction, so two callers can never both register a name or
//! push the registry past capacity.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use ctxbound_core::clock::{expiry_after, system_clock, SharedClock};
use ctxbound_core::config::BudgetConfig;
use ctxbound_core::id::ViewName;
use ctxbound_core::sweep::{Sweep, SweepReport};
use ctxbound_core::{Error, Result};
use ctxbound_store::{quote_ident, Source, Store};

use crate::registry::{MaterializedView, ViewRegistry};

pub struct ViewManager {
    store: Arc<Store>,
    registry: Mutex<ViewRegistry>,
    clock: SharedClock,
    capacity: usize,
    default_ttl: Duration,
}

impl ViewManager {
    pub fn new(store: Arc<Store>, cfg: &BudgetConfig) -> Self {
        Self::with_clock(store, cfg, system_clock())
    }

    pub fn with_clock(store: Arc<Store>, cfg: &BudgetConfig, clock: SharedClock) -> Self {
        Self {
            store,
            registry: Mutex::new(ViewRegistry::new()),
            clock,
            capacity: cfg.max_views.max(1),
            default_ttl: cfg.view_ttl(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn registry(&self) -> Result<MutexGuard<'_, ViewRegistry>> {
        self.registry
            .lock()
            .map_err(|_| Error::Engine("view registry lock poisoned".into()))
    }

    /// Start from an empty registry, dropping anything a previous `init`
    /// left registered.
    pub fn init(&self) -> Result<()> {
        let stale = self.registry()?.drain_all();
        self.drop_tables(stale);
        tracing::debug!(capacity = self.capacity, "view manager ready");
        Ok(())
    }

    /// Drop every live view.
    pub fn teardown(&self) -> SweepReport {
        match self.registry() {
            Ok(mut reg) => {
                let all = reg.drain_all();
                drop(reg);
                self.drop_tables(all)
            }
            Err(e) => {
                tracing::warn!(error = %e, "view teardown skipped");
                SweepReport::default()
            }
        }
    }

    /// Create `name` from `query` with the given (or default) TTL.
    ///
    /// Fails with `NameCollision` while `name` is live or names an existing
    /// table. When the registry is full the oldest-created view is dropped
    /// before the new one is registered.
    pub fn materialize(
        &self,
        name: &str,
        query: &str,
        ttl: Option<Duration>,
    ) -> Result<MaterializedView> {
        let name = ViewName::parse(name)?;
        let sql = Source::parse(query)?.to_query();
        let now = self.clock.now_ms();

        let mut reg = self.registry()?;
        let expired = reg.drain_expired(now);
        self.drop_tables(expired);

        if reg.contains(&name) || self.store.relation_exists(name.as_str())? {
            return Err(Error::NameCollision(name.to_string()));
        }

        let ident = quote_ident(name.as_str());
        if let Err(e) = self.store.execute(&format!("CREATE TABLE {ident} AS {sql}")) {
            if e.to_string().contains("already exists") {
                return Err(Error::NameCollision(name.to_string()));
            }
            return Err(e);
        }
        let row_count = match self.store.count(&format!("SELECT * FROM {ident}")) {
            Ok(n) => n,
            Err(e) => {
                self.drop_table(&name);
                return Err(e);
            }
        };

        while reg.len() >= self.capacity {
            let Some(oldest) = reg.oldest().cloned() else {
                break;
            };
            if let Some(evicted) = reg.remove(&oldest) {
                tracing::info!(view = %evicted.name, "evicting oldest view");
                self.drop_tables(vec![evicted]);
            }
        }

        let view = MaterializedView {
            name,
            query: sql,
            row_count,
            created_ms: now,
            expires_ms: expiry_after(now, ttl.unwrap_or(self.default_ttl)),
        };
        reg.insert(view.clone());
        tracing::info!(view = %view.name, rows = row_count, "view materialized");
        Ok(view)
    }

    /// Live view by name. An expired view is dropped on the spot and
    /// reported as not found.
    pub fn get(&self, name: &str) -> Result<MaterializedView> {
        let name = ViewName::parse(name)?;
        let now = self.clock.now_ms();
        let expired = {
            let mut reg = self.registry()?;
            match reg.get(&name) {
                None => return Err(Error::HandleNotFound(name.to_string())),
                Some(v) if !v.is_expired(now) => return Ok(v.clone()),
                Some(_) => reg.remove(&name),
            }
        };
        if let Some(v) = expired {
            tracing::debug!(view = %v.name, "view expired on access");
            self.drop_tables(vec![v]);
        }
        Err(Error::HandleNotFound(name.to_string()))
    }

    pub fn is_live(&self, name: &str) -> bool {
        self.get(name).is_ok()
    }

    /// Gate a read of `source`. Every expired view is reclaimed first, so
    /// neither a bare name nor a query can reach stale rows. A read that
    /// mentions one of the reclaimed views fails with `HandleNotFound`.
    pub fn check_access(&self, source: &Source) -> Result<()> {
        let now = self.clock.now_ms();
        let expired = self.registry()?.drain_expired(now);
        if expired.is_empty() {
            return Ok(());
        }
        let hit = expired
            .iter()
            .find(|v| mentions(source, &v.name))
            .map(|v| v.name.to_string());
        tracing::debug!(count = expired.len(), "expired views reclaimed on access");
        self.drop_tables(expired);
        match hit {
            Some(name) => Err(Error::HandleNotFound(name)),
            None => Ok(()),
        }
    }

    /// Drop one view now. Returns false when it was not live.
    pub fn drop_view(&self, name: &str) -> Result<bool> {
        let name = ViewName::parse(name)?;
        let Some(view) = self.registry()?.remove(&name) else {
            return Ok(false);
        };
        self.store
            .execute(&format!("DROP TABLE IF EXISTS {}", quote_ident(view.name.as_str())))?;
        tracing::info!(view = %view.name, "view dropped");
        Ok(true)
    }

    /// Live views in creation order.
    pub fn list(&self) -> Result<Vec<MaterializedView>> {
        let now = self.clock.now_ms();
        Ok(self
            .registry()?
            .views()
            .into_iter()
            .filter(|v| !v.is_expired(now))
            .collect())
    }

    fn drop_table(&self, name: &ViewName) -> bool {
        match self
            .store
            .execute(&format!("DROP TABLE IF EXISTS {}", quote_ident(name.as_str())))
        {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(view = %name, error = %e, "failed to drop view");
                false
            }
        }
    }

    fn drop_tables(&self, views: Vec<MaterializedView>) -> SweepReport {
        let mut report = SweepReport::default();
        for v in views {
            if self.drop_table(&v.name) {
                report.removed += 1;
            } else {
                report.failed += 1;
            }
        }
        report
    }
}

/// Whether `name` appears as an identifier in the table name or query text.
fn mentions(source: &Source, name: &ViewName) -> bool {
    let text = match source {
        Source::Table(t) => t.as_str(),
        Source::Query(q) => q.as_str(),
    };
    text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .any(|token| token.eq_ignore_ascii_case(name.as_str()))
}

impl Sweep for ViewManager {
    fn name(&self) -> &'static str {
        "views"
    }

    fn sweep(&self) -> SweepReport {
        let now = self.clock.now_ms();
        let expired = match self.registry() {
            Ok(mut reg) => reg.drain_expired(now),
            Err(e) => {
                tracing::warn!(error = %e, "view sweep skipped");
                return SweepReport::default();
            }
        };
        self.drop_tables(expired)
    }
}
