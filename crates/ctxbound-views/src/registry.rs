use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use ctxbound_core::id::ViewName;
use ctxbound_core::ttl::TtlIndex;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializedView {
    pub name: ViewName,
    pub query: String,
    pub row_count: u64,
    pub created_ms: u64,
    pub expires_ms: u64,
}

impl MaterializedView {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_ms
    }
}

/// Live views. The expiry index's sequence numbers double as creation order
/// for eviction.
#[derive(Debug, Default)]
pub struct ViewRegistry {
    views: HashMap<ViewName, MaterializedView>,
    expiry: TtlIndex<ViewName>,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, view: MaterializedView) {
        self.expiry.insert(view.name.clone(), view.expires_ms);
        self.views.insert(view.name.clone(), view);
    }

    pub fn get(&self, name: &ViewName) -> Option<&MaterializedView> {
        self.views.get(name)
    }

    pub fn contains(&self, name: &ViewName) -> bool {
        self.views.contains_key(name)
    }

    pub fn remove(&mut self, name: &ViewName) -> Option<MaterializedView> {
        self.expiry.remove(name);
        self.views.remove(name)
    }

    /// Earliest-created live view.
    pub fn oldest(&self) -> Option<&ViewName> {
        self.expiry.oldest()
    }

    pub fn drain_expired(&mut self, now_ms: u64) -> Vec<MaterializedView> {
        self.expiry
            .drain_expired(now_ms)
            .into_iter()
            .filter_map(|name| self.views.remove(&name))
            .collect()
    }

    pub fn drain_all(&mut self) -> Vec<MaterializedView> {
        self.expiry.clear();
        self.views.drain().map(|(_, v)| v).collect()
    }

    /// Live views in creation order.
    pub fn views(&self) -> Vec<MaterializedView> {
        let mut out: Vec<(u64, MaterializedView)> = self
            .views
            .values()
            .map(|v| (self.expiry.seq_of(&v.name).unwrap_or(u64::MAX), v.clone()))
            .collect();
        out.sort_by_key(|(seq, _)| *seq);
        out.into_iter().map(|(_, v)| v).collect()
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(name: &str, created: u64, expires: u64) -> MaterializedView {
        MaterializedView {
            name: ViewName::parse(name).unwrap(),
            query: "SELECT 1".into(),
            row_count: 1,
            created_ms: created,
            expires_ms: expires,
        }
    }

    #[test]
    fn oldest_follows_insertion_not_expiry() {
        let mut reg = ViewRegistry::new();
        reg.insert(view("long_lived", 0, 10_000));
        reg.insert(view("short_lived", 1, 100));
        assert_eq!(reg.oldest().unwrap().as_str(), "long_lived");
        let names: Vec<_> = reg.views().into_iter().map(|v| v.name.to_string()).collect();
        assert_eq!(names, vec!["long_lived", "short_lived"]);
    }

    #[test]
    fn drain_expired_leaves_live_views() {
        let mut reg = ViewRegistry::new();
        reg.insert(view("a", 0, 100));
        reg.insert(view("b", 0, 200));
        let gone = reg.drain_expired(100);
        assert_eq!(gone.len(), 1);
        assert_eq!(gone[0].name.as_str(), "a");
        assert_eq!(reg.len(), 1);
        assert!(reg.contains(&ViewName::parse("b").unwrap()));
    }
}
