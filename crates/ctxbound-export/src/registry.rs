use std::collections::HashMap;

use ctxbound_core::id::HandleId;
use ctxbound_core::ttl::TtlIndex;

use crate::handle::ExportHandle;

/// Live export handles. Not synchronized; the manager owns it behind a lock.
#[derive(Debug, Default)]
pub struct ExportRegistry {
    handles: HashMap<HandleId, ExportHandle>,
    expiry: TtlIndex<HandleId>,
}

impl ExportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, handle: ExportHandle) {
        self.expiry.insert(handle.handle.clone(), handle.expires_ms);
        self.handles.insert(handle.handle.clone(), handle);
    }

    pub fn get(&self, id: &HandleId) -> Option<&ExportHandle> {
        self.handles.get(id)
    }

    pub fn remove(&mut self, id: &HandleId) -> Option<ExportHandle> {
        self.expiry.remove(id);
        self.handles.remove(id)
    }

    pub fn contains(&self, id: &HandleId) -> bool {
        self.handles.contains_key(id)
    }

    /// Remove and return every handle expired as of `now_ms`.
    pub fn drain_expired(&mut self, now_ms: u64) -> Vec<ExportHandle> {
        self.expiry
            .drain_expired(now_ms)
            .into_iter()
            .filter_map(|id| self.handles.remove(&id))
            .collect()
    }

    pub fn drain_all(&mut self) -> Vec<ExportHandle> {
        self.expiry.clear();
        self.handles.drain().map(|(_, h)| h).collect()
    }

    /// Live handles, oldest first.
    pub fn handles(&self) -> Vec<ExportHandle> {
        let mut out: Vec<ExportHandle> = self.handles.values().cloned().collect();
        out.sort_by(|a, b| (a.created_ms, &a.handle).cmp(&(b.created_ms, &b.handle)));
        out
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
