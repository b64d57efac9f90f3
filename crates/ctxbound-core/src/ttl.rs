//! Expiry index keyed by deadline.
//!
//! Entries live in a `BTreeMap` ordered by `(expires_ms, seq)`, so collecting
//! everything due at `now` walks only the expired prefix. A side map gives
//! O(log n) removal by key. `seq` breaks ties between equal deadlines and
//! doubles as the creation order.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

#[derive(Debug)]
pub struct TtlIndex<K> {
    by_deadline: BTreeMap<(u64, u64), K>,
    slots: HashMap<K, (u64, u64)>,
    next_seq: u64,
}

impl<K> Default for TtlIndex<K> {
    fn default() -> Self {
        Self {
            by_deadline: BTreeMap::new(),
            slots: HashMap::new(),
            next_seq: 0,
        }
    }
}

impl<K: Clone + Eq + Hash> TtlIndex<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `key` until `expires_ms`. Re-inserting replaces the deadline and
    /// the creation order. Returns the assigned sequence number.
    pub fn insert(&mut self, key: K, expires_ms: u64) -> u64 {
        self.remove(&key);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.by_deadline.insert((expires_ms, seq), key.clone());
        self.slots.insert(key, (expires_ms, seq));
        seq
    }

    pub fn remove(&mut self, key: &K) -> Option<u64> {
        let slot = self.slots.remove(key)?;
        self.by_deadline.remove(&slot);
        Some(slot.0)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.slots.contains_key(key)
    }

    /// Remove and return every key whose deadline is `<= now_ms`, soonest first.
    pub fn drain_expired(&mut self, now_ms: u64) -> Vec<K> {
        let live = self.by_deadline.split_off(&(now_ms.saturating_add(1), 0));
        let expired = std::mem::replace(&mut self.by_deadline, live);
        expired
            .into_values()
            .inspect(|key| {
                self.slots.remove(key);
            })
            .collect()
    }

    /// Key with the smallest sequence number (the oldest insertion).
    pub fn oldest(&self) -> Option<&K> {
        self.slots
            .iter()
            .min_by_key(|(_, (_, seq))| *seq)
            .map(|(key, _)| key)
    }

    /// Sequence number of `key`.
    pub fn seq_of(&self, key: &K) -> Option<u64> {
        self.slots.get(key).map(|(_, seq)| *seq)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&mut self) -> Vec<K> {
        self.slots.clear();
        std::mem::take(&mut self.by_deadline).into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_returns_only_due_keys_in_deadline_order() {
        let mut idx = TtlIndex::new();
        idx.insert("c", 300);
        idx.insert("a", 100);
        idx.insert("b", 200);

        assert_eq!(idx.drain_expired(99), Vec::<&str>::new());
        assert_eq!(idx.drain_expired(200), vec!["a", "b"]);
        assert_eq!(idx.len(), 1);
        assert!(idx.contains(&"c"));
        assert!(!idx.contains(&"a"));
    }

    #[test]
    fn reinsert_replaces_deadline() {
        let mut idx = TtlIndex::new();
        idx.insert("a", 100);
        idx.insert("a", 500);
        assert_eq!(idx.len(), 1);
        assert!(idx.drain_expired(100).is_empty());
        assert_eq!(idx.drain_expired(500), vec!["a"]);
    }

    #[test]
    fn expiry_is_inclusive_of_the_deadline() {
        let mut idx = TtlIndex::new();
        idx.insert("a", 100);
        assert!(idx.drain_expired(99).is_empty());
        assert_eq!(idx.drain_expired(100), vec!["a"]);
    }

    #[test]
    fn oldest_follows_insertion_not_deadline() {
        let mut idx = TtlIndex::new();
        idx.insert("first", 900);
        idx.insert("second", 100);
        assert_eq!(idx.oldest(), Some(&"first"));
        idx.remove(&"first");
        assert_eq!(idx.oldest(), Some(&"second"));
    }

    #[test]
    fn clear_empties_both_maps() {
        let mut idx = TtlIndex::new();
        idx.insert(1u32, 10);
        idx.insert(2u32, 20);
        let mut cleared = idx.clear();
        cleared.sort();
        assert_eq!(cleared, vec![1, 2]);
        assert!(idx.is_empty());
        assert!(idx.drain_expired(u64::MAX).is_empty());
    }
}
