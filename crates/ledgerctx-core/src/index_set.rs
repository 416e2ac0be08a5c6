//! Ordered unique key set
//!
//! Append-ordered, duplicate-free collection of keys. The execution context
//! uses it to remember which keys a run has written, in first-write order.

use std::borrow::Borrow;
use std::hash::Hash;

/// Insertion-ordered set without duplicates
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct KeySet<K: Hash + Eq = String> {
    inner: indexmap::IndexSet<K>,
}

impl<K: Hash + Eq> KeySet<K> {
    pub fn new() -> Self {
        KeySet {
            inner: indexmap::IndexSet::new(),
        }
    }

    /// Insert `key` unless it is already present
    pub fn add(&mut self, key: K) {
        self.inner.insert(key);
    }

    /// Remove `key` if present; the remaining keys keep their order
    pub fn remove<Q>(&mut self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.shift_remove(key);
    }

    pub fn has<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.contains(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &K> {
        self.inner.iter()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<K: Hash + Eq + Clone> KeySet<K> {
    /// Snapshot of all members in insertion order
    pub fn list(&self) -> Vec<K> {
        self.inner.iter().cloned().collect()
    }
}

impl<K: Hash + Eq> Default for KeySet<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_ignores_duplicates() {
        let mut set = KeySet::new();
        set.add("b".to_string());
        set.add("a".to_string());
        set.add("b".to_string());
        assert_eq!(set.list(), vec!["b".to_string(), "a".to_string()]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut set = KeySet::new();
        for key in ["x", "y", "z"] {
            set.add(key);
        }
        set.remove(&"y");
        assert_eq!(set.list(), vec!["x", "z"]);
        set.remove(&"missing");
        assert_eq!(set.list(), vec!["x", "z"]);
    }

    #[test]
    fn test_has() {
        let mut set = KeySet::new();
        assert!(!set.has(&"k"));
        set.add("k");
        assert!(set.has(&"k"));
        set.remove(&"k");
        assert!(!set.has(&"k"));
        assert!(set.is_empty());
    }

    #[test]
    fn test_has_by_borrowed_key() {
        let mut set: KeySet<String> = KeySet::new();
        set.add("balance:alice".to_string());
        assert!(set.has("balance:alice"));
        assert!(!set.has("balance:bob"));
        set.remove("balance:alice");
        assert!(set.is_empty());
    }

    #[test]
    fn test_list_is_a_snapshot() {
        let mut set = KeySet::new();
        set.add("first");
        let snapshot = set.list();
        set.add("second");
        set.remove(&"first");
        assert_eq!(snapshot, vec!["first"]);
        assert_eq!(set.list(), vec!["second"]);
    }

    #[test]
    fn test_readding_removed_key_goes_to_back() {
        let mut set = KeySet::new();
        set.add(1);
        set.add(2);
        set.remove(&1);
        set.add(1);
        assert_eq!(set.list(), vec![2, 1]);
    }
}
