//! Transaction diff deriver
//!
//! Projects a finished context's storage down to the dirty keys, in
//! first-write order. The result is the minimal set of key/value pairs a host
//! persists to make the run durable.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use sha2::{Digest, Sha256};

use crate::context::ExecutionContext;
use crate::value::Value;
use crate::{Error, Result};

/// Ordered mapping of written keys to their final values
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct StateDiff {
    entries: IndexMap<String, Value>,
}

impl StateDiff {
    /// Derive the diff of a context
    pub fn from_context(ctx: &ExecutionContext<'_>) -> Result<Self> {
        derive(&ctx.update_index_list(), ctx.storage())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// JSON object with members in diff order
    pub fn to_json(&self) -> serde_json::Value {
        let obj: serde_json::Map<String, serde_json::Value> = self
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        serde_json::Value::Object(obj)
    }

    /// SHA-256 (hex) of the canonical diff encoding.
    ///
    /// The encoding is a JSON array of `[key, value]` pairs in diff order, so
    /// it does not depend on how a JSON object map orders its members.
    pub fn digest(&self) -> String {
        let pairs: Vec<serde_json::Value> = self
            .entries
            .iter()
            .map(|(k, v)| serde_json::json!([k, v.to_json()]))
            .collect();
        let canonical = serde_json::Value::Array(pairs).to_string();
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// Build the diff for `keys` out of `storage`.
///
/// A key with no storage entry is an [`Error::InvariantViolation`]; it is
/// never silently dropped.
pub fn derive(keys: &[String], storage: &BTreeMap<String, Value>) -> Result<StateDiff> {
    let mut entries = IndexMap::with_capacity(keys.len());
    for key in keys {
        let value = storage.get(key).ok_or_else(|| {
            Error::InvariantViolation(format!(
                "dirty key '{}' has no storage entry at diff time",
                key
            ))
        })?;
        entries.insert(key.clone(), value.clone());
    }
    Ok(StateDiff { entries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::NotFound;

    #[test]
    fn test_diff_only_contains_dirty_keys() {
        let provider = |_: &str| Some("100".to_string());
        let mut ctx = ExecutionContext::new(&provider);
        ctx.set("written", Value::Integer(1));
        ctx.get("read_only").unwrap();
        let diff = StateDiff::from_context(&ctx).unwrap();
        assert_eq!(diff.keys().collect::<Vec<_>>(), vec!["written"]);
    }

    #[test]
    fn test_diff_follows_first_write_order() {
        let mut ctx = ExecutionContext::new(&NotFound);
        ctx.set("z", Value::Integer(1));
        ctx.set("a", Value::Integer(2));
        ctx.set("z", Value::Integer(3));
        let diff = StateDiff::from_context(&ctx).unwrap();
        assert_eq!(diff.keys().collect::<Vec<_>>(), vec!["z", "a"]);
        assert_eq!(diff.get("z"), Some(&Value::Integer(3)));
        assert_eq!(
            serde_json::to_string(&diff).unwrap(),
            r#"{"z":3,"a":2}"#
        );
    }

    #[test]
    fn test_diff_is_idempotent() {
        let mut ctx = ExecutionContext::new(&NotFound);
        ctx.set("k", Value::from("v"));
        let first = StateDiff::from_context(&ctx).unwrap();
        let second = StateDiff::from_context(&ctx).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.digest(), second.digest());
    }

    #[test]
    fn test_empty_context_empty_diff() {
        let ctx = ExecutionContext::new(&NotFound);
        let diff = StateDiff::from_context(&ctx).unwrap();
        assert!(diff.is_empty());
        assert_eq!(diff.to_json(), serde_json::json!({}));
    }

    #[test]
    fn test_missing_storage_entry_is_invariant_violation() {
        let mut storage = BTreeMap::new();
        storage.insert("present".to_string(), Value::Null);
        let keys = vec!["present".to_string(), "ghost".to_string()];
        match derive(&keys, &storage) {
            Err(Error::InvariantViolation(msg)) => assert!(msg.contains("ghost")),
            other => panic!("expected InvariantViolation, got {:?}", other),
        }
    }

    #[test]
    fn test_digest_depends_on_order_and_values() {
        let mut storage = BTreeMap::new();
        storage.insert("a".to_string(), Value::Integer(1));
        storage.insert("b".to_string(), Value::Integer(2));
        let ab = derive(&["a".into(), "b".into()], &storage).unwrap();
        let ba = derive(&["b".into(), "a".into()], &storage).unwrap();
        assert_eq!(ab.digest().len(), 64);
        assert!(ab.digest().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(ab.digest(), ba.digest());

        storage.insert("b".to_string(), Value::Integer(3));
        let changed = derive(&["a".into(), "b".into()], &storage).unwrap();
        assert_ne!(ab.digest(), changed.digest());
    }
}
