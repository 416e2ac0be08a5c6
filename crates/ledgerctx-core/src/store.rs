//! In-memory persisted contract state
//!
//! Holds each key's committed value in its JSON encoding, answers execution
//! context misses as a [`ValueProvider`], and absorbs the diff of a finished
//! run. Keys the diff does not mention keep their previous value.

use std::collections::BTreeMap;

use crate::diff::StateDiff;
use crate::provider::ValueProvider;
use crate::value::Value;
use crate::{Error, Result};

/// Key → JSON-encoded value store for one contract
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct PersistedState {
    slots: BTreeMap<String, String>,
}

impl PersistedState {
    pub fn new() -> Self {
        PersistedState {
            slots: BTreeMap::new(),
        }
    }

    /// Load a JSON object document; each member becomes one slot
    pub fn from_json_document(text: &str) -> Result<Self> {
        let malformed = |reason: String| Error::MalformedPersistedValue {
            key: "<document>".into(),
            reason,
        };
        let doc: serde_json::Value =
            serde_json::from_str(text).map_err(|e| malformed(e.to_string()))?;
        let serde_json::Value::Object(members) = doc else {
            return Err(malformed("state document must be a JSON object".into()));
        };
        let slots = members
            .into_iter()
            .map(|(key, value)| (key, value.to_string()))
            .collect();
        Ok(PersistedState { slots })
    }

    /// Store `value` under `key`
    pub fn insert(&mut self, key: impl Into<String>, value: &Value) {
        self.slots.insert(key.into(), value.to_json_string());
    }

    /// Store an already-encoded payload under `key` without validating it
    pub fn insert_raw(&mut self, key: impl Into<String>, payload: impl Into<String>) {
        self.slots.insert(key.into(), payload.into());
    }

    pub fn get_raw(&self, key: &str) -> Option<&str> {
        self.slots.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Merge a committed diff: written keys overwrite, others remain
    pub fn apply(&mut self, diff: &StateDiff) {
        for (key, value) in diff.iter() {
            self.insert(key, value);
        }
        tracing::debug!(keys = diff.len(), total = self.slots.len(), "applied state diff");
    }

    /// Decode every slot back into one JSON object document
    pub fn to_json_document(&self) -> Result<serde_json::Value> {
        let mut members = serde_json::Map::new();
        for (key, payload) in &self.slots {
            let value: serde_json::Value =
                serde_json::from_str(payload).map_err(|e| Error::MalformedPersistedValue {
                    key: key.clone(),
                    reason: e.to_string(),
                })?;
            members.insert(key.clone(), value);
        }
        Ok(serde_json::Value::Object(members))
    }
}

impl ValueProvider for PersistedState {
    fn resolve(&self, key: &str) -> Option<String> {
        self.slots.get(key).cloned()
    }
}
