//! Execution context: the single gateway for contract state access
//!
//! A context lives for exactly one invocation. It owns:
//!
//! 1. local storage, written only through [`ExecutionContext::set`]
//! 2. the dirty-key set, in first-write order
//! 3. the execution trace of explicit side-effecting actions
//! 4. the call origin: the caller address and the amount it attached
//!
//! Reads fall back to the host's [`ValueProvider`] on a local miss. A
//! provider-sourced value is returned as-is: it is neither cached in local
//! storage nor marked dirty, so a later miss on the same key consults the
//! provider again.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::index_set::KeySet;
use crate::provider::ValueProvider;
use crate::safe_math::Amount;
use crate::value::Value;
use crate::{Error, Result};

// ── Execution Trace ───────────────────────────────────────

/// One explicit side-effecting action issued by a contract
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TraceRecord {
    pub action: String,
    pub parameters: Value,
}

/// Append-only audit trail of actions, in issuance order
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExecutionTrace {
    records: Vec<TraceRecord>,
}

impl ExecutionTrace {
    pub fn new() -> Self {
        ExecutionTrace {
            records: Vec::new(),
        }
    }

    pub fn append(&mut self, record: TraceRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[TraceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<TraceRecord> {
        self.records
    }
}

// ── Call Origin ───────────────────────────────────────────

/// Who issued an invocation and the amount attached to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOrigin {
    /// Caller address; empty for an anonymous call
    pub from: String,
    pub value: Amount,
}

impl CallOrigin {
    pub fn new(from: impl Into<String>, value: Amount) -> Self {
        CallOrigin {
            from: from.into(),
            value,
        }
    }

    /// No caller and nothing attached
    pub fn anonymous() -> Self {
        CallOrigin::new("", Amount::zero())
    }

    pub fn is_anonymous(&self) -> bool {
        self.from.is_empty()
    }
}

impl Default for CallOrigin {
    fn default() -> Self {
        CallOrigin::anonymous()
    }
}

// ── Execution Context ─────────────────────────────────────

/// Per-invocation state layer that contracts read and write through
pub struct ExecutionContext<'p> {
    storage: BTreeMap<String, Value>,
    dirty: KeySet<String>,
    trace: ExecutionTrace,
    provider: &'p dyn ValueProvider,
    provider_reads: AtomicU64,
    origin: CallOrigin,
}

impl<'p> ExecutionContext<'p> {
    /// Create an empty, anonymous context that resolves misses through `provider`
    pub fn new(provider: &'p dyn ValueProvider) -> Self {
        Self::with_origin(provider, CallOrigin::anonymous())
    }

    /// Create an empty context for a call issued by `origin`
    pub fn with_origin(provider: &'p dyn ValueProvider, origin: CallOrigin) -> Self {
        ExecutionContext {
            storage: BTreeMap::new(),
            dirty: KeySet::new(),
            trace: ExecutionTrace::new(),
            provider,
            provider_reads: AtomicU64::new(0),
            origin,
        }
    }

    /// Address that issued this call; empty when anonymous
    pub fn caller(&self) -> &str {
        &self.origin.from
    }

    /// Amount the caller attached to this call
    pub fn value(&self) -> &Amount {
        &self.origin.value
    }

    pub fn origin(&self) -> &CallOrigin {
        &self.origin
    }

    /// Read `key`, falling back to the value provider on a local miss.
    ///
    /// Never marks the key dirty. Fails with
    /// [`Error::MalformedPersistedValue`] if the provider payload is not
    /// valid JSON.
    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        if let Some(value) = self.storage.get(key) {
            return Ok(Some(value.clone()));
        }

        self.provider_reads.fetch_add(1, Ordering::Relaxed);
        let Some(payload) = self.provider.resolve(key) else {
            tracing::debug!(key, "state miss, provider reported not found");
            return Ok(None);
        };

        match Value::parse(&payload) {
            Ok(value) => {
                tracing::debug!(key, "state miss resolved by provider");
                Ok(Some(value))
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "provider returned malformed value");
                Err(Error::MalformedPersistedValue {
                    key: key.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Write `key`, marking it dirty. Repeated writes keep a single dirty entry.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        self.dirty.add(key.clone());
        self.storage.insert(key, value);
    }

    /// Read-only view of every locally written key
    pub fn storage(&self) -> &BTreeMap<String, Value> {
        &self.storage
    }

    /// Dirty keys in first-write order
    pub fn update_index_list(&self) -> Vec<String> {
        self.dirty.list()
    }

    pub fn is_dirty(&self, key: &str) -> bool {
        self.dirty.has(key)
    }

    /// Record a side-effecting action; never touches storage or dirty keys
    pub fn execute(&mut self, action: impl Into<String>, parameters: Value) {
        self.trace.append(TraceRecord {
            action: action.into(),
            parameters,
        });
    }

    /// The full trace in issuance order
    pub fn line_data(&self) -> &[TraceRecord] {
        self.trace.records()
    }

    /// Number of times `get` consulted the value provider
    pub fn provider_reads(&self) -> u64 {
        self.provider_reads.load(Ordering::Relaxed)
    }

    /// Move storage, dirty keys and trace out of the context
    pub fn into_parts(self) -> (BTreeMap<String, Value>, KeySet<String>, ExecutionTrace) {
        (self.storage, self.dirty, self.trace)
    }
}

impl fmt::Debug for ExecutionContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("storage", &self.storage)
            .field("dirty", &self.dirty)
            .field("trace", &self.trace)
            .field("provider_reads", &self.provider_reads())
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

// ── Tests ─────────────────────────────────────────────────
