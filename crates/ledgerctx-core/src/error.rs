//! Error types for the ledgerctx runtime
//!
//! All fallible operations return `Result<T, Error>`.
//! Nothing is retried internally: every error aborts the current
//! invocation and propagates to the dispatch/host layer.

use thiserror::Error;

/// ledgerctx runtime error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Bounded arithmetic result above the permitted maximum
    #[error("Number too big: {0} exceeds the permitted maximum")]
    NumberTooBig(String),

    /// Bounded arithmetic result below the permitted minimum
    #[error("Number too small: {0} is below the permitted minimum")]
    NumberTooSmall(String),

    /// Bounded division with a zero divisor
    #[error("Division by zero: {0} / 0")]
    DivisionByZero(String),

    /// A value provider returned a payload that is not valid JSON
    #[error("Malformed persisted value for key '{key}': {reason}")]
    MalformedPersistedValue { key: String, reason: String },

    /// A dirty key has no storage entry at diff time
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// The selected method is not registered on the contract
    #[error("Unknown method '{method}' on contract '{contract}'")]
    UnknownMethod { contract: String, method: String },

    /// Positional argument count does not match the method descriptor
    #[error("Method '{method}' expects {expected} argument(s), found {found}")]
    ArityMismatch {
        method: String,
        expected: usize,
        found: usize,
    },

    /// Call string could not be parsed into a method and arguments
    #[error("Invalid call string '{call}': {reason}")]
    InvalidCallString { call: String, reason: String },

    /// Value of the wrong type handed to a contract or conversion
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeError { expected: String, found: String },

    /// Assertion raised by contract logic
    #[error("Contract error: {0}")]
    ContractError(String),

    /// A method without the mutation flag wrote state under enforcement
    #[error("Read-only method '{method}' wrote keys: {}", keys.join(", "))]
    ReadOnlyViolation { method: String, keys: Vec<String> },

    /// A run exceeded a configured resource limit
    #[error("Resource limit exceeded: {0}")]
    ResourceLimit(String),

    /// Invalid runner configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type alias for ledgerctx operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_malformed_value() {
        let err = Error::MalformedPersistedValue {
            key: "counter".into(),
            reason: "expected value at line 1 column 1".into(),
        };
        assert_eq!(
            err.to_string(),
            "Malformed persisted value for key 'counter': expected value at line 1 column 1"
        );
    }

    #[test]
    fn test_display_read_only_violation_lists_keys() {
        let err = Error::ReadOnlyViolation {
            method: "get".into(),
            keys: vec!["a".into(), "b".into()],
        };
        assert_eq!(err.to_string(), "Read-only method 'get' wrote keys: a, b");
    }
}
