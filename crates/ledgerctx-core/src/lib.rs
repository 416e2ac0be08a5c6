//! ledgerctx core - execution context for sandboxed state contracts
//!
//! A contract's view of ledger state during one invocation. Reads fall
//! through to a host-supplied provider, writes stay local and are tracked,
//! and the finished context reduces to the minimal diff a host commits.
//!
//! # Architecture
//!
//! ```text
//! call string → CallEntry → ContractInstance ──→ Contract handler
//!                                 ↓                    ↓ get / set / execute
//!                          ExecutionContext ←── ValueProvider (PersistedState)
//!                                 ↓
//!                    StateDiff + ExecutionTrace → RunOutcome
//! ```
//!
//! # Guarantees
//!
//! - **Deterministic**: Same state and same call produce identical diffs
//! - **Isolated**: Nothing reaches the provider until the host commits
//! - **Minimal**: A diff holds only keys written during the run
//! - **Bounded**: Arithmetic stays within ±2^256 or fails

pub mod config;
pub mod context;
pub mod contracts;
pub mod diff;
pub mod dispatch;
pub mod error;
pub mod index_set;
pub mod provider;
pub mod runner;
pub mod safe_math;
pub mod store;
pub mod value;

pub use config::{RunMode, RunnerConfig};
pub use context::{CallOrigin, ExecutionContext, ExecutionTrace, TraceRecord};
pub use diff::StateDiff;
pub use dispatch::{should, CallEntry, Contract, ContractInstance, MethodDescriptor, DEFAULT_ENTRY};
pub use error::{Error, Result};
pub use index_set::KeySet;
pub use provider::{NotFound, ValueProvider};
pub use runner::{RunOutcome, Runner};
pub use safe_math::Amount;
pub use store::PersistedState;
pub use value::Value;

/// Version of this library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_then_read_back() {
        let mut state = PersistedState::new();
        let runner = Runner::default();

        let mut ledger = contracts::lookup("ledger").unwrap();
        let outcome = runner
            .run_call_string(ledger.as_mut(), &state, r#"mint("alice", 100)"#)
            .unwrap();
        assert!(outcome.committable);
        state.apply(&outcome.diff);

        let outcome = runner
            .run_call_string(ledger.as_mut(), &state, r#"balance("alice")"#)
            .unwrap();
        assert_eq!(outcome.return_value, Some(Value::Integer(100)));
        assert!(outcome.diff.is_empty());
    }

    #[test]
    fn test_version_is_package_version() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_determinism_100_iterations() {
        let mut state = PersistedState::new();
        state.insert("balance:alice", &Value::Integer(500));
        let runner = Runner::default();
        let origin = CallOrigin::new("alice", Amount::zero());
        let call = r#"transfer("bob", 125)"#;

        let mut ledger = contracts::Ledger;
        let first = runner
            .run_call_string_as(&mut ledger, &state, &origin, call)
            .unwrap();
        for i in 0..100 {
            let result = runner
                .run_call_string_as(&mut ledger, &state, &origin, call)
                .unwrap();
            assert_eq!(first.diff_digest, result.diff_digest, "Non-determinism at iteration {}", i);
            assert_eq!(first.trace, result.trace, "Non-determinism at iteration {}", i);
        }
    }
}
