//! Runner: drives one contract invocation from context to diff
//!
//! The runner is the host-side driver:
//!
//! 1. Create a fresh execution context over the host's value provider,
//!    stamped with the call's origin
//! 2. Bind the contract to it and invoke the selected entry point
//! 3. Derive the state diff from the context
//! 4. Apply host policies (read-only enforcement, trace limit)
//! 5. Package everything into a [`RunOutcome`]
//!
//! Any error aborts the run before an outcome exists, so a failed run
//! never yields a partial diff.

use std::time::Instant;

use crate::config::{RunMode, RunnerConfig};
use crate::context::{CallOrigin, ExecutionContext, TraceRecord};
use crate::diff::StateDiff;
use crate::dispatch::{CallEntry, Contract, ContractInstance};
use crate::provider::ValueProvider;
use crate::value::Value;
use crate::{Error, Result};

/// Everything a host needs after a successful run
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RunOutcome {
    pub contract: String,
    pub method: String,
    pub mode: RunMode,
    /// Caller address the run executed on behalf of; empty when anonymous
    pub from: String,
    /// Amount the caller attached to the call
    pub value: Value,
    /// Mutation flag of the invoked method
    pub mutating: bool,
    /// `true` when the host should persist `diff`
    pub committable: bool,
    pub return_value: Option<Value>,
    pub diff: StateDiff,
    pub diff_digest: String,
    pub trace: Vec<TraceRecord>,
    /// Times the context fell back to the value provider
    pub provider_reads: u64,
    pub elapsed_micros: u64,
}

/// Drives contract invocations under a [`RunnerConfig`]
#[derive(Debug, Clone, Default)]
pub struct Runner {
    config: RunnerConfig,
}

impl Runner {
    pub fn new(config: RunnerConfig) -> Self {
        Runner { config }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Parse `call` and run it anonymously
    pub fn run_call_string(
        &self,
        contract: &mut dyn Contract,
        provider: &dyn ValueProvider,
        call: &str,
    ) -> Result<RunOutcome> {
        self.run_call_string_as(contract, provider, &CallOrigin::anonymous(), call)
    }

    /// Parse `call` and run it on behalf of `origin`
    pub fn run_call_string_as(
        &self,
        contract: &mut dyn Contract,
        provider: &dyn ValueProvider,
        origin: &CallOrigin,
        call: &str,
    ) -> Result<RunOutcome> {
        let entry = CallEntry::parse(call)?;
        self.run_as(contract, provider, origin, &entry)
    }

    /// Run `entry` anonymously on `contract` in a fresh context over `provider`
    pub fn run(
        &self,
        contract: &mut dyn Contract,
        provider: &dyn ValueProvider,
        entry: &CallEntry,
    ) -> Result<RunOutcome> {
        self.run_as(contract, provider, &CallOrigin::anonymous(), entry)
    }

    /// Run `entry` on behalf of `origin`
    pub fn run_as(
        &self,
        contract: &mut dyn Contract,
        provider: &dyn ValueProvider,
        origin: &CallOrigin,
        entry: &CallEntry,
    ) -> Result<RunOutcome> {
        let span = tracing::info_span!(
            "run",
            contract = contract.name(),
            method = entry.method_name(),
            mode = ?self.config.mode,
            from = origin.from.as_str(),
        );
        let _guard = span.enter();

        tracing::info!(value = %origin.value, "starting contract run");
        self.execute(contract, provider, origin, entry)
            .inspect(|outcome| {
                tracing::info!(
                    dirty = outcome.diff.len(),
                    trace = outcome.trace.len(),
                    elapsed_micros = outcome.elapsed_micros,
                    "contract run finished"
                );
            })
            .inspect_err(|e| tracing::warn!(error = %e, "contract run aborted"))
    }

    fn execute(
        &self,
        contract: &mut dyn Contract,
        provider: &dyn ValueProvider,
        origin: &CallOrigin,
        entry: &CallEntry,
    ) -> Result<RunOutcome> {
        let start = Instant::now();

        let contract_name = contract.name().to_string();
        let ctx = ExecutionContext::with_origin(provider, origin.clone());
        let mut instance = ContractInstance::new(contract, ctx);
        let invocation = instance.invoke(entry)?;
        let ctx = instance.into_context();

        let diff = StateDiff::from_context(&ctx)?;
        tracing::debug!(keys = ?ctx.update_index_list(), "derived state diff");

        let descriptor = invocation.descriptor;
        if self.config.enforce_read_only && !descriptor.mutates && !diff.is_empty() {
            return Err(Error::ReadOnlyViolation {
                method: descriptor.name,
                keys: diff.keys().map(str::to_string).collect(),
            });
        }

        if ctx.line_data().len() > self.config.max_trace_records {
            return Err(Error::ResourceLimit(format!(
                "trace has {} records, limit is {}",
                ctx.line_data().len(),
                self.config.max_trace_records
            )));
        }

        let provider_reads = ctx.provider_reads();
        let (_, _, trace) = ctx.into_parts();
        let committable = self.config.mode == RunMode::Call && !diff.is_empty();

        Ok(RunOutcome {
            contract: contract_name,
            method: descriptor.name,
            mode: self.config.mode,
            from: origin.from.clone(),
            value: origin.value.to_value(),
            mutating: descriptor.mutates,
            committable,
            return_value: invocation.return_value,
            diff_digest: diff.digest(),
            diff,
            trace: trace.into_records(),
            provider_reads,
            elapsed_micros: start.elapsed().as_micros() as u64,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────
