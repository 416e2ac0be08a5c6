//! Runner configuration

use crate::{Error, Result};

/// Environment variable toggling read-only enforcement
pub const ENV_ENFORCE_READ_ONLY: &str = "LEDGERCTX_ENFORCE_READ_ONLY";
/// Environment variable bounding the execution trace length
pub const ENV_MAX_TRACE_RECORDS: &str = "LEDGERCTX_MAX_TRACE_RECORDS";

/// Whether a run's diff is meant to be committed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Execute and hand the diff to the host for commit
    #[default]
    Call,
    /// Dry run: execute and report, never commit
    Analyze,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    pub mode: RunMode,
    /// Fail runs where a method without the mutation flag wrote state
    pub enforce_read_only: bool,
    /// Maximum number of trace records a single run may issue
    pub max_trace_records: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::Call,
            enforce_read_only: false,
            max_trace_records: 1024,
        }
    }
}

impl RunnerConfig {
    /// Defaults overridden by `LEDGERCTX_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(raw) = lookup(ENV_ENFORCE_READ_ONLY) {
            config.enforce_read_only = parse_bool(ENV_ENFORCE_READ_ONLY, &raw)?;
        }
        if let Some(raw) = lookup(ENV_MAX_TRACE_RECORDS) {
            config.max_trace_records = raw.trim().parse().map_err(|_| {
                Error::ConfigError(format!(
                    "{} must be a non-negative integer, got '{}'",
                    ENV_MAX_TRACE_RECORDS, raw
                ))
            })?;
        }
        Ok(config)
    }

    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(Error::ConfigError(format!(
            "{} must be a boolean, got '{}'",
            name, raw
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RunnerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, RunnerConfig::default());
        assert_eq!(config.mode, RunMode::Call);
        assert!(!config.enforce_read_only);
    }

    #[test]
    fn test_overrides() {
        let config = RunnerConfig::from_lookup(lookup_from(&[
            (ENV_ENFORCE_READ_ONLY, "TRUE"),
            (ENV_MAX_TRACE_RECORDS, " 8 "),
        ]))
        .unwrap();
        assert!(config.enforce_read_only);
        assert_eq!(config.max_trace_records, 8);
    }

    #[test]
    fn test_malformed_values() {
        assert!(matches!(
            RunnerConfig::from_lookup(lookup_from(&[(ENV_ENFORCE_READ_ONLY, "maybe")])),
            Err(Error::ConfigError(_))
        ));
        assert!(matches!(
            RunnerConfig::from_lookup(lookup_from(&[(ENV_MAX_TRACE_RECORDS, "-1")])),
            Err(Error::ConfigError(_))
        ));
    }

    #[test]
    fn test_with_mode() {
        let config = RunnerConfig::default().with_mode(RunMode::Analyze);
        assert_eq!(config.mode, RunMode::Analyze);
    }
}
