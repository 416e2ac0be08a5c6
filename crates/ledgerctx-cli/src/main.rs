use anyhow::{anyhow, Context as _};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

use ledgerctx_core::{
    contracts, Amount, CallOrigin, Contract, PersistedState, RunMode, RunOutcome, Runner,
    RunnerConfig,
};

/// ledgerctx: run sandboxed state contracts against a state file
///
/// Invoke built-in contracts, inspect the diff and trace they produce,
/// and optionally commit the diff back into the state file.
#[derive(Parser)]
#[command(name = "ledgerctx", version, about, long_about = None)]
struct Cli {
    /// Log debug events to stderr (overrides RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a contract method and report the outcome
    Run {
        #[command(flatten)]
        invoke: InvokeArgs,
        /// Apply a committable diff back into the state file
        #[arg(long, requires = "state")]
        write_state: bool,
    },

    /// Dry run: execute and report, never commit
    Analyze {
        #[command(flatten)]
        invoke: InvokeArgs,
    },

    /// List the entry points a contract exposes
    Methods {
        /// Built-in contract name
        contract: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show version information
    Version,
}

#[derive(Args)]
struct InvokeArgs {
    /// Built-in contract name
    contract: String,
    /// Call string, e.g. 'transfer("bob", 5)'; empty selects the default entry
    #[arg(long, default_value = "")]
    call: String,
    /// Caller address the call runs on behalf of
    #[arg(long, default_value = "")]
    from: String,
    /// Amount attached to the call
    #[arg(long, default_value = "0")]
    value: String,
    /// JSON object file holding persisted state
    #[arg(long)]
    state: Option<PathBuf>,
    /// Output as JSON
    #[arg(long)]
    json: bool,
    /// Fail when a read-only method writes state
    #[arg(long)]
    enforce_read_only: bool,
    /// Maximum number of trace records a run may issue
    #[arg(long)]
    max_trace_records: Option<usize>,
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run { invoke, write_state } => cmd_invoke(invoke, RunMode::Call, write_state),
        Commands::Analyze { invoke } => cmd_invoke(invoke, RunMode::Analyze, false),
        Commands::Methods { contract, json } => cmd_methods(&contract, json),
        Commands::Version => {
            println!(
                "ledgerctx {} (ledgerctx-core {})",
                env!("CARGO_PKG_VERSION"),
                ledgerctx_core::VERSION
            );
            Ok(0)
        }
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            2
        }
    };
    process::exit(exit_code);
}

fn setup_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .init();
}

// ── Commands ──────────────────────────────────────────────

/// Returns Ok(1) for a failed run; Err for usage and IO problems
fn cmd_invoke(args: InvokeArgs, mode: RunMode, write_state: bool) -> anyhow::Result<i32> {
    let mut contract = lookup_contract(&args.contract)?;
    let value: Amount = args
        .value
        .parse()
        .with_context(|| format!("invalid --value '{}'", args.value))?;
    let origin = CallOrigin::new(args.from.trim(), value);
    let mut state = match &args.state {
        Some(path) => load_state(path)?,
        None => PersistedState::new(),
    };

    let mut config = RunnerConfig::from_env()?.with_mode(mode);
    if args.enforce_read_only {
        config.enforce_read_only = true;
    }
    if let Some(limit) = args.max_trace_records {
        config.max_trace_records = limit;
    }

    let runner = Runner::new(config);
    let outcome = match runner.run_call_string_as(contract.as_mut(), &state, &origin, &args.call) {
        Ok(outcome) => outcome,
        Err(e) => {
            if args.json {
                let report = serde_json::json!({ "ok": false, "error": e.to_string() });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                eprintln!(
                    "{} {}::{} failed: {}",
                    "✗".red().bold(),
                    args.contract,
                    display_call(&args.call),
                    e
                );
            }
            return Ok(1);
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }

    if write_state && outcome.committable {
        if let Some(path) = &args.state {
            state.apply(&outcome.diff);
            save_state(path, &state)?;
            if !args.json {
                println!("{} wrote {} key(s) to {}", "✓".green(), outcome.diff.len(), path.display());
            }
        }
    }
    Ok(0)
}

fn cmd_methods(name: &str, json: bool) -> anyhow::Result<i32> {
    let contract = lookup_contract(name)?;
    let methods = contract.methods();
    if json {
        println!("{}", serde_json::to_string_pretty(&methods)?);
        return Ok(0);
    }

    println!("{}", contract.name().bold());
    for m in methods {
        let kind = if m.mutates { "write".yellow() } else { "read".cyan() };
        println!("  {:<12} {:<5}  arity {}", m.name, kind, m.arity);
    }
    Ok(0)
}

// ── Helpers ───────────────────────────────────────────────

fn lookup_contract(name: &str) -> anyhow::Result<Box<dyn Contract>> {
    contracts::lookup(name).ok_or_else(|| {
        anyhow!(
            "unknown contract '{}' (available: {})",
            name,
            contracts::BUILTIN.join(", ")
        )
    })
}

/// A missing file is an empty state
fn load_state(path: &Path) -> anyhow::Result<PersistedState> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "state file absent, starting empty");
        return Ok(PersistedState::new());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading state file {}", path.display()))?;
    PersistedState::from_json_document(&text)
        .with_context(|| format!("loading state file {}", path.display()))
}

fn save_state(path: &Path, state: &PersistedState) -> anyhow::Result<()> {
    let doc = state.to_json_document()?;
    let text = serde_json::to_string_pretty(&doc)?;
    std::fs::write(path, text + "\n")
        .with_context(|| format!("writing state file {}", path.display()))
}

fn display_call(call: &str) -> &str {
    if call.trim().is_empty() {
        ledgerctx_core::DEFAULT_ENTRY
    } else {
        call.trim()
    }
}

fn print_outcome(outcome: &RunOutcome) {
    let mode = match outcome.mode {
        RunMode::Call => "call",
        RunMode::Analyze => "analyze",
    };
    println!(
        "{} {}::{} ({})",
        "✓".green().bold(),
        outcome.contract,
        outcome.method,
        mode
    );
    if !outcome.from.is_empty() {
        println!("  from: {} (value {})", outcome.from, outcome.value);
    }
    if let Some(value) = &outcome.return_value {
        println!("  return: {}", value);
    }

    println!(
        "  diff: {} key(s), digest {}",
        outcome.diff.len(),
        &outcome.diff_digest[..12]
    );
    for (key, value) in outcome.diff.iter() {
        println!("    {} = {}", key.bold(), value);
    }

    println!("  trace: {} record(s)", outcome.trace.len());
    for record in &outcome.trace {
        println!("    {} {}", record.action.cyan(), record.parameters);
    }

    let committable = if outcome.committable {
        "yes".green()
    } else {
        "no".dimmed()
    };
    println!("  committable: {}", committable);
}
