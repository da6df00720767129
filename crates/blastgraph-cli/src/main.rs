//! blastgraph command-line interface.
//!
//! Provides the `blastgraph` binary for working with a dependency graph
//! stored in SQLite: load JSON fixtures, register vulnerabilities, run
//! propagation and read back the blast radius. Uses the same impact crate
//! operations as the HTTP server.
//!
//! Results are printed to stdout (JSON, or Mermaid for `export`); logs go to
//! stderr, filtered by `RUST_LOG`.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use blastgraph_core::NodeKind;
use blastgraph_impact::query;
use blastgraph_impact::{
    create_vulnerability, load_fixture, GraphFixture, ImpactError, PropagationConfig, Propagator,
};
use blastgraph_storage::{GraphStore, RetryPolicy, RetryingStore, SqliteStore, StorageError};

/// Cross-layer vulnerability impact analysis.
#[derive(Parser)]
#[command(name = "blastgraph", about = "Cross-layer vulnerability impact analysis")]
struct Cli {
    /// Path to the graph database file.
    #[arg(short, long, global = true, default_value = "blastgraph.db")]
    db: String,

    /// Retries on a busy or locked database.
    #[arg(long, global = true, default_value_t = 3)]
    retry_attempts: u32,

    /// Backoff before the first retry, doubled each retry.
    #[arg(long, global = true, default_value_t = 300)]
    retry_backoff_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Load a JSON graph fixture.
    Load {
        /// Fixture file.
        fixture: PathBuf,
    },

    /// Register a vulnerability threatening a symbol and mark the symbol.
    Vulnerability {
        /// Identity of the threatened symbol.
        symbol: String,

        /// Vulnerability identity, e.g. a CVE id.
        #[arg(short, long)]
        identity: Option<String>,
    },

    /// Run impact propagation.
    Propagate {
        /// Seed from the vulnerability with this identity.
        #[arg(short, long)]
        identity: Option<String>,

        /// Propagate from the current marks without seeding.
        #[arg(long, conflicts_with = "identity")]
        from_current_marks: bool,

        /// Re-run the downstream stages until nothing new is marked.
        #[arg(long)]
        converge: bool,

        /// Wall-clock budget for the whole run.
        #[arg(long)]
        deadline_ms: Option<u64>,
    },

    /// List marked nodes of one kind, or the whole blast radius.
    Marked {
        /// Node kind, e.g. `component` or `Asset`.
        kind: Option<String>,
    },

    /// Print the graph as a Mermaid flowchart.
    Export {
        /// Write to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Clear every propagation mark.
    ResetMarks,

    /// Delete the whole graph, or the nodes of one ingestion domain.
    Reset {
        /// `call-graph`, `topology` or `assets`.
        #[arg(long)]
        domain: Option<String>,
    },
}

/// Why a command failed. Each maps to its own exit code.
#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Impact(#[from] ImpactError),

    #[error("{0}")]
    Usage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// 1 = invalid input or partial failure, 2 = not found,
    /// 3 = storage or I/O error, 4 = deadline exceeded.
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage(_) => 1,
            CliError::Io(_) => 3,
            CliError::Impact(err) => match err {
                ImpactError::Invalid { .. } | ImpactError::PartialFailure(_) => 1,
                ImpactError::NotFound { .. } => 2,
                ImpactError::Storage(_) | ImpactError::StageFailed { .. } => 3,
                ImpactError::DeadlineExceeded { .. } => 4,
            },
        }
    }
}

impl From<StorageError> for CliError {
    fn from(err: StorageError) -> Self {
        CliError::Impact(ImpactError::Storage(err))
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let policy = RetryPolicy {
        max_retries: cli.retry_attempts,
        initial_backoff_ms: cli.retry_backoff_ms,
        ..RetryPolicy::default()
    };

    let mut store = match SqliteStore::new(&cli.db) {
        Ok(s) => {
            tracing::debug!(db = %cli.db, retries = policy.max_retries, "database opened");
            RetryingStore::new(s, policy)
        }
        Err(e) => {
            eprintln!("Error: failed to open database '{}': {}", cli.db, e);
            process::exit(3);
        }
    };

    match execute(&mut store, cli.command) {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(e.exit_code());
        }
    }
}

/// Runs one subcommand against `store` and returns what to print.
fn execute<S: GraphStore>(store: &mut S, command: Commands) -> Result<String, CliError> {
    match command {
        Commands::Load { fixture } => {
            let text = std::fs::read_to_string(&fixture)?;
            let fixture = GraphFixture::from_json(&text)
                .map_err(|e| CliError::Usage(format!("invalid fixture {}: {e}", fixture.display())))?;
            to_json(&load_fixture(store, &fixture)?)
        }
        Commands::Vulnerability { symbol, identity } => {
            to_json(&create_vulnerability(store, identity.as_deref(), &symbol)?)
        }
        Commands::Propagate {
            identity,
            from_current_marks,
            converge,
            deadline_ms,
        } => {
            let config = PropagationConfig {
                converge,
                deadline_ms,
            };
            let mut propagator = Propagator::new(store, config);
            let report = if from_current_marks {
                propagator.propagate()?
            } else {
                propagator.run(identity.as_deref())?
            };
            to_json(&report)
        }
        Commands::Marked { kind: Some(kind) } => {
            let kind: NodeKind = kind
                .parse()
                .map_err(|e: blastgraph_core::CoreError| CliError::Usage(e.to_string()))?;
            to_json(&query::marked(store, kind)?)
        }
        Commands::Marked { kind: None } => to_json(&query::blast_radius(store)?),
        Commands::Export { output } => {
            let mermaid = query::export_mermaid(store)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, &mermaid)?;
                    Ok(format!("wrote {}", path.display()))
                }
                None => Ok(mermaid),
            }
        }
        Commands::ResetMarks => to_json(&serde_json::json!({ "cleared": query::reset_marks(store)? })),
        Commands::Reset { domain: None } => {
            query::reset(store)?;
            to_json(&serde_json::json!({ "success": true }))
        }
        Commands::Reset { domain: Some(domain) } => {
            let domain: query::Domain = domain.parse()?;
            to_json(&query::reset_domain(store, domain)?)
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| CliError::Usage(format!("failed to serialize result: {e}")))
}
