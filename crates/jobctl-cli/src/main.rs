//! `jobctl`: CLI surface for the durable job-dispatch engine (§6.3). A thin
//! boundary over `jobctl-core`/`jobctl-sqlite` — all dispatch semantics live
//! there; this binary only parses arguments, opens the store, renders
//! output, and maps errors to exit codes.

mod commands;
mod configfile;
mod env;
mod error;
mod render;

use std::io::Read;

use clap::{Parser, Subcommand};

use error::CliError;

#[derive(Parser)]
#[command(name = "jobctl", version, about = "A durable, single-node background job queue")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database file and seed config defaults from jobctl.toml
    Init,

    /// Enqueue one job or several. Reads JSON from --file, or stdin if omitted.
    Enqueue {
        #[arg(long)]
        file: Option<std::path::PathBuf>,
    },

    /// List jobs
    List {
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        pending_ready_only: bool,
        #[arg(long)]
        json: bool,
    },

    /// Aggregate job counts by state
    Status {
        #[arg(long)]
        json: bool,
    },

    /// Show a job's captured output and last error
    Logs { id: String },

    /// Manage the Worker process pool
    Worker {
        #[command(subcommand)]
        command: WorkerCommands,
    },

    /// Dead-letter queue operations
    Dlq {
        #[command(subcommand)]
        command: DlqCommands,
    },

    /// Read or write a config tunable
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Worker process entry point; spawned by `worker start`, not meant to
    /// be invoked directly.
    #[command(hide = true)]
    WorkerRun {
        #[arg(long)]
        db: std::path::PathBuf,
        #[arg(long)]
        worker_nonce: u64,
    },
}

#[derive(Subcommand)]
enum WorkerCommands {
    /// Spawn N Worker processes
    Start {
        #[arg(long, default_value_t = 1)]
        count: u32,
    },
    /// Signal all Worker processes to drain and exit
    Stop,
}

#[derive(Subcommand)]
enum DlqCommands {
    List {
        #[arg(long)]
        json: bool,
    },
    Retry {
        id: String,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    Get { key: Option<String> },
    Set { key: String, value: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    if let Err(e) = dispatch(cli).await {
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }
}

async fn dispatch(cli: Cli) -> Result<(), CliError> {
    let db_path = env::db_path();

    match cli.command {
        Commands::Init => commands::init::run(&db_path).await,
        Commands::Enqueue { file } => {
            let raw = match file {
                Some(path) => {
                    std::fs::read_to_string(&path).map_err(|e| CliError::Other(anyhow::anyhow!(e)))?
                }
                None => {
                    let mut raw = String::new();
                    std::io::stdin()
                        .read_to_string(&mut raw)
                        .map_err(|e| CliError::Other(anyhow::anyhow!(e)))?;
                    raw
                }
            };
            commands::enqueue::run(&db_path, &raw).await
        }
        Commands::List {
            state,
            pending_ready_only,
            json,
        } => commands::list::run(&db_path, state, pending_ready_only, json).await,
        Commands::Status { json } => commands::status::run(&db_path, json).await,
        Commands::Logs { id } => commands::logs::run(&db_path, &id).await,
        Commands::Worker { command } => match command {
            WorkerCommands::Start { count } => commands::worker::start(&db_path, count).await,
            WorkerCommands::Stop => commands::worker::stop(&db_path).await,
        },
        Commands::Dlq { command } => match command {
            DlqCommands::List { json } => commands::dlq::list(&db_path, json).await,
            DlqCommands::Retry { id } => commands::dlq::retry(&db_path, &id).await,
        },
        Commands::Config { command } => match command {
            ConfigCommands::Get { key } => commands::config::get(&db_path, key).await,
            ConfigCommands::Set { key, value } => {
                commands::config::set(&db_path, &key, &value).await
            }
        },
        Commands::WorkerRun { db, worker_nonce } => {
            commands::worker_run::run(&db, worker_nonce).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_list_with_flags() {
        let cli = Cli::parse_from(["jobctl", "list", "--state", "pending", "--json"]);
        match cli.command {
            Commands::List { state, json, .. } => {
                assert_eq!(state.as_deref(), Some("pending"));
                assert!(json);
            }
            _ => panic!("expected List"),
        }
    }

    #[test]
    fn worker_run_is_hidden_but_parseable() {
        let cli = Cli::parse_from(["jobctl", "worker-run", "--db", "x.db", "--worker-nonce", "7"]);
        assert!(matches!(cli.command, Commands::WorkerRun { .. }));
    }
}
