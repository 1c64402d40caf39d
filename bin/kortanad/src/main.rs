//! Kortana chain-index daemon (kortanad)
//!
//! Indexes committed blocks and serves address history and block filters over
//! JSON-RPC.
//!
//! ```text
//! ┌──────────────┐  JSON lines  ┌─────────────────────────────┐
//! │  Execution   │─────────────►│          kortanad           │
//! │  engine      │    stdin     │                             │
//! └──────────────┘              │  ┌─────────┐  ┌──────────┐  │
//!                               │  │ Indexer │  │ Filters  │  │
//!        ┌──────────┐ JSON-RPC  │  └─────────┘  └──────────┘  │
//!        │  Client  │◄─────────►│  ┌─────────┐  ┌──────────┐  │
//!        └──────────┘           │  │   RPC   │  │  SQLite  │  │
//!                               │  └─────────┘  └──────────┘  │
//!                               └─────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Write a default config file
//! kortanad init --config ./kortana.yaml
//!
//! # Index blocks from an engine and serve JSON-RPC
//! engine-export | kortanad run --config ./kortana.yaml --rpc-addr 0.0.0.0:8545
//! ```

use clap::{Parser, Subcommand};
use kortana_node::{init_node, init_tracing, resolve_node_config, run_node, InitArgs, RunArgs};

#[derive(Parser)]
#[command(name = "kortanad")]
#[command(about = "Kortana chain-index daemon")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index blocks from stdin and serve JSON-RPC
    Run(RunArgs),
    /// Write the default configuration file
    Init(InitArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            let config = match resolve_node_config(&args.common, &args.native) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("{e}");
                    std::process::exit(2);
                }
            };
            init_tracing(&config.observability.log_level);
            if let Err(e) = run_node(config).await {
                tracing::error!(error = %e, "node stopped");
                std::process::exit(1);
            }
        }
        Commands::Init(args) => {
            init_tracing(args.common.log_level.as_deref().unwrap_or("info"));
            if let Err(e) = init_node(&args.common, args.force) {
                tracing::error!(error = %e, "init failed");
                std::process::exit(1);
            }
        }
    }
}
