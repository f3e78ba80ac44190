use clap::{Parser, Subcommand};
use std::path::PathBuf;

use meshbridge_core::{ErrorCode, MeshError, Result};
use meshbridge_runtime::init_logging;

mod keys;
mod run;

/// meshbridge: embed a mesh network node and reach it over SOCKS5 or relays
#[derive(Parser, Debug)]
#[command(name = "meshbridge", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the node config file (JSON or TOML). Falls back to $MESHBRIDGE_CONFIG
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log filter (e.g. debug, info, meshbridge_proxy=trace)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all log output (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a new private key and print it as hex
    Genkey {
        /// Also print the public key and mesh address
        #[arg(long)]
        show_address: bool,
    },
    /// Print a default config with a fresh private key
    Genconf {
        /// Peer URI to include (repeatable)
        #[arg(short, long)]
        peer: Vec<String>,
    },
    /// Print the mesh address derived from the config's private key
    Address {
        /// Print address, subnet and public key as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start a node and serve until Ctrl-C
    Run {
        /// Start the SOCKS5 proxy
        #[arg(long)]
        socks: bool,
        /// Open a single-use relay to host:port (repeatable)
        #[arg(short, long)]
        relay: Vec<String>,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        // Resolve log level: --verbose > --quiet > --log-level > RUST_LOG > info
        let log_level = if self.verbose {
            Some("debug")
        } else if self.quiet {
            Some("error")
        } else {
            self.log_level.as_deref()
        };
        match init_logging(log_level, self.json_logs) {
            Ok(()) | Err(MeshError::AlreadyInitialized) => {}
            Err(e) => return Err(e),
        }

        match self.command {
            Commands::Genkey { show_address } => keys::cmd_genkey(show_address),
            Commands::Genconf { peer } => keys::cmd_genconf(peer),
            Commands::Address { json } => keys::cmd_address(self.config.as_deref(), json),
            Commands::Run { socks, relay } => run::cmd_run(self.config.as_deref(), socks, relay).await,
        }
    }
}

/// Process exit status for an error: its stable error code.
pub fn exit_code(err: &MeshError) -> i32 {
    match err.code() {
        ErrorCode::Ok => 1,
        code => code.as_i32(),
    }
}
