//! devgate
//!
//! A development-server front built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────┐
//!                      │                     DEVGATE                       │
//!    Client Request    │  ┌──────────┐   ┌────────────┐   ┌────────────┐  │
//!    ──────────────────┼─▶│  http    │──▶│   gate     │──▶│  upstream  │──┼──▶ Upstream
//!                      │  │  server  │   │ (UA check) │   │  or static │  │    dev server
//!                      │  └──────────┘   └─────┬──────┘   └────────────┘  │
//!                      │                       │ Chrome/Chromium 129       │
//!    ◀─────────────────┼───────────────────────┘ diagnostic page          │
//!                      │                                                   │
//!                      │  config (TOML + watcher)  observability  lifecycle│
//!                      └──────────────────────────────────────────────────┘
//! ```

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use devgate::config::{load_config, validate_config, ConfigError, ConfigWatcher, DevGateConfig};
use devgate::gate::{BrowserGate, GateDecision, UserAgentSignature};
use devgate::http::DevGateServer;
use devgate::lifecycle::Shutdown;
use devgate::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "devgate")]
#[command(about = "Development-server front with a browser-version gate", long_about = None)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the dev-server front (default)
    Serve {
        /// Override listener.bind_address
        #[arg(long)]
        bind: Option<String>,

        /// Override pipeline.upstream
        #[arg(long)]
        upstream: Option<String>,

        /// Override pipeline.static_root
        #[arg(long)]
        static_root: Option<PathBuf>,

        /// Reload gate settings when the config file changes
        #[arg(long)]
        watch: bool,
    },
    /// Show what the gate would do for a User-Agent string
    Check {
        user_agent: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => DevGateConfig::default(),
    };

    match cli.command {
        Some(Commands::Check { user_agent }) => {
            check(&config, &user_agent);
            Ok(())
        }
        Some(Commands::Serve {
            bind,
            upstream,
            static_root,
            watch,
        }) => serve(config, cli.config, bind, upstream, static_root, watch).await,
        None => serve(config, cli.config, None, None, None, false).await,
    }
}

fn check(config: &DevGateConfig, user_agent: &str) {
    let gate = BrowserGate::new(config.gate);
    let signature = UserAgentSignature::parse(user_agent);
    match signature {
        Some(sig) => println!("signature: {sig}"),
        None => println!("signature: none"),
    }
    match gate.decide(signature) {
        GateDecision::Forward => println!("decision: forward"),
        GateDecision::RespondWith(resp) => {
            println!("decision: respond ({}, {} bytes)", resp.status, resp.body.len())
        }
    }
}

async fn serve(
    mut config: DevGateConfig,
    config_path: Option<PathBuf>,
    bind: Option<String>,
    upstream: Option<String>,
    static_root: Option<PathBuf>,
    watch: bool,
) -> Result<(), Box<dyn Error>> {
    let file_config = config.clone();
    if let Some(bind) = bind {
        config.listener.bind_address = bind;
    }
    if let Some(upstream) = upstream {
        config.pipeline.upstream = Some(upstream);
    }
    if let Some(root) = static_root {
        config.pipeline.static_root = root;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init(&config.observability);

    tracing::info!("devgate v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        gate_enabled = config.gate.enabled,
        blocked_major = config.gate.blocked_major,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Keep the watcher alive for the lifetime of the server.
    let (_watcher, config_updates) = match (&config_path, watch) {
        (Some(path), true) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.starting_from(file_config).run()?), updates)
        }
        (None, true) => {
            tracing::warn!("--watch has no effect without --config");
            (None, mpsc::unbounded_channel().1)
        }
        _ => (None, mpsc::unbounded_channel().1),
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    let server = DevGateServer::new(config)?;
    server.run(listener, config_updates, shutdown.handle()).await?;

    tracing::info!(reason = ?shutdown.reason(), "Shutdown complete");
    Ok(())
}
