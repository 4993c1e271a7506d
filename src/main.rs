//! MCP Relay
//!
//! Accepts EDF uploads and text questions, forwards them to the EDF processing
//! service and the inference service, and relays the answers back.
//!
//! ```text
//!   Client ──▶ /mcp/{eeg,visualize,features,summary,export,filter}
//!                  └─▶ stage file ─▶ EDF service :5000/<path> ─▶ JSON envelope | image stream
//!   Client ──▶ /mcp/query
//!                  └─▶ inference service :11434/api/generate ─▶ answer envelope
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::net::TcpListener;

use mcp_relay::config::{load_config, validate_config, RelayConfig};
use mcp_relay::lifecycle::Shutdown;
use mcp_relay::observability::{logging, metrics};
use mcp_relay::RelayServer;

#[derive(Parser)]
#[command(name = "mcp-relay", version)]
#[command(about = "HTTP relay for EDF processing and LLM queries", long_about = None)]
struct Args {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address.
    #[arg(long)]
    bind: Option<String>,

    /// Override services.edf_url.
    #[arg(long)]
    edf_url: Option<String>,

    /// Override services.inference_url.
    #[arg(long)]
    inference_url: Option<String>,

    /// Override timeouts.request_ms.
    #[arg(long)]
    request_timeout_ms: Option<u64>,
}

impl Args {
    fn apply(self, mut config: RelayConfig) -> RelayConfig {
        if let Some(bind) = self.bind {
            config.listener.bind_address = bind;
        }
        if let Some(url) = self.edf_url {
            config.services.edf_url = url;
        }
        if let Some(url) = self.inference_url {
            config.services.inference_url = url;
        }
        if let Some(ms) = self.request_timeout_ms {
            config.timeouts.request_ms = ms;
        }
        config
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => RelayConfig::default(),
    };
    let config = args.apply(config);

    if let Err(errors) = validate_config(&config) {
        for error in errors {
            eprintln!("Invalid configuration: {}", error);
        }
        return ExitCode::FAILURE;
    }

    logging::init_logging(&config.observability);
    tracing::info!("mcp-relay v{} starting", env!("CARGO_PKG_VERSION"));

    match run(config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Relay failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: RelayConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = RelayServer::new(config)?;

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    server.run(listener, shutdown.subscribe()).await?;
    Ok(())
}
