//! smsgate Daemon
//!
//! Accepts encrypted, expiring, one-time SMS commands over HTTP and relays
//! them to a serial-attached modem.

mod config;
mod gateway;
mod handler;
mod logging;
mod metrics;
mod rejection;
mod relay;

#[cfg(test)]
mod config_tests;

use anyhow::Result;
use clap::Parser;
use smsgate_crypto::{PayloadDecoder, is_valid_key_length};
use smsgate_protocol::PermissiveValidator;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use config::DaemonConfig;
use gateway::Gateway;

/// smsgate Daemon - SMS command gateway
#[derive(Parser, Debug)]
#[command(name = "smsgated")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (default: ./smsgate.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Shared AES key (16, 24 or 32 bytes); omit for insecure mode
    #[arg(short, long, env = "SMSGATE_KEY", hide_env_values = true)]
    key: Option<String>,

    /// Serial device of the SMS modem
    #[arg(short, long)]
    device: Option<String>,

    /// Directory to write smsgate.log into
    #[arg(long)]
    log_path: Option<PathBuf>,

    /// Run in verbose mode
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Command-line values as a config layer
    fn overrides(&self) -> DaemonConfig {
        let mut config = DaemonConfig::default();
        if let Some(listen) = self.listen {
            config.server.bind = listen;
        }
        config.security.key = self.key.clone();
        config.relay.device = self.device.clone();
        config.logging.path = self.log_path.clone();
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = DaemonConfig::load_or_default(args.config.as_deref()).await?;
    config.merge(args.overrides());

    logging::init(args.verbose, &config.logging)?;

    info!("smsgate daemon v{}", env!("CARGO_PKG_VERSION"));

    let decoder = PayloadDecoder::from_key(config.security.key_bytes());
    match &decoder {
        PayloadDecoder::Insecure => {
            warn!("No key configured: accepting plaintext commands (insecure mode)")
        }
        PayloadDecoder::Aes { key } if !is_valid_key_length(key.len()) => warn!(
            "Key is {} bytes, expected 16, 24 or 32: every request will be rejected",
            key.len()
        ),
        PayloadDecoder::Aes { key } => info!("Decrypting requests with AES-{}", key.len() * 8),
    }

    let channel = relay::open_channel(&config.relay)?;
    let gateway = Arc::new(Gateway::new(decoder, Arc::new(PermissiveValidator), channel));

    // Start metrics server
    let metrics_handle = metrics::start_server(&config.monitoring);

    info!("Starting gateway on {}{}", config.server.bind, config.server.route);
    let result = handler::run_handler(&config, gateway).await;

    // Cleanup
    metrics_handle.abort();

    result
}
