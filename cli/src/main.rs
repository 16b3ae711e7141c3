//! smsgate CLI
//!
//! Builds request tokens for the gateway and optionally submits them.

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use reqwest::Client;
use smsgate_crypto::seal;
use smsgate_protocol::Command;
use std::time::{SystemTime, UNIX_EPOCH};
use url::{Url, form_urlencoded::byte_serialize};

#[derive(Parser, Debug)]
#[command(name = "smsgate")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the URL-encoded `data` token for a command
    Seal(TokenArgs),
    /// Build a token and submit it to a gateway
    Send {
        /// Gateway endpoint (e.g., http://127.0.0.1:8080/send)
        #[arg(long)]
        gateway: Url,

        #[command(flatten)]
        token: TokenArgs,
    },
}

#[derive(ClapArgs, Debug)]
struct TokenArgs {
    /// Shared AES key; omit to send plaintext to an insecure gateway
    #[arg(short, long, env = "SMSGATE_KEY", hide_env_values = true)]
    key: Option<String>,

    /// Destination phone number
    #[arg(short, long)]
    number: String,

    /// Message text
    #[arg(short, long)]
    message: String,

    /// Seconds until the command expires
    #[arg(long, default_value = "60")]
    ttl: i64,
}

impl TokenArgs {
    fn command(&self) -> Command {
        Command::new(unix_now() + self.ttl, &self.number, &self.message)
    }

    /// Raw (not yet URL-encoded) token bytes
    fn token(&self) -> Result<Vec<u8>> {
        build_token(self.key.as_deref(), &self.command())
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn build_token(key: Option<&str>, command: &Command) -> Result<Vec<u8>> {
    let payload = command.to_payload();
    match key.filter(|k| !k.is_empty()) {
        Some(key) => seal(key.as_bytes(), payload.as_bytes()).context("Failed to seal command"),
        None => Ok(payload.into_bytes()),
    }
}

fn encode_token(token: &[u8]) -> String {
    byte_serialize(token).collect()
}

/// Set the token as the `data` query parameter. The token is binary
/// when sealed, so it is percent-encoded byte for byte.
fn request_url(gateway: &Url, token: &[u8]) -> Url {
    let mut url = gateway.clone();
    url.set_query(Some(&format!("data={}", encode_token(token))));
    url
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Commands::Seal(token) => {
            println!("{}", encode_token(&token.token()?));
        }
        Commands::Send { gateway, token } => {
            let url = request_url(&gateway, &token.token()?);
            let resp = Client::new().get(url).send().await?;

            if resp.status().is_success() {
                println!("Command accepted");
            } else {
                eprintln!("Error: {}", resp.status());
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
