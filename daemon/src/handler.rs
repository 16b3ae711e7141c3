//! HTTP handler

use crate::config::DaemonConfig;
use crate::gateway::Gateway;
use crate::metrics::METRICS;
use crate::rejection::{RejectionReason, accepted};
use anyhow::Result;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Method, Request, Response, server::conn::http1, service::service_fn};
use hyper_util::rt::TokioIo;
use smsgate_protocol::form;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tracing::{debug, info};

/// Query parameter carrying the request token
pub const DATA_PARAM: &str = "data";

/// Routing and response shaping for the command endpoint
#[derive(Debug, Clone)]
pub struct HandlerOptions {
    /// Path of the command endpoint
    pub route: String,

    /// Lower bound on response time
    pub min_response: Duration,
}

impl HandlerOptions {
    pub fn from_config(config: &DaemonConfig) -> Self {
        Self {
            route: config.server.route.clone(),
            min_response: Duration::from_millis(config.security.min_response_ms),
        }
    }
}

/// Run the gateway HTTP server
pub async fn run_handler(config: &DaemonConfig, gateway: Arc<Gateway>) -> Result<()> {
    let listener = TcpListener::bind(config.server.bind).await?;
    info!("Gateway listening on {}", listener.local_addr()?);

    let options = Arc::new(HandlerOptions::from_config(config));

    loop {
        let (stream, addr) = listener.accept().await?;
        debug!("New connection from {}", addr);

        let gateway = gateway.clone();
        let options = options.clone();

        tokio::spawn(async move {
            let io = TokioIo::new(stream);

            let service = service_fn(move |req| {
                let gateway = gateway.clone();
                let options = options.clone();
                async move { Ok::<_, Infallible>(handle_request(req, &options, &gateway).await) }
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                debug!("Connection error from {}: {}", addr, e);
            }
        });
    }
}

/// Handle one HTTP request. Every failure renders as the same 404.
pub async fn handle_request<B>(
    req: Request<B>,
    options: &HandlerOptions,
    gateway: &Gateway,
) -> Response<Full<Bytes>> {
    let start = Instant::now();
    let timer = METRICS.request_duration.start_timer();

    let (parts, _) = req.into_parts();

    let result = async {
        let path = parts.uri.path();
        if path != options.route {
            return Err(RejectionReason::UnknownRoute(path.to_string()));
        }
        if parts.method != Method::GET {
            return Err(RejectionReason::MethodNotAllowed(parts.method.to_string()));
        }

        let data = extract_data(parts.uri.query())?;
        gateway.submit(&data).await
    }
    .await;

    // Hold the response until the floor has passed
    let elapsed = start.elapsed();
    if elapsed < options.min_response {
        tokio::time::sleep(options.min_response - elapsed).await;
    }
    timer.observe_duration();

    match result {
        Ok(_) => accepted(),
        Err(reason) => reason.into_response(),
    }
}

/// First non-empty `data` value of the query string
fn extract_data(query: Option<&str>) -> Result<Vec<u8>, RejectionReason> {
    let pairs = form::parse_lenient(query.unwrap_or_default().as_bytes());
    match form::first(&pairs, DATA_PARAM) {
        Some(data) if !data.is_empty() => Ok(data.to_vec()),
        _ => Err(RejectionReason::MissingData),
    }
}
