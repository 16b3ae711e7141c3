//! Prometheus metrics

use crate::config::MonitoringConfig;
use bytes::Bytes;
use http_body_util::Full;
use hyper::Response;
use hyper::header::{CONTENT_TYPE, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TEXT_FORMAT, TextEncoder,
};
use std::convert::Infallible;
use std::sync::LazyLock;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Global metrics registry
static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// Global metrics instance
pub static METRICS: LazyLock<Metrics> = LazyLock::new(Metrics::new);

/// Metrics struct
pub struct Metrics {
    // Counters
    pub commands_accepted: IntCounter,
    pub commands_rejected: IntCounterVec,
    pub frames_relayed: IntCounter,

    // Gauges
    pub replay_cache_entries: IntGauge,

    // Histograms
    pub request_duration: Histogram,
}

impl Metrics {
    pub fn new() -> Self {
        let commands_accepted = IntCounter::with_opts(Opts::new(
            "smsgate_commands_accepted_total",
            "Total commands accepted",
        ))
        .unwrap();

        let commands_rejected = IntCounterVec::new(
            Opts::new(
                "smsgate_commands_rejected_total",
                "Total requests rejected, by reason",
            ),
            &["reason"],
        )
        .unwrap();

        let frames_relayed = IntCounter::with_opts(Opts::new(
            "smsgate_frames_relayed_total",
            "Total frames written to the relay device",
        ))
        .unwrap();

        let replay_cache_entries = IntGauge::with_opts(Opts::new(
            "smsgate_replay_cache_entries",
            "Live entries in the replay cache",
        ))
        .unwrap();

        let request_duration = Histogram::with_opts(HistogramOpts::new(
            "smsgate_request_duration_seconds",
            "Request duration in seconds",
        ))
        .unwrap();

        // Register metrics
        REGISTRY.register(Box::new(commands_accepted.clone())).ok();
        REGISTRY.register(Box::new(commands_rejected.clone())).ok();
        REGISTRY.register(Box::new(frames_relayed.clone())).ok();
        REGISTRY.register(Box::new(replay_cache_entries.clone())).ok();
        REGISTRY.register(Box::new(request_duration.clone())).ok();

        Self {
            commands_accepted,
            commands_rejected,
            frames_relayed,
            replay_cache_entries,
            request_duration,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Text exposition of every registered metric
pub fn encode_metrics() -> Vec<u8> {
    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer) {
        error!("Failed to encode metrics: {}", e);
    }
    buffer
}

/// Serve the text exposition on every path until aborted
pub fn start_server(config: &MonitoringConfig) -> JoinHandle<()> {
    let bind = config.prometheus_bind;
    let enabled = config.prometheus_enabled;

    tokio::spawn(async move {
        if !enabled {
            info!("Prometheus metrics disabled");
            return;
        }

        let listener = match TcpListener::bind(bind).await {
            Ok(l) => l,
            Err(e) => {
                error!("Failed to bind metrics server on {}: {}", bind, e);
                return;
            }
        };
        info!("Prometheus metrics server listening on {}", bind);

        loop {
            let stream = match listener.accept().await {
                Ok((stream, _)) => stream,
                Err(e) => {
                    error!("Metrics accept error: {}", e);
                    continue;
                }
            };

            tokio::spawn(async move {
                let service = service_fn(|_req| async {
                    let mut response = Response::new(Full::new(Bytes::from(encode_metrics())));
                    response
                        .headers_mut()
                        .insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_FORMAT));
                    Ok::<_, Infallible>(response)
                });

                if let Err(e) = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await
                {
                    debug!("Metrics connection error: {}", e);
                }
            });
        }
    })
}
