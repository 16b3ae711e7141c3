//! Downstream SMS device channels
//!
//! Writes `RelayFrame`s to the serial-attached modem. One writer at a time;
//! the blocking write runs on tokio's blocking pool.

use crate::config::RelayConfig;
use async_trait::async_trait;
use parking_lot::Mutex;
use smsgate_protocol::RelayFrame;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Failed to open serial device {device}: {source}")]
    Open {
        device: String,
        source: serialport::Error,
    },

    #[error("Write to {device} failed: {source}")]
    Write {
        device: String,
        source: std::io::Error,
    },

    #[error("Relay task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Sink for accepted command frames
#[async_trait]
pub trait DownstreamChannel: Send + Sync {
    /// Write one complete frame
    async fn write_frame(&self, frame: &RelayFrame) -> Result<(), RelayError>;

    /// Human-readable name for logs
    fn name(&self) -> &str;
}

/// No device configured: frames are dropped, writes succeed
#[derive(Debug, Default)]
pub struct NullChannel;

#[async_trait]
impl DownstreamChannel for NullChannel {
    async fn write_frame(&self, frame: &RelayFrame) -> Result<(), RelayError> {
        debug!("No relay device, dropping {} byte frame", frame.len());
        Ok(())
    }

    fn name(&self) -> &str {
        "none"
    }
}

/// Exclusive byte-stream device (serial port or any blocking writer)
pub struct DeviceChannel {
    name: String,
    device: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl DeviceChannel {
    /// Open a serial device, 8N1 at `baud_rate`
    pub fn open_serial(path: &str, baud_rate: u32, timeout: Duration) -> Result<Self, RelayError> {
        let port = serialport::new(path, baud_rate)
            .timeout(timeout)
            .open()
            .map_err(|source| RelayError::Open {
                device: path.to_string(),
                source,
            })?;

        Ok(Self::from_writer(path, port))
    }

    pub fn from_writer(name: impl Into<String>, writer: impl Write + Send + 'static) -> Self {
        Self {
            name: name.into(),
            device: Arc::new(Mutex::new(Box::new(writer))),
        }
    }
}

#[async_trait]
impl DownstreamChannel for DeviceChannel {
    async fn write_frame(&self, frame: &RelayFrame) -> Result<(), RelayError> {
        let device = self.device.clone();
        let bytes = frame.clone().into_bytes();

        tokio::task::spawn_blocking(move || {
            let mut device = device.lock();
            device.write_all(&bytes)?;
            device.flush()
        })
        .await?
        .map_err(|source| RelayError::Write {
            device: self.name.clone(),
            source,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Build the channel described by `config`
pub fn open_channel(config: &RelayConfig) -> Result<Arc<dyn DownstreamChannel>, RelayError> {
    match config.device.as_deref().filter(|d| !d.is_empty()) {
        Some(device) => {
            let channel = DeviceChannel::open_serial(
                device,
                config.baud_rate,
                Duration::from_millis(config.write_timeout_ms),
            )?;
            info!("Relaying to {} at {} baud", device, config.baud_rate);
            Ok(Arc::new(channel))
        }
        None => {
            warn!("No relay device configured, accepted commands will not be sent");
            Ok(Arc::new(NullChannel))
        }
    }
}
