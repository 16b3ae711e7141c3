//! Command pipeline
//!
//! decode -> parse -> validate -> freshness -> replay -> relay. The replay
//! cache records a payload only after every earlier check passed, and the
//! relay write happens after the cache lock is released.

use crate::metrics::METRICS;
use crate::rejection::RejectionReason;
use crate::relay::DownstreamChannel;
use smsgate_crypto::{PayloadDecoder, ReplayCache};
use smsgate_protocol::{Command, FieldValidator, check_freshness, validate_fields};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// Current wall-clock time in seconds since the Unix epoch
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Validates request tokens and relays the commands they carry
pub struct Gateway {
    decoder: PayloadDecoder,
    validator: Arc<dyn FieldValidator>,
    replay: ReplayCache,
    channel: Arc<dyn DownstreamChannel>,
}

impl Gateway {
    pub fn new(
        decoder: PayloadDecoder,
        validator: Arc<dyn FieldValidator>,
        channel: Arc<dyn DownstreamChannel>,
    ) -> Self {
        Self {
            decoder,
            validator,
            replay: ReplayCache::new(),
            channel,
        }
    }

    /// Process a token against the current wall clock
    pub async fn submit(&self, data: &[u8]) -> Result<Command, RejectionReason> {
        self.process(data, unix_now()).await
    }

    /// Process a token as of `now`
    pub async fn process(&self, data: &[u8], now: i64) -> Result<Command, RejectionReason> {
        if data.is_empty() {
            return Err(RejectionReason::MissingData);
        }

        let payload = self.decoder.decode(data)?;
        let command = Command::parse(&payload)?;
        validate_fields(self.validator.as_ref(), &command)?;
        check_freshness(command.expires_at, now)?;

        self.replay
            .check_and_insert(&payload, command.expires_at, now)?;
        METRICS.replay_cache_entries.set(self.replay.len() as i64);
        debug!("Recorded payload valid until {}", command.expires_at);

        let frame = command.relay_frame();
        self.channel.write_frame(&frame).await?;
        METRICS.frames_relayed.inc();

        info!(
            destination = %command.destination,
            channel = self.channel.name(),
            "Relayed {} byte frame",
            frame.len()
        );
        METRICS.commands_accepted.inc();

        Ok(command)
    }
}
