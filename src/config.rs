//! Gateway configuration.
//!
//! [`GatewayConfig::default`] matches what the Discord gateway expects from
//! a plain bot. [`GatewayConfig::from_env`] overlays a few `KANTELE_*`
//! environment variables on top of the defaults.
//!
//! Logging goes through `tracing`; install a subscriber in the application
//! to see it.

use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;

use crate::error::{KanteleError, Result};
use crate::intents::Intents;
use crate::protocol::{ConnectionProperties, Identify};
use crate::writer::WriterConfig;

/// Gateway URL with API version and encoding.
pub const DEFAULT_GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=10&encoding=json";

/// Member count above which the gateway stops sending offline members.
///
/// Ref: https://discord.com/developers/docs/topics/gateway-events#identify-identify-structure
pub const DEFAULT_LARGE_THRESHOLD: u32 = 50;

/// Library name reported as browser and device.
pub const LIBRARY_NAME: &str = "kantele";

/// Full gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Gateway URL. Defaults to [`DEFAULT_GATEWAY_URL`].
    pub url: String,
    /// Defaults to [`DEFAULT_LARGE_THRESHOLD`].
    pub large_threshold: u32,
    /// Defaults to [`Intents::NONE`].
    pub intents: Intents,
    /// Whether this connection supports packet compression. Defaults to false.
    pub compress: bool,
    /// Reported on Identify. Defaults to the host OS and "kantele".
    pub properties: ConnectionProperties,
    /// `[shard_id, num_shards]`, omitted from Identify when `None`.
    pub shard: Option<[u32; 2]>,
    /// WebSocket transport settings (frame and message size limits, etc.).
    pub websocket: Option<WebSocketConfig>,
    /// Outbound frame queue.
    pub writer: WriterConfig,
    /// Upper bound on concurrently running dispatch tasks. `None` is
    /// unbounded. When the bound is reached, the read loop waits for a slot.
    pub max_concurrent_dispatches: Option<usize>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_GATEWAY_URL.to_string(),
            large_threshold: DEFAULT_LARGE_THRESHOLD,
            intents: Intents::DEFAULT,
            compress: false,
            properties: ConnectionProperties {
                os: std::env::consts::OS.to_string(),
                browser: LIBRARY_NAME.to_string(),
                device: LIBRARY_NAME.to_string(),
            },
            shard: None,
            websocket: None,
            writer: WriterConfig::default(),
            max_concurrent_dispatches: None,
        }
    }
}

impl GatewayConfig {
    /// Defaults overlaid with environment variables:
    ///
    /// - `KANTELE_GATEWAY_URL`
    /// - `KANTELE_INTENTS` (decimal bitmask)
    /// - `KANTELE_LARGE_THRESHOLD`
    /// - `KANTELE_COMPRESS` (`true`/`false`/`1`/`0`)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("KANTELE_GATEWAY_URL") {
            config.url = url;
        }
        if let Some(intents) = lookup("KANTELE_INTENTS") {
            config.intents = intents.parse()?;
        }
        if let Some(threshold) = lookup("KANTELE_LARGE_THRESHOLD") {
            config.large_threshold = threshold.trim().parse().map_err(|e| {
                KanteleError::Config(format!(
                    "invalid KANTELE_LARGE_THRESHOLD {:?}: {}",
                    threshold, e
                ))
            })?;
        }
        if let Some(compress) = lookup("KANTELE_COMPRESS") {
            config.compress = parse_bool(&compress)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check values the gateway would reject.
    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("wss://") || self.url.starts_with("ws://")) {
            return Err(KanteleError::Config(format!(
                "gateway url must be ws:// or wss://, got {:?}",
                self.url
            )));
        }
        // Discord accepts 50..=250.
        if !(50..=250).contains(&self.large_threshold) {
            return Err(KanteleError::Config(format!(
                "large_threshold must be between 50 and 250, got {}",
                self.large_threshold
            )));
        }
        if let Some([id, count]) = self.shard {
            if id >= count {
                return Err(KanteleError::Config(format!(
                    "shard id {} out of range for {} shards",
                    id, count
                )));
            }
        }
        if self.max_concurrent_dispatches == Some(0) {
            return Err(KanteleError::Config(
                "max_concurrent_dispatches must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the Identify payload for `token`.
    pub fn identify(&self, token: &str) -> Identify {
        Identify {
            token: token.to_string(),
            properties: self.properties.clone(),
            compress: self.compress,
            large_threshold: self.large_threshold,
            shard: self.shard,
            intents: self.intents,
        }
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(KanteleError::Config(format!(
            "invalid boolean {:?}",
            other
        ))),
    }
}
