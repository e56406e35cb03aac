//! Outbound gateway commands.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use super::envelope::WireEnvelope;
use super::opcode;
use crate::codec::JsonCodec;
use crate::error::Result;
use crate::intents::Intents;

/// Connection properties reported on Identify.
///
/// Ref: https://discord.com/developers/docs/topics/gateway-events#identify-identify-connection-properties
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionProperties {
    pub os: String,
    pub browser: String,
    pub device: String,
}

/// Identify payload.
///
/// Ref: https://discord.com/developers/docs/topics/gateway-events#identify
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Identify {
    pub token: String,
    pub properties: ConnectionProperties,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub compress: bool,
    #[serde(skip_serializing_if = "is_zero")]
    pub large_threshold: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shard: Option<[u32; 2]>,
    pub intents: Intents,
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

impl fmt::Debug for Identify {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identify")
            .field("token", &"<redacted>")
            .field("properties", &self.properties)
            .field("compress", &self.compress)
            .field("large_threshold", &self.large_threshold)
            .field("shard", &self.shard)
            .field("intents", &self.intents)
            .finish()
    }
}

/// A frame this client sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCommand {
    /// Opcode 2.
    Identify(Identify),
    /// Opcode 1, carrying the last sequence number (0 if none seen).
    Heartbeat(u64),
}

impl GatewayCommand {
    pub fn opcode(&self) -> i64 {
        match self {
            Self::Identify(_) => opcode::IDENTIFY,
            Self::Heartbeat(_) => opcode::HEARTBEAT,
        }
    }

    pub fn to_envelope(&self) -> Result<WireEnvelope> {
        let data = match self {
            Self::Identify(identify) => JsonCodec::to_value(identify)?,
            Self::Heartbeat(sequence) => Value::from(*sequence),
        };
        Ok(WireEnvelope::new(self.opcode(), Some(data)))
    }

    /// Encode into a text frame.
    pub fn encode(&self) -> Result<String> {
        self.to_envelope()?.encode()
    }
}
