//! Inbound gateway events, decoded from a [`WireEnvelope`] by opcode.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::envelope::WireEnvelope;
use super::opcode;
use crate::codec::JsonCodec;
use crate::error::{KanteleError, Result};

/// Hello payload.
///
/// Ref: https://discord.com/developers/docs/topics/gateway-events#hello
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hello {
    /// Heartbeat period in milliseconds.
    pub heartbeat_interval: u64,
}

impl Hello {
    #[inline]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval)
    }
}

/// A frame the gateway sent us, keyed by opcode.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayEvent {
    /// Opcode 10.
    Hello(Hello),
    /// Opcode 11.
    HeartbeatAck,
    /// Opcode 0. `data` is opaque until a handler asks for a type.
    Dispatch { name: String, data: Value },
    /// Any opcode this client does not handle; logged and dropped.
    Unhandled(WireEnvelope),
}

impl GatewayEvent {
    /// Second decode stage: interpret `d` according to `op`.
    ///
    /// A Hello without a usable `heartbeat_interval` is a protocol error.
    /// A dispatch without `t` gets an empty event name, without `d` gets
    /// `null` data.
    pub fn from_envelope(envelope: WireEnvelope) -> Result<Self> {
        match envelope.opcode {
            opcode::HELLO => {
                let data = envelope
                    .data
                    .ok_or_else(|| KanteleError::Protocol("Hello without data".to_string()))?;
                let hello: Hello = JsonCodec::from_value(data)
                    .map_err(|e| KanteleError::Protocol(format!("invalid Hello: {}", e)))?;
                if hello.heartbeat_interval == 0 {
                    return Err(KanteleError::Protocol(
                        "Hello with zero heartbeat_interval".to_string(),
                    ));
                }
                Ok(Self::Hello(hello))
            }
            opcode::HEARTBEAT_ACK => Ok(Self::HeartbeatAck),
            opcode::DISPATCH => Ok(Self::Dispatch {
                name: envelope.event_name.unwrap_or_default(),
                data: envelope.data.unwrap_or(Value::Null),
            }),
            _ => Ok(Self::Unhandled(envelope)),
        }
    }
}
