//! Wire envelope shared by every gateway frame.
//!
//! ```text
//! { "op": <int>, "d": <any>, "s": <int, optional>, "t": <string, optional> }
//! ```
//!
//! Decoding stops at the envelope: `d` stays an untyped JSON tree until the
//! opcode (and, for dispatches, the event name) says what it is. See
//! [`GatewayEvent`](super::GatewayEvent) for the second stage.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec::JsonCodec;
use crate::error::{KanteleError, Result};

/// A single decoded gateway frame.
///
/// Ref: https://discord.com/developers/docs/topics/gateway-events#payload-structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireEnvelope {
    /// Opcode (always present).
    #[serde(rename = "op")]
    pub opcode: i64,
    /// Event data, shape depends on the opcode.
    #[serde(rename = "d", default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Sequence number, used for heartbeating.
    #[serde(rename = "s", default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u64>,
    /// Event name, only meaningful for dispatches.
    #[serde(rename = "t", default, skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
}

impl WireEnvelope {
    /// Create an envelope with only an opcode and data.
    pub fn new(opcode: i64, data: Option<Value>) -> Self {
        Self {
            opcode,
            data,
            sequence: None,
            event_name: None,
        }
    }

    /// Decode a text frame.
    ///
    /// A frame that is not JSON, or lacks `op`, is a decode error.
    pub fn decode(text: &str) -> Result<Self> {
        JsonCodec::decode(text).map_err(decode_error)
    }

    /// Encode into a text frame.
    pub fn encode(&self) -> Result<String> {
        JsonCodec::encode(self)
    }
}

fn decode_error(err: KanteleError) -> KanteleError {
    match err {
        KanteleError::Json(e) => KanteleError::Decode(e.to_string()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_hello() {
        let env = WireEnvelope::decode(r#"{"op":10,"d":{"heartbeat_interval":41250}}"#).unwrap();

        assert_eq!(env.opcode, 10);
        assert_eq!(env.data, Some(json!({ "heartbeat_interval": 41250 })));
        assert_eq!(env.sequence, None);
        assert_eq!(env.event_name, None);
    }

    #[test]
    fn test_decode_dispatch() {
        let env = WireEnvelope::decode(r#"{"op":0,"s":5,"t":"READY","d":{}}"#).unwrap();

        assert_eq!(env.opcode, 0);
        assert_eq!(env.sequence, Some(5));
        assert_eq!(env.event_name.as_deref(), Some("READY"));
        assert_eq!(env.data, Some(json!({})));
    }

    #[test]
    fn test_decode_nulls_are_absent() {
        let env = WireEnvelope::decode(r#"{"op":11,"d":null,"s":null,"t":null}"#).unwrap();

        assert_eq!(env.opcode, 11);
        assert!(env.data.is_none());
        assert!(env.sequence.is_none());
        assert!(env.event_name.is_none());
    }

    #[test]
    fn test_decode_missing_opcode() {
        let result = WireEnvelope::decode(r#"{"d":{},"s":1}"#);
        match result {
            Err(KanteleError::Decode(msg)) => assert!(msg.contains("op")),
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_not_json() {
        assert!(matches!(
            WireEnvelope::decode("hello"),
            Err(KanteleError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_out_of_range_opcodes() {
        let env = WireEnvelope::decode(r#"{"op":300,"d":null}"#).unwrap();
        assert_eq!(env.opcode, 300);

        let env = WireEnvelope::decode(r#"{"op":-1}"#).unwrap();
        assert_eq!(env.opcode, -1);
    }

    #[test]
    fn test_encode_omits_absent_fields() {
        let env = WireEnvelope::new(1, Some(json!(0)));
        assert_eq!(env.encode().unwrap(), r#"{"op":1,"d":0}"#);
    }
}
