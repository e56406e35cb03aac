//! JSON codec using `serde_json`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

/// JSON codec for frames and event payloads.
///
/// Marker struct with static methods, no state.
pub struct JsonCodec;

impl JsonCodec {
    /// Encode a value to a JSON string (one text frame).
    #[inline]
    pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String> {
        Ok(serde_json::to_string(value)?)
    }

    /// Decode a JSON string into a value.
    #[inline]
    pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T> {
        Ok(serde_json::from_str(text)?)
    }

    /// Convert an already-parsed payload into a typed value.
    ///
    /// Used for dispatch data whose shape is only known by the handler.
    #[inline]
    pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T> {
        Ok(serde_json::from_value(value)?)
    }

    /// Convert a typed value into a JSON tree.
    #[inline]
    pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
        Ok(serde_json::to_value(value)?)
    }
}
