//! Codec module - JSON encoding/decoding for gateway frames and payloads.
//!
//! The gateway speaks JSON text frames (`encoding=json`). All frame and
//! payload conversions go through [`JsonCodec`] so error mapping stays in
//! one place.
//!
//! # Example
//!
//! ```
//! use kantele::codec::JsonCodec;
//!
//! let encoded = JsonCodec::encode(&serde_json::json!({ "op": 1, "d": 0 })).unwrap();
//! let decoded: serde_json::Value = JsonCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded["op"], 1);
//! ```

mod json;

pub use json::JsonCodec;
