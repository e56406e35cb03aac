//! Gateway opcodes.
//!
//! Ref: https://discord.com/developers/docs/topics/opcodes-and-status-codes#gateway-gateway-opcodes

/// An event was dispatched (receive).
pub const DISPATCH: i64 = 0;
/// Keep-alive, periodic (send).
pub const HEARTBEAT: i64 = 1;
/// Starts a new session during the initial handshake (send).
pub const IDENTIFY: i64 = 2;
/// Sent immediately after connecting, carries the heartbeat interval (receive).
pub const HELLO: i64 = 10;
/// Acknowledges a received heartbeat (receive).
pub const HEARTBEAT_ACK: i64 = 11;
