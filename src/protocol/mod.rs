//! Protocol module - gateway frame types.
//!
//! Inbound frames decode in two stages: [`WireEnvelope`] first (opcode,
//! sequence, event name, untyped data), then [`GatewayEvent`] by opcode.
//! Outbound frames are [`GatewayCommand`]s.

mod command;
mod envelope;
mod event;
pub mod opcode;

pub use command::{ConnectionProperties, GatewayCommand, Identify};
pub use envelope::WireEnvelope;
pub use event::{GatewayEvent, Hello};
