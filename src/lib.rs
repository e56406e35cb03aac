//! # kantele
//!
//! Client for the Discord real-time gateway, with a thin REST helper.
//!
//! ## Architecture
//!
//! - **Gateway** (WebSocket): Hello → Identify handshake, periodic
//!   heartbeats, dispatch events routed to handlers registered by name
//! - **REST** (HTTPS): authenticated JSON requests against the versioned API
//!
//! ## Example
//!
//! ```ignore
//! use kantele::{Gateway, Intents, RestClient};
//!
//! #[tokio::main]
//! async fn main() -> kantele::Result<()> {
//!     let token = std::env::var("BOT_TOKEN").unwrap();
//!     let rest = RestClient::new(&token);
//!
//!     let gateway = Gateway::builder(&token)
//!         .intents(Intents::GUILD_MESSAGES | Intents::MESSAGE_CONTENT)
//!         .on("READY", move |_: serde_json::Value, _ctx| {
//!             let rest = rest.clone();
//!             async move {
//!                 let me = rest.get("/users/@me").await?.text().await?;
//!                 println!("{}", me);
//!                 Ok(())
//!             }
//!         })
//!         .build()?;
//!
//!     gateway.open().await?;
//!     gateway.wait_for_shutdown().await
//! }
//! ```
//!
//! Not implemented: reconnect, resume, missed heartbeat-ack detection,
//! REST rate limiting, multi-shard management.

pub mod codec;
pub mod config;
pub mod error;
pub mod handler;
pub mod intents;
pub mod protocol;
pub mod rest;

mod client;
mod heartbeat;
mod session;
mod writer;

pub use client::{Gateway, GatewayBuilder};
pub use config::GatewayConfig;
pub use error::{KanteleError, Result};
pub use handler::{EventContext, HandlerId};
pub use intents::Intents;
pub use rest::RestClient;
pub use session::ConnectionState;
pub use writer::WriterConfig;
