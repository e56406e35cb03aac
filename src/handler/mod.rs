//! Handler module - event registration and dispatch.
//!
//! Provides:
//! - [`EventRegistry`] - maps event names to ordered handler lists
//! - [`EventContext`] - describes the dispatch a handler is running for

mod context;
mod registry;

pub use context::EventContext;
pub use registry::{BoxFuture, EventRegistry, Handler, HandlerId, HandlerResult, TypedHandler};
