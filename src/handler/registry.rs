//! Event registry mapping event names to ordered handler lists.
//!
//! Handlers for one name run in registration order. Registering the same
//! closure twice keeps both. The registry is owned by one gateway client
//! and outlives its individual connections.
//!
//! # Example
//!
//! ```
//! use kantele::handler::{EventContext, EventRegistry};
//!
//! let registry = EventRegistry::new();
//!
//! registry.register("READY", |data: serde_json::Value, ctx: EventContext| async move {
//!     println!("{} {}", ctx.event(), data);
//!     Ok(())
//! });
//!
//! assert_eq!(registry.handler_count("READY"), 1);
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::EventContext;
use crate::codec::JsonCodec;
use crate::error::{KanteleError, Result};

/// Result type for handler functions.
pub type HandlerResult = Result<()>;

/// Boxed future for handler results.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait for event handlers.
pub trait Handler: Send + Sync + 'static {
    /// Handle one dispatch with its untyped payload.
    fn call(&self, data: Value, ctx: EventContext) -> BoxFuture<'static, HandlerResult>;
}

/// Wrapper that deserializes the payload into `T` before calling the handler.
///
/// Use `T = serde_json::Value` to receive the payload untouched.
pub struct TypedHandler<F, T, Fut>
where
    F: Fn(T, EventContext) -> Fut + Send + Sync + 'static,
    T: DeserializeOwned + Send + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    handler: F,
    _phantom: PhantomData<fn(T) -> Fut>,
}

impl<F, T, Fut> TypedHandler<F, T, Fut>
where
    F: Fn(T, EventContext) -> Fut + Send + Sync + 'static,
    T: DeserializeOwned + Send + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

impl<F, T, Fut> Handler for TypedHandler<F, T, Fut>
where
    F: Fn(T, EventContext) -> Fut + Send + Sync + 'static,
    T: DeserializeOwned + Send + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, data: Value, ctx: EventContext) -> BoxFuture<'static, HandlerResult> {
        let parsed: T = match JsonCodec::from_value(data) {
            Ok(v) => v,
            Err(e) => return Box::pin(async move { Err(e) }),
        };

        Box::pin((self.handler)(parsed, ctx))
    }
}

/// Identifies one registration, for [`EventRegistry::unregister`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

struct HandlerEntry {
    id: HandlerId,
    handler: Arc<dyn Handler>,
}

/// Registry mapping event names to handlers.
///
/// Registration goes through `&self` so handlers can be added while a
/// connection is running. Dispatch works on a snapshot of the list, so a
/// registration made during a dispatch applies from the next occurrence.
pub struct EventRegistry {
    handlers: RwLock<HashMap<String, Vec<HandlerEntry>>>,
    next_id: AtomicU64,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Append a typed handler for `event`.
    pub fn register<F, T, Fut>(&self, event: &str, handler: F) -> HandlerId
    where
        F: Fn(T, EventContext) -> Fut + Send + Sync + 'static,
        T: DeserializeOwned + Send + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register_handler(event, Arc::new(TypedHandler::new(handler)))
    }

    /// Append an already-built handler for `event`.
    pub fn register_handler(&self, event: &str, handler: Arc<dyn Handler>) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .write()
            .entry(event.to_string())
            .or_default()
            .push(HandlerEntry { id, handler });
        id
    }

    /// Remove one registration. Returns false if `id` is unknown.
    pub fn unregister(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.write();
        let mut removed = false;
        handlers.retain(|_, list| {
            let before = list.len();
            list.retain(|entry| entry.id != id);
            removed |= list.len() != before;
            !list.is_empty()
        });
        removed
    }

    /// Number of handlers registered for `event`.
    pub fn handler_count(&self, event: &str) -> usize {
        self.handlers.read().get(event).map_or(0, Vec::len)
    }

    /// Event names with at least one handler.
    pub fn events(&self) -> Vec<String> {
        self.handlers.read().keys().cloned().collect()
    }

    fn snapshot(&self, event: &str) -> Vec<Arc<dyn Handler>> {
        self.handlers
            .read()
            .get(event)
            .map(|list| list.iter().map(|e| e.handler.clone()).collect())
            .unwrap_or_default()
    }

    /// Run every handler for `event` in registration order, one after the
    /// other, on the calling task.
    ///
    /// No handlers is a no-op. The first failing handler stops the rest of
    /// this occurrence and its error is returned.
    pub async fn dispatch(&self, event: &str, data: Value, ctx: EventContext) -> HandlerResult {
        let handlers = self.snapshot(event);
        let Some((last, rest)) = handlers.split_last() else {
            return Ok(());
        };

        for handler in rest {
            handler
                .call(data.clone(), ctx.clone())
                .await
                .map_err(|e| handler_error(event, e))?;
        }
        last.call(data, ctx)
            .await
            .map_err(|e| handler_error(event, e))
    }
}

fn handler_error(event: &str, source: KanteleError) -> KanteleError {
    KanteleError::Handler {
        event: event.to_string(),
        source: Box::new(source),
    }
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::new()
    }
}
