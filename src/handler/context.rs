//! Context passed to event handlers.

use std::sync::Arc;

/// Describes the dispatch occurrence a handler is running for.
///
/// Cheap to clone; every handler of one occurrence gets a copy.
#[derive(Debug, Clone)]
pub struct EventContext {
    event: Arc<str>,
    sequence: Option<u64>,
}

impl EventContext {
    pub fn new(event: &str, sequence: Option<u64>) -> Self {
        Self {
            event: Arc::from(event),
            sequence,
        }
    }

    /// Event name (the frame's `t`).
    #[inline]
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Sequence number carried by the dispatch frame, if any.
    #[inline]
    pub fn sequence(&self) -> Option<u64> {
        self.sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_creation() {
        let ctx = EventContext::new("READY", Some(1));
        assert_eq!(ctx.event(), "READY");
        assert_eq!(ctx.sequence(), Some(1));
    }

    #[test]
    fn test_context_is_clone() {
        let ctx = EventContext::new("MESSAGE_CREATE", None);
        let ctx2 = ctx.clone();

        assert_eq!(ctx.event(), ctx2.event());
        assert_eq!(ctx2.sequence(), None);
    }
}
