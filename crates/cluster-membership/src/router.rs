//! Dispatches inbound cluster frames to a per-message-type callback,
//! logging and dropping anything with no registered handler.

use std::collections::HashMap;

use parking_lot::RwLock;
use shared_types::wire::{ClusterFrame, ClusterMessageType};
use tracing::debug;

pub type FrameHandler = Box<dyn Fn(&ClusterFrame) + Send + Sync>;

#[derive(Default)]
pub struct MessageRouter {
    handlers: RwLock<HashMap<ClusterMessageType, FrameHandler>>,
}

impl MessageRouter {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    pub fn register(&self, message_type: ClusterMessageType, handler: FrameHandler) {
        self.handlers.write().insert(message_type, handler);
    }

    /// Dispatches `frame` to its registered handler. Returns `true` if a
    /// handler was found and invoked.
    pub fn dispatch(&self, frame: &ClusterFrame) -> bool {
        let handlers = self.handlers.read();
        match handlers.get(&frame.message_type) {
            Some(handler) => {
                handler(frame);
                true
            }
            None => {
                debug!(
                    message_type = ?frame.message_type,
                    sender = %frame.sender_id,
                    "dropping cluster frame with no registered handler"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn frame(message_type: ClusterMessageType) -> ClusterFrame {
        ClusterFrame::new(message_type, 0, "node_test", Vec::new())
    }

    #[test]
    fn dispatch_returns_false_with_no_registered_handler() {
        let router = MessageRouter::new();
        assert!(!router.dispatch(&frame(ClusterMessageType::Ping)));
    }

    #[test]
    fn a_registered_handler_is_invoked_on_dispatch() {
        let router = MessageRouter::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        router.register(
            ClusterMessageType::Ping,
            Box::new(move |_frame| {
                calls2.fetch_add(1, Ordering::SeqCst);
            }),
        );
        assert!(router.dispatch(&frame(ClusterMessageType::Ping)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn a_handler_for_one_type_does_not_fire_for_another() {
        let router = MessageRouter::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        router.register(ClusterMessageType::Vote, Box::new(move |_| {
            calls2.fetch_add(1, Ordering::SeqCst);
        }));
        router.dispatch(&frame(ClusterMessageType::Pong));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
