use std::{
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use futures::future::BoxFuture;
use parking_lot::RwLock;
use tracing::warn;

use crate::types::{Message, MessageSnapshot};

/// Opaque handle returned by [`AsyncEvent::subscribe`]; pass it back to
/// [`AsyncEvent::unsubscribe`] to remove that handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

type Handler<A> = Arc<dyn Fn(A) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Multicast dispatch point for one notification kind.
///
/// Handlers are invoked in subscription order against a snapshot of the
/// subscriber list taken when `publish` starts: subscribing or
/// unsubscribing during delivery affects the next publish, never the one
/// in flight. A handler that returns `Err` is reported to the log and the
/// remaining handlers still run; nothing propagates to the publisher.
pub struct AsyncEvent<A> {
    name: &'static str,
    handlers: RwLock<Vec<(SubscriptionId, Handler<A>)>>,
}

impl<A: Clone> AsyncEvent<A> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            handlers: RwLock::new(Vec::new()),
        }
    }

    pub fn subscribe<F, Fut>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let id = SubscriptionId(NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed));
        let handler: Handler<A> = Arc::new(move |args| Box::pin(handler(args)));
        self.handlers.write().push((id, handler));
        id
    }

    /// No-op when the handle was already removed.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.handlers.write().retain(|(existing, _)| *existing != id);
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Delivers `args` to every handler subscribed at the moment this call
    /// starts. Handlers run sequentially; a slow handler delays the ones
    /// subscribed after it, and a failing one is logged and skipped over.
    pub async fn publish(&self, args: A) {
        let snapshot: Vec<(SubscriptionId, Handler<A>)> = self.handlers.read().clone();
        for (id, handler) in snapshot {
            if let Err(err) = handler(args.clone()).await {
                warn!(
                    event = self.name,
                    subscription = id.0,
                    "event handler failed: {err:#}"
                );
            }
        }
    }
}

/// One dispatch point per notification kind, in the order the mirror fires
/// them. Subscriber lists live as long as the client.
pub struct ClientEvents {
    /// A pushed create event landed in the mirror.
    pub message_created: AsyncEvent<Arc<Message>>,
    /// A pushed update applied: prior snapshot (when it was cached) and the
    /// replacement entry.
    pub message_updated: AsyncEvent<(MessageSnapshot, Arc<Message>)>,
    /// A pushed delete applied: the removed entry, or only the identifier
    /// when the entry was never cached or already evicted.
    pub message_deleted: AsyncEvent<MessageSnapshot>,
}

impl ClientEvents {
    pub fn new() -> Self {
        Self {
            message_created: AsyncEvent::new("message_created"),
            message_updated: AsyncEvent::new("message_updated"),
            message_deleted: AsyncEvent::new("message_deleted"),
        }
    }
}

impl Default for ClientEvents {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "tests/event_bus_tests.rs"]
mod tests;
