use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;
use shared::{
    domain::{ChannelId, MessageId},
    protocol::{GatewayEvent, MessagePayload, MessageUpdatePayload},
};
use tracing::debug;

use crate::{
    event_bus::ClientEvents,
    message_cache::MessageCache,
    types::{Message, MessageSnapshot},
};

/// A mirrored channel. The registry owns the channel, the channel owns its
/// cache; messages point back at their channel by identifier only, so there
/// is no reference cycle to break.
pub struct ChannelState {
    channel_id: ChannelId,
    messages: Option<Arc<MessageCache>>,
}

impl ChannelState {
    fn new(channel_id: ChannelId, cache_size: usize) -> Arc<Self> {
        // Capacity 0 disables caching for the channel outright.
        let messages = (cache_size > 0).then(|| Arc::new(MessageCache::new(cache_size)));
        Arc::new(Self {
            channel_id,
            messages,
        })
    }

    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    pub fn messages(&self) -> Option<&Arc<MessageCache>> {
        self.messages.as_ref()
    }
}

/// Identifier-indexed registry of mirrored channels.
pub struct ChannelRegistry {
    message_cache_size: usize,
    channels: RwLock<HashMap<ChannelId, Arc<ChannelState>>>,
}

impl ChannelRegistry {
    pub fn new(message_cache_size: usize) -> Self {
        Self {
            message_cache_size,
            channels: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, channel_id: ChannelId) -> Option<Arc<ChannelState>> {
        self.channels.read().get(&channel_id).cloned()
    }

    /// Returns the channel, creating it on first sight. Message events can
    /// race ahead of the channel roster, so the mirror registers lazily.
    pub(crate) fn ensure(&self, channel_id: ChannelId) -> Arc<ChannelState> {
        if let Some(existing) = self.get(channel_id) {
            return existing;
        }
        let mut channels = self.channels.write();
        Arc::clone(
            channels
                .entry(channel_id)
                .or_insert_with(|| ChannelState::new(channel_id, self.message_cache_size)),
        )
    }

    /// Drops the channel and its cache together.
    pub(crate) fn remove(&self, channel_id: ChannelId) -> Option<Arc<ChannelState>> {
        self.channels.write().remove(&channel_id)
    }

    pub fn len(&self) -> usize {
        self.channels.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.read().is_empty()
    }
}

/// The update pipeline: applies decoded push events to channel caches and
/// publishes the corresponding notifications.
///
/// Callers must apply events in gateway delivery order from one logical
/// task per connection — that total order is what guarantees a channel
/// never sees an update before its create. The mirror is the sole writer
/// of every channel cache; pagination and point lookups only read.
pub struct EntityMirror {
    channels: Arc<ChannelRegistry>,
    events: Arc<ClientEvents>,
}

impl EntityMirror {
    pub fn new(channels: Arc<ChannelRegistry>, events: Arc<ClientEvents>) -> Self {
        Self { channels, events }
    }

    pub async fn apply(&self, event: GatewayEvent) {
        match event {
            GatewayEvent::ChannelCreated { channel } => {
                self.channels.ensure(channel.channel_id);
            }
            GatewayEvent::ChannelDeleted { channel_id } => {
                if self.channels.remove(channel_id).is_some() {
                    debug!(channel_id = channel_id.0, "mirror: channel dropped");
                }
            }
            GatewayEvent::MessageCreated { message } => self.on_message_created(message).await,
            GatewayEvent::MessageUpdated { message } => self.on_message_updated(message).await,
            GatewayEvent::MessageDeleted {
                channel_id,
                message_id,
            } => self.on_message_deleted(channel_id, message_id).await,
        }
    }

    async fn on_message_created(&self, payload: MessagePayload) {
        let channel = self.channels.ensure(payload.channel_id);
        let message = Message::from_payload(payload);
        if let Some(cache) = channel.messages() {
            cache.add(Arc::clone(&message));
        }
        self.events.message_created.publish(message).await;
    }

    async fn on_message_updated(&self, payload: MessageUpdatePayload) {
        let cache = self
            .channels
            .get(payload.channel_id)
            .and_then(|channel| channel.messages().cloned());
        let before = cache
            .as_ref()
            .and_then(|cache| cache.get(payload.message_id));
        let after = Message::apply_update(before.as_deref(), &payload);

        // Cache entries are created by push-create events only: an update
        // replaces an existing entry but never resurrects an evicted one.
        if before.is_some() {
            if let Some(cache) = &cache {
                cache.add(Arc::clone(&after));
            }
        }

        let before_snapshot = match before {
            Some(before) => MessageSnapshot::Cached(before),
            None => MessageSnapshot::Uncached(payload.message_id),
        };
        self.events
            .message_updated
            .publish((before_snapshot, after))
            .await;
    }

    async fn on_message_deleted(&self, channel_id: ChannelId, message_id: MessageId) {
        let removed = self
            .channels
            .get(channel_id)
            .and_then(|channel| channel.messages().cloned())
            .and_then(|cache| cache.remove(message_id));
        let snapshot = match removed {
            Some(message) => MessageSnapshot::Cached(message),
            None => MessageSnapshot::Uncached(message_id),
        };
        self.events.message_deleted.publish(snapshot).await;
    }
}

#[cfg(test)]
#[path = "tests/mirror_tests.rs"]
mod tests;
