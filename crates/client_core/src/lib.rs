use std::sync::Arc;

use shared::{
    domain::{CachePolicy, ChannelId, Direction, MessageId},
    error::FetchError,
    protocol::GatewayEvent,
};
use tokio::task::JoinHandle;
use tokio_stream::Stream;

pub mod event_bus;
pub mod gateway;
pub mod message_cache;
pub mod mirror;
pub mod pagination;
pub mod rest;
pub mod types;

pub use event_bus::{AsyncEvent, ClientEvents, SubscriptionId};
pub use gateway::GatewayError;
pub use message_cache::MessageCache;
pub use mirror::{ChannelRegistry, ChannelState, EntityMirror};
pub use rest::{MessageHistory, MissingMessageHistory, RestMessageHistory};
pub use types::{ClientConfig, Message, MessageSnapshot};

/// Locally queryable, bounded-memory mirror of recent per-channel message
/// history.
///
/// Push events flow in through [`MirrorClient::apply_gateway_event`] (or the
/// websocket feed started by [`MirrorClient::connect_gateway`]) and out to
/// subscribers via [`ClientEvents`]. Reads are served from the per-channel
/// caches, falling back to the injected [`MessageHistory`] collaborator
/// when a paginated query allows downloads.
pub struct MirrorClient {
    config: ClientConfig,
    history: Arc<dyn MessageHistory>,
    channels: Arc<ChannelRegistry>,
    events: Arc<ClientEvents>,
    mirror: Arc<EntityMirror>,
}

impl MirrorClient {
    /// Client without a history source: cache-only reads work, downloads
    /// fail with [`FetchError::Unavailable`].
    pub fn new(config: ClientConfig) -> Arc<Self> {
        Self::new_with_history(config, Arc::new(MissingMessageHistory))
    }

    pub fn new_with_history(config: ClientConfig, history: Arc<dyn MessageHistory>) -> Arc<Self> {
        let channels = Arc::new(ChannelRegistry::new(config.message_cache_size));
        let events = Arc::new(ClientEvents::new());
        let mirror = Arc::new(EntityMirror::new(
            Arc::clone(&channels),
            Arc::clone(&events),
        ));
        Arc::new(Self {
            config,
            history,
            channels,
            events,
            mirror,
        })
    }

    pub fn events(&self) -> &ClientEvents {
        &self.events
    }

    pub fn channels(&self) -> &ChannelRegistry {
        &self.channels
    }

    /// Entry point for the transport layer: applies one decoded push event.
    /// Callers must preserve gateway delivery order.
    pub async fn apply_gateway_event(&self, event: GatewayEvent) {
        self.mirror.apply(event).await;
    }

    /// Starts the websocket push feed against `server_url` and returns the
    /// feed task handle.
    pub async fn connect_gateway(&self, server_url: &str) -> Result<JoinHandle<()>, GatewayError> {
        gateway::spawn_gateway_feed(server_url, Arc::clone(&self.mirror)).await
    }

    /// Synchronous cache-only point lookup; never touches the network.
    pub fn get_cached_message(
        &self,
        channel_id: ChannelId,
        id: MessageId,
    ) -> Option<Arc<Message>> {
        self.channels
            .get(channel_id)?
            .messages()
            .and_then(|cache| cache.get(id))
    }

    /// Synchronous cache-only range query; never touches the network.
    pub fn get_cached_messages(
        &self,
        channel_id: ChannelId,
        anchor: Option<MessageId>,
        direction: Direction,
        limit: usize,
    ) -> Vec<Arc<Message>> {
        self.channels
            .get(channel_id)
            .and_then(|channel| channel.messages().cloned())
            .map(|cache| cache.range(anchor, direction, limit))
            .unwrap_or_default()
    }

    /// Point lookup with download fallback. The fetched entity is returned
    /// but not cached: cache entries are created by push-create events only.
    pub async fn get_message(
        &self,
        channel_id: ChannelId,
        id: MessageId,
        policy: CachePolicy,
    ) -> Result<Option<Arc<Message>>, FetchError> {
        if let Some(cached) = self.get_cached_message(channel_id, id) {
            return Ok(Some(cached));
        }
        if policy == CachePolicy::CacheOnly {
            return Ok(None);
        }
        let payload = self.history.fetch_message(channel_id, id).await?;
        Ok(payload.map(Message::from_payload))
    }

    /// Lazily paginated history read; see [`pagination`] for the merge and
    /// termination rules. The batch size is clamped to the configured
    /// maximum.
    pub fn get_messages(
        &self,
        channel_id: ChannelId,
        anchor: Option<MessageId>,
        direction: Direction,
        limit: usize,
        policy: CachePolicy,
    ) -> impl Stream<Item = Result<Vec<Arc<Message>>, FetchError>> + Send + 'static {
        let limit = limit.clamp(1, self.config.max_messages_per_batch);
        let cache = self
            .channels
            .get(channel_id)
            .and_then(|channel| channel.messages().cloned());
        pagination::paged_messages(
            Arc::clone(&self.history),
            cache,
            channel_id,
            anchor,
            direction,
            limit,
            policy,
        )
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
