use std::sync::Arc;

use chrono::{DateTime, Utc};
use shared::{
    domain::{ChannelId, MessageId, UserId},
    protocol::{MessagePayload, MessageUpdatePayload},
};

/// Client-wide configuration knobs.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Messages retained per channel. 0 disables message caching entirely:
    /// no cache is constructed and every read goes to the history source.
    pub message_cache_size: usize,
    /// Upper bound applied to a single pagination batch.
    pub max_messages_per_batch: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            message_cache_size: 0,
            max_messages_per_batch: 100,
        }
    }
}

impl ClientConfig {
    pub fn with_message_cache_size(message_cache_size: usize) -> Self {
        Self {
            message_cache_size,
            ..Self::default()
        }
    }
}

/// An immutable snapshot of a chat message.
///
/// Updates never mutate a cached entry; the mirror builds a replacement and
/// swaps it in wholesale, so readers holding an `Arc` keep a coherent value.
/// The channel is referenced by identifier only — the channel registry owns
/// channel state, messages never do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub author_id: UserId,
    pub content: String,
    pub edited_at: Option<DateTime<Utc>>,
    pub pinned: bool,
    pub sent_at: DateTime<Utc>,
}

impl Message {
    pub fn from_payload(payload: MessagePayload) -> Arc<Self> {
        Arc::new(Self {
            id: payload.message_id,
            channel_id: payload.channel_id,
            author_id: payload.author_id,
            content: payload.content,
            edited_at: payload.edited_at,
            pinned: payload.pinned,
            sent_at: payload.sent_at,
        })
    }

    /// Builds the replacement entry for a partial update, starting from the
    /// cached snapshot when one exists. Without a cached entry the result is
    /// assembled from the update alone; the send instant falls back to the
    /// snowflake timestamp when the payload omits it.
    pub fn apply_update(before: Option<&Message>, update: &MessageUpdatePayload) -> Arc<Self> {
        let mut next = match before {
            Some(before) => before.clone(),
            None => Self {
                id: update.message_id,
                channel_id: update.channel_id,
                // Author unknown until a full payload is seen.
                author_id: update.author_id.unwrap_or(UserId(0)),
                content: String::new(),
                edited_at: None,
                pinned: false,
                sent_at: update
                    .sent_at
                    .unwrap_or_else(|| update.message_id.timestamp()),
            },
        };
        if let Some(author_id) = update.author_id {
            next.author_id = author_id;
        }
        if let Some(content) = &update.content {
            next.content = content.clone();
        }
        if let Some(edited_at) = update.edited_at {
            next.edited_at = Some(edited_at);
        }
        if let Some(pinned) = update.pinned {
            next.pinned = pinned;
        }
        if let Some(sent_at) = update.sent_at {
            next.sent_at = sent_at;
        }
        Arc::new(next)
    }

    pub fn is_edited(&self) -> bool {
        self.edited_at.is_some()
    }
}

/// A message reference that may no longer resolve from the cache.
///
/// Delete and update notifications carry one: the entity when it was still
/// cached at the time the event applied, otherwise only the identifier —
/// the mirror cannot know the content of an entry it evicted or never held.
#[derive(Debug, Clone)]
pub enum MessageSnapshot {
    Cached(Arc<Message>),
    Uncached(MessageId),
}

impl MessageSnapshot {
    pub fn id(&self) -> MessageId {
        match self {
            Self::Cached(message) => message.id,
            Self::Uncached(id) => *id,
        }
    }

    pub fn value(&self) -> Option<&Arc<Message>> {
        match self {
            Self::Cached(message) => Some(message),
            Self::Uncached(_) => None,
        }
    }
}
