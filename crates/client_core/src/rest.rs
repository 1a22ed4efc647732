use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use shared::{
    domain::{ChannelId, Direction, MessageId},
    error::FetchError,
    protocol::MessagePayload,
};

/// Historical-fetch collaborator: request/response access to message
/// history the local cache no longer holds.
///
/// A page is ordered in the request direction — newest-first for `Before`,
/// oldest-first for `After` — and excludes the anchor itself. An empty page
/// means the source is exhausted in that direction. Rate limiting, retries
/// and timeouts are the implementation's concern; this crate surfaces every
/// failure to the caller of the batch that triggered it.
#[async_trait]
pub trait MessageHistory: Send + Sync {
    async fn fetch_page(
        &self,
        channel_id: ChannelId,
        anchor: Option<MessageId>,
        direction: Direction,
        limit: usize,
    ) -> Result<Vec<MessagePayload>, FetchError>;

    async fn fetch_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> Result<Option<MessagePayload>, FetchError>;
}

/// Null history source for clients constructed without a request/response
/// transport. Cache-only reads keep working; every download fails.
pub struct MissingMessageHistory;

#[async_trait]
impl MessageHistory for MissingMessageHistory {
    async fn fetch_page(
        &self,
        _channel_id: ChannelId,
        _anchor: Option<MessageId>,
        _direction: Direction,
        _limit: usize,
    ) -> Result<Vec<MessagePayload>, FetchError> {
        Err(FetchError::Unavailable)
    }

    async fn fetch_message(
        &self,
        _channel_id: ChannelId,
        _message_id: MessageId,
    ) -> Result<Option<MessagePayload>, FetchError> {
        Err(FetchError::Unavailable)
    }
}

#[derive(Serialize)]
struct PageQuery {
    limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    before: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    after: Option<i64>,
}

/// History source speaking the platform's message-history HTTP endpoint.
pub struct RestMessageHistory {
    http: Client,
    base_url: String,
}

impl RestMessageHistory {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl MessageHistory for RestMessageHistory {
    async fn fetch_page(
        &self,
        channel_id: ChannelId,
        anchor: Option<MessageId>,
        direction: Direction,
        limit: usize,
    ) -> Result<Vec<MessagePayload>, FetchError> {
        let (before, after) = match direction {
            Direction::Before => (anchor.map(|id| id.0), None),
            Direction::After => (None, anchor.map(|id| id.0)),
        };
        let response = self
            .http
            .get(format!(
                "{}/channels/{}/messages",
                self.base_url, channel_id.0
            ))
            .query(&PageQuery {
                limit,
                before,
                after,
            })
            .send()
            .await
            .map_err(|err| FetchError::Network(err.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            if let Some(anchor) = anchor {
                return Err(FetchError::InvalidAnchor { anchor: anchor.0 });
            }
            return Err(FetchError::Status(status.as_u16()));
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response
            .json()
            .await
            .map_err(|err| FetchError::Network(err.to_string()))
    }

    async fn fetch_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> Result<Option<MessagePayload>, FetchError> {
        let response = self
            .http
            .get(format!(
                "{}/channels/{}/messages/{}",
                self.base_url, channel_id.0, message_id.0
            ))
            .send()
            .await
            .map_err(|err| FetchError::Network(err.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let payload = response
            .json()
            .await
            .map_err(|err| FetchError::Network(err.to_string()))?;
        Ok(Some(payload))
    }
}
