use std::sync::Arc;

use async_stream::try_stream;
use shared::{
    domain::{CachePolicy, ChannelId, Direction, MessageId},
    error::FetchError,
};
use tokio_stream::Stream;

use crate::{message_cache::MessageCache, rest::MessageHistory, types::Message};

/// Computes one page of the cache/network merge.
///
/// The cache answers first. When it covers the whole batch, or the policy
/// forbids downloads, the cache result is the batch — possibly short, which
/// is an ordinary partial result and not a failure. Otherwise the remainder
/// is downloaded anchored at the last cache hit (or the caller's anchor if
/// the cache had nothing). Duplicates can only occur at the seam between
/// the two sources; anything that does not strictly extend the ordering is
/// dropped, so the batch stays strictly monotonic with no repeated ids.
async fn merged_batch(
    history: &Arc<dyn MessageHistory>,
    cache: Option<&MessageCache>,
    channel_id: ChannelId,
    anchor: Option<MessageId>,
    direction: Direction,
    limit: usize,
    policy: CachePolicy,
) -> Result<Vec<Arc<Message>>, FetchError> {
    let cached = match cache {
        Some(cache) => cache.range(anchor, direction, limit),
        None => Vec::new(),
    };
    if cached.len() >= limit || policy == CachePolicy::CacheOnly {
        return Ok(cached);
    }

    let fetch_anchor = cached.last().map(|message| message.id).or(anchor);
    let remaining = limit - cached.len();
    let page = history
        .fetch_page(channel_id, fetch_anchor, direction, remaining)
        .await?;

    let mut batch = cached;
    for payload in page {
        let message = Message::from_payload(payload);
        let extends = match (batch.last(), direction) {
            (None, _) => true,
            (Some(tail), Direction::Before) => message.id < tail.id,
            (Some(tail), Direction::After) => message.id > tail.id,
        };
        if extends {
            batch.push(message);
        }
    }
    Ok(batch)
}

/// Lazily paginated message history: one merged batch per element, each
/// anchored at the last identifier of the previous one.
///
/// The cache is re-queried on every batch, so entries pushed by concurrent
/// gateway events become visible mid-iteration — this is a live view, not a
/// snapshot. Iteration ends at the first short batch. A fetch failure is
/// the terminal element of the stream; it is not retried here and leaves
/// the cache untouched. Dropping the stream mid-flight simply abandons any
/// outstanding fetch.
pub(crate) fn paged_messages(
    history: Arc<dyn MessageHistory>,
    cache: Option<Arc<MessageCache>>,
    channel_id: ChannelId,
    anchor: Option<MessageId>,
    direction: Direction,
    limit: usize,
    policy: CachePolicy,
) -> impl Stream<Item = Result<Vec<Arc<Message>>, FetchError>> + Send + 'static {
    // Anchorless "after" has no defined starting point; the stream is
    // empty rather than an error.
    let undefined = anchor.is_none() && direction == Direction::After;

    try_stream! {
        let mut next_anchor = anchor;
        while !undefined {
            let batch = merged_batch(
                &history,
                cache.as_deref(),
                channel_id,
                next_anchor,
                direction,
                limit,
                policy,
            )
            .await?;

            let count = batch.len();
            let last_id = batch.last().map(|message| message.id);
            if count > 0 {
                yield batch;
            }
            if count < limit {
                break;
            }
            match last_id {
                Some(id) => next_anchor = Some(id),
                None => break,
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/pagination_tests.rs"]
mod tests;
