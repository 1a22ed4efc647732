use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};

use parking_lot::RwLock;
use shared::domain::{Direction, MessageId};

use crate::types::Message;

/// Fixed-capacity store of recently pushed messages for one channel.
///
/// Eviction is FIFO by insertion time, not by identifier magnitude: gateway
/// delivery can reorder near-simultaneous messages, and the cache must not
/// let a late-arriving older id push out a newer one ahead of its turn.
/// Entries are whole `Arc<Message>` values; a replacement swaps the map
/// slot atomically under the lock, so no reader observes a torn record.
///
/// The cache makes no durability claim: a miss may mean "never cached" or
/// "evicted" and callers cannot tell the difference.
pub struct MessageCache {
    capacity: usize,
    inner: RwLock<CacheInner>,
}

struct CacheInner {
    messages: HashMap<MessageId, Arc<Message>>,
    insertion_order: VecDeque<MessageId>,
}

impl MessageCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: RwLock::new(CacheInner {
                messages: HashMap::with_capacity(capacity),
                insertion_order: VecDeque::with_capacity(capacity),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.inner.read().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().messages.is_empty()
    }

    /// Inserts or replaces by identifier, then evicts oldest-inserted
    /// entries until the size bound holds. Replacing an existing id does
    /// not re-enqueue it, so a hot entry still ages out on schedule.
    ///
    /// Only the mirror writes; everything outside this crate reads.
    pub(crate) fn add(&self, message: Arc<Message>) {
        let id = message.id;
        let mut inner = self.inner.write();
        if inner.messages.insert(id, message).is_none() {
            inner.insertion_order.push_back(id);
        }
        while inner.messages.len() > self.capacity {
            match inner.insertion_order.pop_front() {
                // Ids already removed out-of-band are skipped here; the
                // queue may briefly hold stale entries after `remove`.
                Some(oldest) => {
                    inner.messages.remove(&oldest);
                }
                None => break,
            }
        }
    }

    pub fn get(&self, id: MessageId) -> Option<Arc<Message>> {
        self.inner.read().messages.get(&id).cloned()
    }

    /// Removes and returns the prior entry. The stale slot in the insertion
    /// queue is reclaimed lazily by the next eviction pass.
    pub(crate) fn remove(&self, id: MessageId) -> Option<Arc<Message>> {
        self.inner.write().messages.remove(&id)
    }

    /// Up to `limit` entries strictly beyond `anchor` in the requested
    /// direction: descending by id for `Before`, ascending for `After`.
    /// Without an anchor, `Before` returns the most recent entries and
    /// `After` returns nothing. The anchor entry itself is never included.
    pub fn range(
        &self,
        anchor: Option<MessageId>,
        direction: Direction,
        limit: usize,
    ) -> Vec<Arc<Message>> {
        if limit == 0 {
            return Vec::new();
        }
        let inner = self.inner.read();
        let mut selected: Vec<Arc<Message>> = match (anchor, direction) {
            (None, Direction::Before) => inner.messages.values().cloned().collect(),
            (None, Direction::After) => return Vec::new(),
            (Some(anchor), Direction::Before) => inner
                .messages
                .values()
                .filter(|message| message.id < anchor)
                .cloned()
                .collect(),
            (Some(anchor), Direction::After) => inner
                .messages
                .values()
                .filter(|message| message.id > anchor)
                .cloned()
                .collect(),
        };
        drop(inner);

        match direction {
            Direction::Before => selected.sort_by(|a, b| b.id.cmp(&a.id)),
            Direction::After => selected.sort_by_key(|message| message.id),
        }
        selected.truncate(limit);
        selected
    }
}

#[cfg(test)]
#[path = "tests/message_cache_tests.rs"]
mod tests;
