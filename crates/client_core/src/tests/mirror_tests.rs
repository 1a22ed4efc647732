use super::*;
use chrono::Utc;
use parking_lot::Mutex;
use shared::{
    domain::{ChannelKind, GuildId, UserId},
    protocol::ChannelSummary,
};

const CHANNEL: ChannelId = ChannelId(3);

fn setup(cache_size: usize) -> (Arc<ChannelRegistry>, Arc<ClientEvents>, EntityMirror) {
    let channels = Arc::new(ChannelRegistry::new(cache_size));
    let events = Arc::new(ClientEvents::new());
    let mirror = EntityMirror::new(Arc::clone(&channels), Arc::clone(&events));
    (channels, events, mirror)
}

fn payload(id: i64, content: &str) -> MessagePayload {
    MessagePayload {
        message_id: MessageId(id),
        channel_id: CHANNEL,
        author_id: UserId(5),
        content: content.to_string(),
        edited_at: None,
        pinned: false,
        sent_at: Utc::now(),
    }
}

fn created(id: i64, content: &str) -> GatewayEvent {
    GatewayEvent::MessageCreated {
        message: payload(id, content),
    }
}

fn content_update(id: i64, content: &str) -> GatewayEvent {
    GatewayEvent::MessageUpdated {
        message: MessageUpdatePayload {
            message_id: MessageId(id),
            channel_id: CHANNEL,
            author_id: None,
            content: Some(content.to_string()),
            edited_at: Some(Utc::now()),
            pinned: None,
            sent_at: None,
        },
    }
}

fn deleted(id: i64) -> GatewayEvent {
    GatewayEvent::MessageDeleted {
        channel_id: CHANNEL,
        message_id: MessageId(id),
    }
}

#[tokio::test]
async fn create_event_caches_the_entity_and_publishes_it() {
    let (channels, events, mirror) = setup(4);
    let seen = Arc::new(Mutex::new(Vec::new()));
    {
        let seen = Arc::clone(&seen);
        events.message_created.subscribe(move |message: Arc<Message>| {
            let seen = Arc::clone(&seen);
            async move {
                seen.lock().push(message.id);
                Ok(())
            }
        });
    }

    mirror.apply(created(7, "hello")).await;

    let cached = channels
        .get(CHANNEL)
        .and_then(|channel| channel.messages().and_then(|cache| cache.get(MessageId(7))))
        .expect("created message is cached");
    assert_eq!(cached.content, "hello");
    assert_eq!(seen.lock().clone(), vec![MessageId(7)]);
}

#[tokio::test]
async fn update_replaces_the_cached_entry_and_reports_both_snapshots() {
    let (channels, events, mirror) = setup(4);
    let seen = Arc::new(Mutex::new(Vec::new()));
    {
        let seen = Arc::clone(&seen);
        events
            .message_updated
            .subscribe(move |(before, after): (MessageSnapshot, Arc<Message>)| {
                let seen = Arc::clone(&seen);
                async move {
                    seen.lock().push((before, after));
                    Ok(())
                }
            });
    }

    mirror.apply(created(7, "old")).await;
    mirror.apply(content_update(7, "new")).await;

    let cached = channels
        .get(CHANNEL)
        .and_then(|channel| channel.messages().and_then(|cache| cache.get(MessageId(7))))
        .expect("still cached");
    assert_eq!(cached.content, "new");
    assert!(cached.is_edited());

    let notifications = seen.lock();
    assert_eq!(notifications.len(), 1);
    let (before, after) = &notifications[0];
    let before = before.value().expect("entry was cached when update applied");
    assert_eq!(before.content, "old");
    assert!(!before.is_edited());
    assert_eq!(after.content, "new");
}

#[tokio::test]
async fn update_of_an_uncached_message_reports_uncached_and_does_not_insert() {
    let (channels, events, mirror) = setup(4);
    let seen = Arc::new(Mutex::new(Vec::new()));
    {
        let seen = Arc::clone(&seen);
        events
            .message_updated
            .subscribe(move |(before, after): (MessageSnapshot, Arc<Message>)| {
                let seen = Arc::clone(&seen);
                async move {
                    seen.lock().push((before, after));
                    Ok(())
                }
            });
    }

    // Channel exists, but id 7 was never pushed through a create event.
    mirror.apply(created(1, "unrelated")).await;
    mirror.apply(content_update(7, "edited")).await;

    assert!(channels
        .get(CHANNEL)
        .and_then(|channel| channel.messages().and_then(|cache| cache.get(MessageId(7))))
        .is_none());

    let notifications = seen.lock();
    assert_eq!(notifications.len(), 1);
    let (before, after) = &notifications[0];
    assert!(before.value().is_none());
    assert_eq!(before.id(), MessageId(7));
    assert_eq!(after.content, "edited");
}

#[tokio::test]
async fn delete_of_a_cached_message_carries_the_removed_entity() {
    let (channels, events, mirror) = setup(4);
    let seen = Arc::new(Mutex::new(Vec::new()));
    {
        let seen = Arc::clone(&seen);
        events
            .message_deleted
            .subscribe(move |snapshot: MessageSnapshot| {
                let seen = Arc::clone(&seen);
                async move {
                    seen.lock().push(snapshot);
                    Ok(())
                }
            });
    }

    mirror.apply(created(7, "doomed")).await;
    mirror.apply(deleted(7)).await;

    assert!(channels
        .get(CHANNEL)
        .and_then(|channel| channel.messages().and_then(|cache| cache.get(MessageId(7))))
        .is_none());

    let notifications = seen.lock();
    assert_eq!(notifications.len(), 1);
    let entity = notifications[0].value().expect("was cached at delete time");
    assert_eq!(entity.content, "doomed");
}

#[tokio::test]
async fn delete_after_eviction_reports_only_the_identifier() {
    let (_, events, mirror) = setup(2);
    let seen = Arc::new(Mutex::new(Vec::new()));
    {
        let seen = Arc::clone(&seen);
        events
            .message_deleted
            .subscribe(move |snapshot: MessageSnapshot| {
                let seen = Arc::clone(&seen);
                async move {
                    seen.lock().push(snapshot);
                    Ok(())
                }
            });
    }

    for id in 1..=3 {
        mirror.apply(created(id, "filler")).await;
    }
    // Capacity 2: id 1 was evicted, so the mirror cannot say what it held.
    mirror.apply(deleted(1)).await;

    let notifications = seen.lock();
    assert_eq!(notifications.len(), 1);
    assert!(notifications[0].value().is_none());
    assert_eq!(notifications[0].id(), MessageId(1));
}

#[tokio::test]
async fn zero_capacity_disables_the_cache_but_not_notifications() {
    let (channels, events, mirror) = setup(0);
    let seen = Arc::new(Mutex::new(Vec::new()));
    {
        let seen = Arc::clone(&seen);
        events.message_created.subscribe(move |message: Arc<Message>| {
            let seen = Arc::clone(&seen);
            async move {
                seen.lock().push(message.id);
                Ok(())
            }
        });
    }

    mirror.apply(created(7, "uncached")).await;

    let channel = channels.get(CHANNEL).expect("channel registered");
    assert!(channel.messages().is_none());
    assert_eq!(seen.lock().clone(), vec![MessageId(7)]);
}

#[tokio::test]
async fn channel_events_create_and_drop_mirrored_state() {
    let (channels, _, mirror) = setup(4);
    mirror
        .apply(GatewayEvent::ChannelCreated {
            channel: ChannelSummary {
                channel_id: CHANNEL,
                guild_id: GuildId(11),
                kind: ChannelKind::Text,
                name: "general".to_string(),
            },
        })
        .await;
    assert_eq!(channels.len(), 1);

    mirror.apply(created(7, "hello")).await;
    mirror
        .apply(GatewayEvent::ChannelDeleted {
            channel_id: CHANNEL,
        })
        .await;
    assert!(channels.is_empty());
    assert!(channels.get(CHANNEL).is_none());
}

#[tokio::test]
async fn message_events_register_unknown_channels_lazily() {
    let (channels, _, mirror) = setup(4);
    mirror.apply(created(7, "first sight")).await;
    let channel = channels.get(CHANNEL).expect("registered on first sight");
    assert_eq!(channel.channel_id(), CHANNEL);
    assert!(channel.messages().is_some());
}
