use std::sync::Arc;

use futures::StreamExt;
use shared::protocol::GatewayEvent;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tracing::{info, warn};

use crate::mirror::EntityMirror;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("server_url must start with http:// or https://: {0}")]
    InvalidUrl(String),
    #[error("failed to connect gateway websocket: {0}")]
    Connect(String),
}

/// Connects the push feed and applies decoded events in delivery order.
///
/// One feed task per connection is the sole applier of events, which gives
/// the mirror the sequential application order it requires. Reconnect,
/// resume and heartbeat belong to the surrounding transport; when the
/// socket closes or errors, the task just ends.
pub async fn spawn_gateway_feed(
    server_url: &str,
    mirror: Arc<EntityMirror>,
) -> Result<JoinHandle<()>, GatewayError> {
    let ws_url = if server_url.starts_with("https://") {
        server_url.replacen("https://", "wss://", 1)
    } else if server_url.starts_with("http://") {
        server_url.replacen("http://", "ws://", 1)
    } else {
        return Err(GatewayError::InvalidUrl(server_url.to_string()));
    };
    let ws_url = format!("{ws_url}/gateway");
    let (ws_stream, _) = connect_async(&ws_url)
        .await
        .map_err(|err| GatewayError::Connect(err.to_string()))?;
    let (_, mut ws_reader) = ws_stream.split();

    let handle = tokio::spawn(async move {
        while let Some(frame) = ws_reader.next().await {
            match frame {
                Ok(WsMessage::Text(text)) => match serde_json::from_str::<GatewayEvent>(&text) {
                    Ok(event) => mirror.apply(event).await,
                    Err(err) => warn!("gateway: invalid event frame: {err}"),
                },
                Ok(WsMessage::Close(_)) => break,
                Ok(_) => {}
                Err(err) => {
                    warn!("gateway: receive failed: {err}");
                    break;
                }
            }
        }
        info!("gateway: feed stopped");
    });

    Ok(handle)
}
