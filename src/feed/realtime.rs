use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use super::{ChangeEvent, ChangeFeed, ChangeMessage, EventType, FeedError, Subscription};
use crate::config::BackendConfig;
use crate::session::SessionContext;
use crate::store::rest::BOOKMARKS_TABLE;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(25);
const CHANNEL_CAPACITY: usize = 64;

/// Phoenix channel envelope used by the realtime socket.
#[derive(Debug, Serialize, Deserialize)]
struct PhoenixMessage {
    topic: String,
    event: String,
    #[serde(default)]
    payload: Value,
    #[serde(rename = "ref", default)]
    reference: Option<String>,
}

/// `postgres_changes` payload as sent by the realtime service.
#[derive(Debug, Deserialize)]
struct PostgresChange {
    #[serde(rename = "type")]
    event_type: EventType,
    #[serde(default)]
    record: Value,
    #[serde(default)]
    old_record: Value,
}

#[derive(Debug, PartialEq)]
enum Frame {
    Change(ChangeEvent),
    Closed,
    Ignored,
}

/// Change feed over the hosted realtime websocket.
#[derive(Debug, Clone)]
pub struct RealtimeFeed {
    backend: BackendConfig,
    schema: String,
}

impl RealtimeFeed {
    pub fn new(backend: BackendConfig) -> Self {
        Self {
            backend,
            schema: "public".to_string(),
        }
    }

    fn socket_url(&self) -> Result<Url, FeedError> {
        let mut url = Url::parse(&self.backend.endpoint("realtime/v1/websocket"))
            .map_err(|e| FeedError::InvalidUrl(e.to_string()))?;
        let scheme = match url.scheme() {
            "https" => "wss",
            "http" => "ws",
            other => return Err(FeedError::InvalidUrl(format!("unsupported scheme {}", other))),
        };
        url.set_scheme(scheme)
            .map_err(|_| FeedError::InvalidUrl("cannot switch to websocket scheme".to_string()))?;
        url.query_pairs_mut()
            .append_pair("apikey", &self.backend.anon_key)
            .append_pair("vsn", "1.0.0");
        Ok(url)
    }

    fn join_message(&self, topic: &str, ctx: &SessionContext) -> PhoenixMessage {
        PhoenixMessage {
            topic: topic.to_string(),
            event: "phx_join".to_string(),
            payload: json!({
                "config": {
                    "broadcast": { "self": false },
                    "presence": { "key": "" },
                    "postgres_changes": [{
                        "event": "*",
                        "schema": self.schema,
                        "table": BOOKMARKS_TABLE,
                        "filter": format!("user_id=eq.{}", ctx.user_id()),
                    }]
                },
                "access_token": ctx.access_token(),
            }),
            reference: Some("1".to_string()),
        }
    }
}

#[async_trait]
impl ChangeFeed for RealtimeFeed {
    async fn subscribe(&self, ctx: &SessionContext) -> Result<Subscription, FeedError> {
        let url = self.socket_url()?;
        let (socket, _) = tokio_tungstenite::connect_async(url.as_str()).await?;
        let (mut sink, mut stream) = socket.split();

        let topic = format!("realtime:{}", BOOKMARKS_TABLE);
        let join = serde_json::to_string(&self.join_message(&topic, ctx))
            .map_err(|e| FeedError::Malformed(e.to_string()))?;
        sink.send(Message::Text(join)).await?;
        tracing::info!(user_id = %ctx.user_id(), topic = %topic, "change feed subscribed");

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let task = tokio::spawn(async move {
            let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
            heartbeat.tick().await;
            let mut next_ref: u64 = 2;

            loop {
                tokio::select! {
                    _ = heartbeat.tick() => {
                        let beat = PhoenixMessage {
                            topic: "phoenix".to_string(),
                            event: "heartbeat".to_string(),
                            payload: json!({}),
                            reference: Some(next_ref.to_string()),
                        };
                        next_ref += 1;
                        let text = match serde_json::to_string(&beat) {
                            Ok(text) => text,
                            Err(_) => continue,
                        };
                        if let Err(e) = sink.send(Message::Text(text)).await {
                            tracing::warn!(error = %e, "change feed heartbeat failed");
                            break;
                        }
                    }
                    message = stream.next() => {
                        let text = match message {
                            Some(Ok(Message::Text(text))) => text,
                            Some(Ok(Message::Close(_))) | None => break,
                            Some(Ok(_)) => continue,
                            Some(Err(e)) => {
                                tracing::warn!(error = %e, "change feed socket error");
                                break;
                            }
                        };
                        match decode_frame(&text) {
                            Ok(Frame::Change(event)) => {
                                if tx.send(event).await.is_err() {
                                    break;
                                }
                            }
                            Ok(Frame::Closed) => break,
                            Ok(Frame::Ignored) => {}
                            Err(e) => tracing::warn!(error = %e, "skipping change message"),
                        }
                    }
                    _ = tx.closed() => break,
                }
            }

            let _ = sink.send(Message::Close(None)).await;
            tracing::debug!("change feed closed");
        });

        Ok(Subscription::new(rx, task))
    }
}

fn decode_frame(text: &str) -> Result<Frame, FeedError> {
    let message: PhoenixMessage =
        serde_json::from_str(text).map_err(|e| FeedError::Malformed(e.to_string()))?;

    match message.event.as_str() {
        "postgres_changes" => {
            let data = message.payload.get("data").cloned().unwrap_or(Value::Null);
            let change: PostgresChange =
                serde_json::from_value(data).map_err(|e| FeedError::Malformed(e.to_string()))?;
            let normalized = ChangeMessage {
                event_type: change.event_type,
                new: change.record,
                old: change.old_record,
            };
            Ok(Frame::Change(ChangeEvent::try_from(normalized)?))
        }
        "phx_reply" => {
            if message.payload.get("status").and_then(Value::as_str) == Some("error") {
                tracing::warn!(topic = %message.topic, payload = %message.payload, "change feed join rejected");
                return Ok(Frame::Closed);
            }
            Ok(Frame::Ignored)
        }
        "phx_close" | "phx_error" => Ok(Frame::Closed),
        _ => Ok(Frame::Ignored),
    }
}
