//! Change feed for the `bookmarks` table.
//!
//! Subscribers receive typed [`ChangeEvent`]s through a [`Subscription`]
//! handle. Dropping the handle closes the underlying channel.

pub mod realtime;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::models::Bookmark;
use crate::session::SessionContext;

pub use realtime::RealtimeFeed;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Change feed connection failed: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Invalid change feed url: {0}")]
    InvalidUrl(String),

    #[error("Malformed change message: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    Insert,
    Update,
    Delete,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Insert => "INSERT",
            EventType::Update => "UPDATE",
            EventType::Delete => "DELETE",
        }
    }
}

/// Wire shape of one change: `{eventType, new, old}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeMessage {
    #[serde(rename = "eventType")]
    pub event_type: EventType,
    #[serde(default)]
    pub new: Value,
    #[serde(default)]
    pub old: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Insert(Bookmark),
    Update(Bookmark),
    Delete { id: Uuid },
}

impl ChangeEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            ChangeEvent::Insert(_) => EventType::Insert,
            ChangeEvent::Update(_) => EventType::Update,
            ChangeEvent::Delete { .. } => EventType::Delete,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            ChangeEvent::Insert(b) | ChangeEvent::Update(b) => b.id,
            ChangeEvent::Delete { id } => *id,
        }
    }
}

impl TryFrom<ChangeMessage> for ChangeEvent {
    type Error = FeedError;

    fn try_from(message: ChangeMessage) -> Result<Self, Self::Error> {
        let row = |value: Value| {
            serde_json::from_value::<Bookmark>(value).map_err(|e| FeedError::Malformed(e.to_string()))
        };

        match message.event_type {
            EventType::Insert => Ok(ChangeEvent::Insert(row(message.new)?)),
            EventType::Update => Ok(ChangeEvent::Update(row(message.new)?)),
            EventType::Delete => {
                let id = message
                    .old
                    .get("id")
                    .and_then(Value::as_str)
                    .and_then(|s| Uuid::parse_str(s).ok())
                    .ok_or_else(|| FeedError::Malformed("DELETE without old.id".to_string()))?;
                Ok(ChangeEvent::Delete { id })
            }
        }
    }
}

impl From<&ChangeEvent> for ChangeMessage {
    fn from(event: &ChangeEvent) -> Self {
        match event {
            ChangeEvent::Insert(b) | ChangeEvent::Update(b) => ChangeMessage {
                event_type: event.event_type(),
                new: serde_json::to_value(b).unwrap_or(Value::Null),
                old: Value::Object(Default::default()),
            },
            ChangeEvent::Delete { id } => ChangeMessage {
                event_type: EventType::Delete,
                new: Value::Object(Default::default()),
                old: serde_json::json!({ "id": id }),
            },
        }
    }
}

/// Cancellable handle over one open channel.
#[derive(Debug)]
pub struct Subscription {
    events: mpsc::Receiver<ChangeEvent>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Wraps a receiver fed by `task`. The task is aborted when the
    /// subscription is dropped.
    pub fn new(events: mpsc::Receiver<ChangeEvent>, task: JoinHandle<()>) -> Self {
        Self {
            events,
            task: Some(task),
        }
    }

    pub fn from_receiver(events: mpsc::Receiver<ChangeEvent>) -> Self {
        Self { events, task: None }
    }

    /// Next change, or `None` once the channel has closed.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }

    pub fn unsubscribe(self) {
        drop(self);
    }

    pub fn into_stream(self) -> impl Stream<Item = ChangeEvent> + Send {
        futures::stream::unfold(self, |mut subscription| async move {
            subscription.next().await.map(|event| (event, subscription))
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.events.close();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Opens a channel scoped to the caller's rows.
    async fn subscribe(&self, ctx: &SessionContext) -> Result<Subscription, FeedError>;
}
