//! Actuator command delivery and sensor reading intake.
//!
//! The broker client lives outside this crate; handlers only see [`Publisher`]
//! and the ingest task only sees [`Subscriber`].

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::{Mutex, mpsc};
use tracing::{info, warn};

/// Payloads buffered per subscription before delivery waits.
pub const SUBSCRIPTION_BUFFER: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("publish to {topic} failed: {reason}")]
    Publish { topic: String, reason: String },
}

#[async_trait]
pub trait Publisher: Send + Sync {
    /// Deliver `payload` on `topic` with at-least-once semantics.
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), BusError>;
}

/// Writes each command to the log instead of a broker.
#[derive(Clone, Debug, Default)]
pub struct LogPublisher;

#[async_trait]
impl Publisher for LogPublisher {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), BusError> {
        info!(topic, payload, "actuator command published");
        Ok(())
    }
}

/// Keeps published messages in memory.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    messages: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingPublisher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A publisher whose every delivery fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub async fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().await.clone()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), BusError> {
        if self.fail {
            return Err(BusError::Publish {
                topic: topic.to_string(),
                reason: "broker unreachable".to_string(),
            });
        }
        self.messages
            .lock()
            .await
            .push((topic.to_string(), payload.to_string()));
        Ok(())
    }
}

#[async_trait]
pub trait Subscriber: Send + Sync {
    /// Open a subscription on `topic`. The receiver yields raw payloads and
    /// ends when the subscription closes.
    async fn subscribe(&self, topic: &str) -> Result<mpsc::Receiver<String>, BusError>;
}

/// Stand-in for a broker with no reading source; every subscription closes
/// right away.
#[derive(Clone, Debug, Default)]
pub struct IdleSubscriber;

#[async_trait]
impl Subscriber for IdleSubscriber {
    async fn subscribe(&self, topic: &str) -> Result<mpsc::Receiver<String>, BusError> {
        warn!(topic, "no broker configured, subscription closed");
        let (_tx, rx) = mpsc::channel(1);
        Ok(rx)
    }
}

/// In-process fan-out: [`ChannelSubscriber::deliver`] hands a payload to
/// every open subscription on the topic.
#[derive(Debug, Default)]
pub struct ChannelSubscriber {
    topics: Mutex<HashMap<String, Vec<mpsc::Sender<String>>>>,
}

impl ChannelSubscriber {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many subscriptions received the payload.
    pub async fn deliver(&self, topic: &str, payload: &str) -> usize {
        let mut topics = self.topics.lock().await;
        let Some(senders) = topics.get_mut(topic) else {
            return 0;
        };
        senders.retain(|tx| !tx.is_closed());

        let mut delivered = 0;
        for tx in senders.iter() {
            if tx.send(payload.to_string()).await.is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    /// Drop every subscription, ending their receivers.
    pub async fn close(&self) {
        self.topics.lock().await.clear();
    }
}

#[async_trait]
impl Subscriber for ChannelSubscriber {
    async fn subscribe(&self, topic: &str) -> Result<mpsc::Receiver<String>, BusError> {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        self.topics
            .lock()
            .await
            .entry(topic.to_string())
            .or_default()
            .push(tx);
        Ok(rx)
    }
}
