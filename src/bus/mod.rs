//! Local notification channel
//!
//! Same-origin publish/subscribe between the dashboard core and the apps
//! (gates) running beside it. Three message shapes travel on the bus:
//!
//! | `type`        | Direction        | Payload                          |
//! |---------------|------------------|----------------------------------|
//! | `lucenRoute`  | core → gate      | full packet plus `notify` target |
//! | `lucenUpdate` | core → all apps  | bridge state after a reflection  |
//! | `lucenReturn` | gate → core      | partial packet coming back       |
//!
//! Delivery is best-effort: publishing with no subscribers is not an error,
//! and slow subscribers skip what they missed.
//!
//! Apps outside the process talk to the bus over JSON lines, one message
//! per line: [`NotificationBus::publish_lines`] feeds incoming lines in and
//! [`forward_lines`] writes outgoing messages out.

use crate::error::Result;
use crate::routing::{Packet, PacketDraft};
use crate::tone::Tone;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Default number of buffered messages per subscriber
pub const DEFAULT_BUS_CAPACITY: usize = 256;

/// Message topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Route,
    Update,
    Return,
}

/// Outbound notification addressed to one gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteNotice {
    #[serde(flatten)]
    pub packet: Packet,
    pub notify: String,
}

/// Dashboard state shared with apps after each logged reflection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeState {
    pub beam_color: String,
    pub last_reflection: String,
    pub tone: Tone,
    pub division: String,
    pub ts: i64,
}

/// Packet returned by an app, optionally naming the entry it belongs to
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReturnPacket {
    #[serde(flatten)]
    pub draft: PacketDraft,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,
}

/// A message on the bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum BusMessage {
    #[serde(rename = "lucenRoute")]
    Route(RouteNotice),
    #[serde(rename = "lucenUpdate")]
    Update(BridgeState),
    #[serde(rename = "lucenReturn")]
    Return(ReturnPacket),
}

impl BusMessage {
    /// Topic of this message
    pub fn topic(&self) -> Topic {
        match self {
            Self::Route(_) => Topic::Route,
            Self::Update(_) => Topic::Update,
            Self::Return(_) => Topic::Return,
        }
    }

    /// Decode a message received from another window
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Encode for another window
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// In-process broadcast bus
#[derive(Clone)]
pub struct NotificationBus {
    tx: broadcast::Sender<BusMessage>,
}

impl NotificationBus {
    /// Create a bus buffering up to `capacity` messages per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish a message; returns how many subscribers will see it
    pub fn publish(&self, message: BusMessage) -> usize {
        let topic = message.topic();
        match self.tx.send(message) {
            Ok(receivers) => {
                tracing::debug!(?topic, receivers, "Published bus message");
                receivers
            }
            Err(_) => {
                tracing::debug!(?topic, "Published bus message with no subscribers");
                0
            }
        }
    }

    /// Publish every message read from `reader`, one JSON object per line.
    /// Blank and undecodable lines are skipped. Returns the number of
    /// messages published once the reader is exhausted.
    pub async fn publish_lines<R>(&self, reader: R) -> Result<usize>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        let mut published = 0;
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match BusMessage::from_json(line) {
                Ok(message) => {
                    self.publish(message);
                    published += 1;
                }
                Err(e) => tracing::warn!("Ignoring malformed bus line: {}", e),
            }
        }
        Ok(published)
    }

    /// Subscribe to one topic
    pub fn subscribe(&self, topic: Topic) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
            topic: Some(topic),
        }
    }

    /// Subscribe to every topic
    pub fn subscribe_all(&self) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
            topic: None,
        }
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

/// Receiving end of a bus subscription
pub struct Subscription {
    rx: broadcast::Receiver<BusMessage>,
    topic: Option<Topic>,
}

impl Subscription {
    fn wants(&self, message: &BusMessage) -> bool {
        self.topic.map_or(true, |t| t == message.topic())
    }

    /// Wait for the next matching message; `None` once the bus is gone
    pub async fn recv(&mut self) -> Option<BusMessage> {
        loop {
            match self.rx.recv().await {
                Ok(message) if self.wants(&message) => return Some(message),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Bus subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Next matching message already queued, without waiting
    pub fn try_recv(&mut self) -> Option<BusMessage> {
        loop {
            match self.rx.try_recv() {
                Ok(message) if self.wants(&message) => return Some(message),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Bus subscriber lagged");
                }
                Err(_) => return None,
            }
        }
    }
}

/// Write core-to-app messages (`lucenRoute`, `lucenUpdate`) from
/// `subscription` to `writer` as JSON lines until `shutdown` fires or the
/// bus closes. Returns the number of lines written.
pub async fn forward_lines<W>(
    mut subscription: Subscription,
    mut writer: W,
    shutdown: CancellationToken,
) -> Result<usize>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0;
    loop {
        tokio::select! {
            biased;
            message = subscription.recv() => match message {
                Some(BusMessage::Return(_)) => {}
                Some(message) => {
                    let mut line = message.to_json()?;
                    line.push('\n');
                    writer.write_all(line.as_bytes()).await?;
                    writer.flush().await?;
                    written += 1;
                }
                None => break,
            },
            _ = shutdown.cancelled() => break,
        }
    }
    Ok(written)
}
