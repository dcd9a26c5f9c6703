//! Packet model and factory
//!
//! A packet is the unit of content flowing through the router. It carries
//! its payload (text, tone, media, tags) together with its routing intent:
//! where it is stored (`store`) and which gate is visually notified (`show`).

use crate::storage::MemoryLogEntry;
use crate::time::now_millis;
use crate::tone::Tone;
use serde::{Deserialize, Serialize};

/// Device id that marks packets produced by this dashboard
pub const LOCAL_DEVICE_ID: &str = "lucen17-inflo";

/// Division pulsed when a packet carries none
pub const DEFAULT_DIVISION: &str = "educationFlow";

/// Kind of content a packet carries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PacketType {
    #[default]
    Reflection,
    Image,
    Note,
    Metric,
}

/// Local/remote scope shared by packet storage and entry routing modes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    #[default]
    None,
    Local,
    Global,
    Both,
}

impl Scope {
    /// Whether the local log is involved
    pub fn includes_local(&self) -> bool {
        matches!(self, Self::Local | Self::Both)
    }

    /// Whether the remote store is involved
    pub fn includes_global(&self) -> bool {
        matches!(self, Self::Global | Self::Both)
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Local => write!(f, "Local"),
            Self::Global => write!(f, "Global"),
            Self::Both => write!(f, "Both"),
        }
    }
}

impl std::str::FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "None" => Ok(Self::None),
            "Local" => Ok(Self::Local),
            "Global" => Ok(Self::Global),
            "Both" => Ok(Self::Both),
            other => Err(format!("unknown scope: {}", other)),
        }
    }
}

/// A gate to notify, or the `"None"` sentinel
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum GateTarget {
    #[default]
    None,
    Gate(String),
}

impl GateTarget {
    /// Gate name, if any
    pub fn gate(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Gate(gate) => Some(gate),
        }
    }
}

impl From<Option<String>> for GateTarget {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(gate) if !gate.is_empty() && gate != "None" => Self::Gate(gate),
            _ => Self::None,
        }
    }
}

impl From<&str> for GateTarget {
    fn from(value: &str) -> Self {
        Self::from(Some(value.to_string()))
    }
}

impl From<GateTarget> for String {
    fn from(value: GateTarget) -> Self {
        value.to_string()
    }
}

impl std::fmt::Display for GateTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Gate(gate) => write!(f, "{}", gate),
        }
    }
}

impl std::str::FromStr for GateTarget {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

/// Kind of attached media
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
}

/// Media attached to a packet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub url: String,
    pub kind: MediaKind,
}

/// Producing device of a packet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Origin {
    pub device_id: String,
}

impl Origin {
    /// Origin for a given device
    pub fn device(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
        }
    }
}

/// A fully-defaulted packet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Packet {
    #[serde(rename = "type")]
    pub kind: PacketType,
    pub text: String,
    pub tone: Tone,
    pub media: Option<Media>,
    pub gate: Option<String>,
    pub division: Option<String>,
    pub subject: Option<String>,
    pub store: Scope,
    pub show: GateTarget,
    /// Producing device; unknown for packets received without one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,
    pub ts: i64,
}

impl Packet {
    /// Fill every unset field of `draft` with its default. A missing
    /// origin becomes [`LOCAL_DEVICE_ID`].
    pub fn create(draft: PacketDraft) -> Self {
        let origin = draft
            .origin
            .clone()
            .unwrap_or_else(|| Origin::device(LOCAL_DEVICE_ID));
        Self {
            origin: Some(origin),
            ..Self::receive(draft)
        }
    }

    /// Like [`Packet::create`], but a missing origin stays unknown
    pub fn receive(draft: PacketDraft) -> Self {
        Self {
            kind: draft.kind.unwrap_or_default(),
            text: draft.text.unwrap_or_default(),
            tone: draft.tone.unwrap_or_default(),
            media: draft.media,
            gate: draft.gate,
            division: draft.division,
            subject: draft.subject,
            store: draft.store.unwrap_or(Scope::Local),
            show: draft.show.unwrap_or_default(),
            origin: draft.origin,
            ts: draft.ts.unwrap_or_else(now_millis),
        }
    }

    /// Device the packet was produced on, when known
    pub fn device_id(&self) -> Option<&str> {
        self.origin.as_ref().map(|o| o.device_id.as_str())
    }

    /// Division to pulse for this packet
    pub fn division_or_default(&self) -> &str {
        self.division.as_deref().unwrap_or(DEFAULT_DIVISION)
    }

    /// Projection written to memory logs
    pub fn to_log_entry(&self) -> MemoryLogEntry {
        MemoryLogEntry {
            text: self.text.clone(),
            tone: self.tone,
            ts: self.ts,
            gate: self.gate.clone(),
            division: self.division.clone(),
            subject: self.subject.clone(),
            kind: self.kind,
        }
    }
}

/// Partially specified packet, as produced by callers or received from
/// other windows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PacketDraft {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<PacketType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<Tone>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<Media>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub division: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<Scope>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show: Option<GateTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,
    #[serde(
        default,
        deserialize_with = "crate::time::deserialize_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub ts: Option<i64>,
}

impl PacketDraft {
    /// Empty draft
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(mut self, kind: PacketType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn tone(mut self, tone: Tone) -> Self {
        self.tone = Some(tone);
        self
    }

    pub fn media(mut self, media: Media) -> Self {
        self.media = Some(media);
        self
    }

    pub fn gate(mut self, gate: impl Into<String>) -> Self {
        self.gate = Some(gate.into());
        self
    }

    pub fn division(mut self, division: impl Into<String>) -> Self {
        self.division = Some(division.into());
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn store(mut self, store: Scope) -> Self {
        self.store = Some(store);
        self
    }

    pub fn show(mut self, show: impl Into<GateTarget>) -> Self {
        self.show = Some(show.into());
        self
    }

    pub fn origin(mut self, device_id: impl Into<String>) -> Self {
        self.origin = Some(Origin::device(device_id));
        self
    }

    pub fn ts(mut self, ts: i64) -> Self {
        self.ts = Some(ts);
        self
    }

    /// Build the packet (see [`Packet::create`])
    pub fn build(self) -> Packet {
        Packet::create(self)
    }

    /// Build a packet received from elsewhere (see [`Packet::receive`])
    pub fn build_received(self) -> Packet {
        Packet::receive(self)
    }
}
