//! Per-(division, entry) routing configuration
//!
//! Each journal entry inside a division can route its packets outward
//! (`out_mode`/`out_target`) and accept packets coming back
//! (`in_mode`/`in_source`). Configurations are created lazily: reading a
//! pair that was never written yields the all-`None` default. Writes
//! replace the whole record (last write wins).

use super::packet::{GateTarget, Scope};
use crate::error::Result;
use crate::storage::{keys, ClientStorage};
use serde::{Deserialize, Serialize};

/// Which inbound packets an entry accepts by source gate
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum SourceFilter {
    /// Accept nothing
    #[default]
    None,
    /// Accept packets from any gate
    Any,
    /// Accept packets whose gate matches exactly
    Gate(String),
}

impl SourceFilter {
    /// Whether a packet tagged with `gate` passes this filter
    pub fn allows(&self, gate: Option<&str>) -> bool {
        match self {
            Self::None => false,
            Self::Any => true,
            Self::Gate(expected) => gate == Some(expected.as_str()),
        }
    }
}

impl From<Option<String>> for SourceFilter {
    fn from(value: Option<String>) -> Self {
        match value.as_deref() {
            None | Some("") | Some("None") => Self::None,
            Some("Any") => Self::Any,
            Some(gate) => Self::Gate(gate.to_string()),
        }
    }
}

impl From<&str> for SourceFilter {
    fn from(value: &str) -> Self {
        Self::from(Some(value.to_string()))
    }
}

impl From<SourceFilter> for String {
    fn from(value: SourceFilter) -> Self {
        value.to_string()
    }
}

impl std::fmt::Display for SourceFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Any => write!(f, "Any"),
            Self::Gate(gate) => write!(f, "{}", gate),
        }
    }
}

impl std::str::FromStr for SourceFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

/// Routing configuration of one journal entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EntryConfig {
    pub out_mode: Scope,
    pub out_target: GateTarget,
    pub in_mode: Scope,
    pub in_source: SourceFilter,
}

/// Loads and saves entry configurations from client storage
#[derive(Clone)]
pub struct EntryConfigResolver {
    storage: ClientStorage,
}

impl EntryConfigResolver {
    /// Create a resolver over `storage`
    pub fn new(storage: ClientStorage) -> Self {
        Self { storage }
    }

    /// Saved configuration, or the all-`None` default; never fails
    pub async fn read(&self, division: &str, entry: &str) -> EntryConfig {
        self.storage
            .read_json(&keys::entry_config(division, entry))
            .await
            .unwrap_or_default()
    }

    /// Replace the stored configuration
    pub async fn write(&self, division: &str, entry: &str, config: &EntryConfig) -> Result<()> {
        self.storage
            .write_json(&keys::entry_config(division, entry), config)
            .await?;
        tracing::info!(
            division,
            entry,
            out_mode = %config.out_mode,
            out_target = %config.out_target,
            in_mode = %config.in_mode,
            in_source = %config.in_source,
            "Saved entry routing"
        );
        Ok(())
    }
}
