//! Local memory log
//!
//! Append-only JSON array stored under [`keys::MEMORY`], capped at a fixed
//! number of entries with the oldest evicted first. Every append also
//! refreshes the `count:last_ts` checksum under [`keys::CHECKSUM`].
//!
//! Elements are decoded one at a time. An element that does not decode is
//! left out of [`LocalMemoryLog::entries`] but stays in storage, in place,
//! until the cap evicts it.

use super::{keys, ClientStorage};
use crate::error::Result;
use crate::routing::PacketType;
use crate::tone::Tone;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Default capacity of the local log
pub const DEFAULT_LOG_CAP: usize = 5000;

/// Persisted projection of a packet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryLogEntry {
    #[serde(default)]
    pub text: String,
    #[serde(default, deserialize_with = "crate::tone::deserialize_lenient")]
    pub tone: Tone,
    #[serde(default, deserialize_with = "crate::time::deserialize")]
    pub ts: i64,
    #[serde(default)]
    pub gate: Option<String>,
    #[serde(default)]
    pub division: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: PacketType,
}

/// Capped local memory log
#[derive(Clone)]
pub struct LocalMemoryLog {
    storage: ClientStorage,
    cap: usize,
    write_lock: Arc<Mutex<()>>,
}

impl LocalMemoryLog {
    /// Create a log over `storage` holding at most `cap` entries
    pub fn new(storage: ClientStorage, cap: usize) -> Self {
        Self {
            storage,
            cap: cap.max(1),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Maximum number of entries kept
    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Stored elements, decoded or not
    async fn stored(&self) -> Vec<Value> {
        self.storage
            .read_json::<Vec<Value>>(keys::MEMORY)
            .await
            .unwrap_or_default()
    }

    /// All decodable entries, oldest first
    pub async fn entries(&self) -> Vec<MemoryLogEntry> {
        decode_entries(self.stored().await)
    }

    /// Number of entries
    pub async fn len(&self) -> usize {
        self.entries().await.len()
    }

    /// Whether the log is empty
    pub async fn is_empty(&self) -> bool {
        self.entries().await.is_empty()
    }

    /// Append an entry, evicting the oldest beyond the cap.
    /// Returns the number of stored elements after the append.
    pub async fn append(&self, entry: MemoryLogEntry) -> Result<usize> {
        let _guard = self.write_lock.lock().await;

        let last_ts = entry.ts;
        let mut stored = self.stored().await;
        stored.push(serde_json::to_value(&entry)?);
        if stored.len() > self.cap {
            let excess = stored.len() - self.cap;
            stored.drain(..excess);
        }

        self.storage.write_json(keys::MEMORY, &stored).await?;
        self.write_checksum(format_checksum(stored.len(), last_ts))
            .await;

        tracing::debug!(len = stored.len(), "Appended local memory entry");
        Ok(stored.len())
    }

    /// Stored checksum (`count:last_ts`)
    pub async fn checksum(&self) -> Option<String> {
        self.storage.get_string(keys::CHECKSUM).await
    }

    async fn write_checksum(&self, checksum: String) {
        if let Err(e) = self.storage.set_string(keys::CHECKSUM, checksum).await {
            tracing::warn!("Failed to update memory checksum: {}", e);
        }
    }
}

fn decode_entries(stored: Vec<Value>) -> Vec<MemoryLogEntry> {
    let mut skipped = 0usize;
    let entries: Vec<MemoryLogEntry> = stored
        .into_iter()
        .filter_map(|raw| match serde_json::from_value(raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                skipped += 1;
                tracing::debug!("Skipping undecodable memory entry: {}", e);
                None
            }
        })
        .collect();
    if skipped > 0 {
        tracing::warn!(skipped, "Local memory log holds undecodable entries");
    }
    entries
}

fn format_checksum(len: usize, last_ts: i64) -> String {
    format!("{}:{}", len, last_ts)
}

/// Lightweight checksum: entry count and the last entry's timestamp
pub fn checksum_of(entries: &[MemoryLogEntry]) -> String {
    format_checksum(entries.len(), entries.last().map(|e| e.ts).unwrap_or(0))
}
