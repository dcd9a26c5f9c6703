//! Client-side storage
//!
//! Everything the dashboard persists goes through [`ClientStorage`], a thin
//! typed layer over an injected [`KeyValueStore`]. Values are JSON (or plain
//! strings for scalars) under namespaced keys; see [`keys`].

pub mod kv;
pub mod log;

pub use kv::{FileKv, KeyValueStore, MemoryKv};
pub use log::{LocalMemoryLog, MemoryLogEntry};

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Storage key layout
pub mod keys {
    /// Local memory log (JSON array)
    pub const MEMORY: &str = "lucen.core.memory";
    /// Saved memory service base URL
    pub const API_BASE: &str = "lucen.core.api";
    /// `count:last_ts` checksum of the local log
    pub const CHECKSUM: &str = "lucen.core.hash";
    /// Dashboard mode (`Creation` / `Guidance`)
    pub const MODE: &str = "nucleos.mode";
    /// Resonance/coherence dial
    pub const DIAL_RC: &str = "lucen.core.dial.rc";
    /// Guidance/energy dial
    pub const DIAL_GE: &str = "lucen.core.dial.ge";
    /// Pre-namespacing location of the rc dial
    pub const LEGACY_DIAL_RC: &str = "lucen.dial.rc";
    /// Pre-namespacing location of the ge dial
    pub const LEGACY_DIAL_GE: &str = "lucen.dial.ge";
    /// Memory view mode (`local` / `global`)
    pub const MEMORY_VIEW: &str = "lucen.memory.mode";
    /// Last bridge state broadcast to apps
    pub const BRIDGE_STATE: &str = "lucen.bridge.state";
    /// Per-division notes
    pub const DIVISIONS: &str = "lucen.divisions";

    /// Routing configuration for one (division, entry) pair
    pub fn entry_config(division: &str, entry: &str) -> String {
        format!("lucen.division.{}.entries.{}", division, entry)
    }
}

/// Typed access to the client key-value store
#[derive(Clone)]
pub struct ClientStorage {
    kv: Arc<dyn KeyValueStore>,
}

impl ClientStorage {
    /// Wrap a key-value backend
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Storage backed by a fresh in-memory map
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryKv::new()))
    }

    /// Read a raw string value; backend errors read as absent
    pub async fn get_string(&self, key: &str) -> Option<String> {
        match self.kv.get(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, "Failed to read client storage: {}", e);
                None
            }
        }
    }

    /// Write a raw string value
    pub async fn set_string(&self, key: &str, value: impl Into<String>) -> Result<()> {
        self.kv.set(key, value.into()).await
    }

    /// Delete a value
    pub async fn remove(&self, key: &str) -> Result<()> {
        self.kv.remove(key).await
    }

    /// Read and decode a JSON value; malformed JSON reads as absent
    pub async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get_string(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, "Ignoring malformed stored value: {}", e);
                None
            }
        }
    }

    /// Encode and write a JSON value
    pub async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.kv.set(key, raw).await
    }

    /// Read a number stored as a string
    pub async fn read_f64(&self, key: &str) -> Option<f64> {
        self.get_string(key)
            .await
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[tokio::test]
    async fn test_json_round_trip() {
        let storage = ClientStorage::in_memory();
        let sample = Sample {
            name: "a".to_string(),
            count: 3,
        };
        storage.write_json("k", &sample).await.unwrap();
        assert_eq!(storage.read_json::<Sample>("k").await, Some(sample));
    }

    #[tokio::test]
    async fn test_malformed_json_reads_as_absent() {
        let storage = ClientStorage::in_memory();
        storage.set_string("k", "{not json").await.unwrap();
        assert!(storage.read_json::<Sample>("k").await.is_none());
    }

    #[tokio::test]
    async fn test_read_f64() {
        let storage = ClientStorage::in_memory();
        assert!(storage.read_f64("d").await.is_none());
        storage.set_string("d", "42.5").await.unwrap();
        assert_eq!(storage.read_f64("d").await, Some(42.5));
        storage.set_string("d", "NaN").await.unwrap();
        assert!(storage.read_f64("d").await.is_none());
        storage.set_string("d", "abc").await.unwrap();
        assert!(storage.read_f64("d").await.is_none());
    }

    #[test]
    fn test_entry_config_key() {
        assert_eq!(
            keys::entry_config("educationFlow", "Maths"),
            "lucen.division.educationFlow.entries.Maths"
        );
    }
}
