//! Capped JSON-file logs for the memory service
//!
//! Directory layout:
//! ```text
//! <data_dir>/
//! ├── memory.json   reflections, oldest first
//! └── tolls.json    toll transactions, oldest first
//! ```
//!
//! Each file holds one JSON array. It is loaded once at startup and
//! rewritten after every append. Items that fail to decode are dropped on
//! load; the file as found is first copied to `<name>.bak` so the next
//! rewrite does not lose them.

use crate::error::{Error, Result};
use crate::remote::{MemoryItem, TollTx};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Reflections kept by the service
pub type MemoryStore = JsonLog<MemoryItem>;

/// Toll transactions kept by the service
pub type TollStore = JsonLog<TollTx>;

/// Append-only list persisted as a JSON array, oldest evicted past `cap`
pub struct JsonLog<T> {
    path: PathBuf,
    cap: usize,
    items: Arc<RwLock<Vec<T>>>,
}

impl<T> JsonLog<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    /// Open the log at `path`, creating its directory
    pub async fn open(path: PathBuf, cap: usize) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut items = Self::load(&path).await;
        let cap = cap.max(1);
        if items.len() > cap {
            let excess = items.len() - cap;
            items.drain(..excess);
        }

        Ok(Self {
            path,
            cap,
            items: Arc::new(RwLock::new(items)),
        })
    }

    async fn load(path: &Path) -> Vec<T> {
        let data = match tokio::fs::read_to_string(path).await {
            Ok(data) => data,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Failed to read {}: {}", path.display(), e);
                }
                return Vec::new();
            }
        };

        let raw: Vec<Value> = match serde_json::from_str(&data) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Failed to parse {}: {}", path.display(), e);
                Self::back_up(path).await;
                return Vec::new();
            }
        };

        let total = raw.len();
        let items: Vec<T> = raw
            .into_iter()
            .filter_map(|value| serde_json::from_value(value).ok())
            .collect();
        if items.len() < total {
            tracing::warn!(
                path = %path.display(),
                skipped = total - items.len(),
                "Dropped undecodable items"
            );
            Self::back_up(path).await;
        }
        items
    }

    async fn back_up(path: &Path) {
        let backup = backup_path(path);
        match tokio::fs::copy(path, &backup).await {
            Ok(_) => tracing::info!(backup = %backup.display(), "Kept a copy of the original file"),
            Err(e) => tracing::warn!("Failed to back up {}: {}", path.display(), e),
        }
    }

    /// Append an item and rewrite the file; on a failed write the
    /// in-memory list is left as it was
    pub async fn append(&self, item: T) -> Result<()> {
        let mut items = self.items.write().await;
        let mut next = items.clone();
        next.push(item);
        if next.len() > self.cap {
            let excess = next.len() - self.cap;
            next.drain(..excess);
        }

        let json = serde_json::to_string_pretty(&next)?;
        tokio::fs::write(&self.path, json).await.map_err(|e| {
            Error::Storage(format!("Failed to write {}: {}", self.path.display(), e))
        })?;

        *items = next;
        Ok(())
    }

    /// Up to `limit` most recent items, newest first
    pub async fn recent(&self, limit: usize) -> Vec<T> {
        let items = self.items.read().await;
        items.iter().rev().take(limit).cloned().collect()
    }

    /// Number of items held
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    /// Whether the log holds nothing
    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// `memory.json` -> `memory.json.bak`
fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".bak");
    path.with_file_name(name)
}
