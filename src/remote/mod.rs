//! Remote memory service access
//!
//! The dashboard treats the memory service as optional: every call that the
//! routing core makes returns a [`BestEffort`] instead of an error, so an
//! unreachable service degrades to local-only operation.

mod client;
pub mod types;

pub use client::HttpRemote;
pub use types::*;

use async_trait::async_trait;

/// Outcome of a call that is allowed to fail silently
#[derive(Debug, Clone, PartialEq)]
pub enum BestEffort<T = ()> {
    /// The service answered
    Delivered(T),
    /// The service could not be reached or rejected the call
    Unreachable(String),
}

impl<T> BestEffort<T> {
    /// Fold a fallible call into a best-effort outcome
    pub fn from_result<E: std::fmt::Display>(result: std::result::Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Delivered(value),
            Err(e) => Self::Unreachable(e.to_string()),
        }
    }

    /// Whether the call went through
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered(_))
    }

    /// Delivered value, if any
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Delivered(value) => Some(value),
            Self::Unreachable(_) => None,
        }
    }

    /// Drop the delivered value
    pub fn discard(self) -> BestEffort<()> {
        match self {
            Self::Delivered(_) => BestEffort::Delivered(()),
            Self::Unreachable(reason) => BestEffort::Unreachable(reason),
        }
    }
}

/// Remote memory log used by the routing core
#[async_trait]
pub trait RemoteMemory: Send + Sync {
    /// Persist one reflection
    async fn save(&self, entry: &NewMemory) -> BestEffort<SavedMemory>;

    /// Most recent reflections, newest first
    async fn recent(&self, limit: usize) -> BestEffort<Vec<MemoryItem>>;
}

/// Remote that is never reachable (local-only operation)
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineRemote;

#[async_trait]
impl RemoteMemory for OfflineRemote {
    async fn save(&self, _entry: &NewMemory) -> BestEffort<SavedMemory> {
        BestEffort::Unreachable("offline".to_string())
    }

    async fn recent(&self, _limit: usize) -> BestEffort<Vec<MemoryItem>> {
        BestEffort::Unreachable("offline".to_string())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_effort_from_result() {
        let ok: BestEffort<u8> = BestEffort::from_result(Ok::<u8, String>(3));
        assert!(ok.is_delivered());
        assert_eq!(ok.ok(), Some(3));

        let err: BestEffort<u8> = BestEffort::from_result(Err::<u8, _>("connection refused"));
        assert!(!err.is_delivered());
        assert_eq!(
            err.clone().discard(),
            BestEffort::Unreachable("connection refused".to_string())
        );
        assert_eq!(err.ok(), None);
    }

    #[tokio::test]
    async fn test_offline_remote() {
        let remote = OfflineRemote;
        let entry = NewMemory {
            text: "x".to_string(),
            tone: None,
            ts: None,
            device_id: None,
            division: None,
            location: None,
        };
        assert!(!remote.save(&entry).await.is_delivered());
        assert!(!remote.recent(10).await.is_delivered());
    }
}
