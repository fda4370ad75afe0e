//! Blocking sync bridge.
//!
//! Observes blocking eligibility and the site list, and pushes a
//! [`BlockingSyncPayload`] to the enforcement side whenever either changes.
//! Delivery is fire-and-forget: failures are logged, never retried, and the
//! next state change re-syncs.

use crate::error::SyncError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockingSyncPayload {
    pub is_blocking: bool,
    pub sites: Vec<String>,
}

/// The external enforcement collaborator.
pub trait EnforcementSink: Send {
    fn sync(&mut self, payload: &BlockingSyncPayload) -> Result<(), SyncError>;
}

/// Publishes payloads to every connected extension through a watch channel.
///
/// The channel keeps only the latest value, so a client that connects late or
/// falls behind always sees the newest payload.
#[derive(Debug, Clone)]
pub struct WatchSink {
    tx: Arc<watch::Sender<BlockingSyncPayload>>,
}

impl WatchSink {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(BlockingSyncPayload::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> watch::Receiver<BlockingSyncPayload> {
        self.tx.subscribe()
    }

    #[cfg(test)]
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for WatchSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EnforcementSink for WatchSink {
    fn sync(&mut self, payload: &BlockingSyncPayload) -> Result<(), SyncError> {
        self.tx.send_replace(payload.clone());
        if self.tx.receiver_count() == 0 {
            return Err(SyncError::Unavailable);
        }
        Ok(())
    }
}

pub struct BlockingBridge {
    sink: Box<dyn EnforcementSink>,
    last: Option<BlockingSyncPayload>,
}

impl BlockingBridge {
    pub fn new(sink: Box<dyn EnforcementSink>) -> Self {
        Self { sink, last: None }
    }

    pub fn last_payload(&self) -> Option<&BlockingSyncPayload> {
        self.last.as_ref()
    }

    /// Syncs if the derived payload differs from the last one handed over.
    /// Returns whether a sync was attempted.
    pub fn observe(&mut self, is_blocking: bool, sites: &[String]) -> bool {
        if self
            .last
            .as_ref()
            .is_some_and(|last| last.is_blocking == is_blocking && last.sites == sites)
        {
            return false;
        }
        let payload = BlockingSyncPayload {
            is_blocking,
            sites: sites.to_vec(),
        };
        match self.sink.sync(&payload) {
            Ok(()) => debug!(
                is_blocking,
                sites = payload.sites.len(),
                "Blocking state synced"
            ),
            Err(e) => warn!("Failed to sync blocking state: {}", e),
        }
        self.last = Some(payload);
        true
    }
}
