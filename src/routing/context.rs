//! Shared collaborators of the dispatcher and the inbound acceptor

use super::flow;
use super::indicators::{Indicator, Indicators, Pulse};
use super::packet::Packet;
use crate::bus::NotificationBus;
use crate::remote::{BestEffort, NewMemory, RemoteMemory};
use crate::storage::LocalMemoryLog;
use std::sync::Arc;

/// Stores, channel and feedback sinks a routing action works against
#[derive(Clone)]
pub struct RouteContext {
    pub log: LocalMemoryLog,
    pub remote: Arc<dyn RemoteMemory>,
    pub bus: NotificationBus,
    pub indicators: Arc<dyn Indicators>,
}

impl RouteContext {
    pub fn new(
        log: LocalMemoryLog,
        remote: Arc<dyn RemoteMemory>,
        bus: NotificationBus,
        indicators: Arc<dyn Indicators>,
    ) -> Self {
        Self {
            log,
            remote,
            bus,
            indicators,
        }
    }

    /// Append the packet's projection to the local log.
    /// A failed write is logged and reported as `false`.
    pub async fn store_local(&self, packet: &Packet) -> bool {
        match self.log.append(packet.to_log_entry()).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to append to local memory log");
                false
            }
        }
    }

    /// Send the packet to the remote store; never fails
    pub async fn store_global(&self, packet: &Packet) -> BestEffort {
        self.remote.save(&remote_projection(packet)).await.discard()
    }

    /// Pulse the core indicator and one division
    pub fn pulse(&self, division: &str, pulse: Pulse) {
        self.indicators.pulse(&Indicator::Core, pulse);
        self.indicators
            .pulse(&Indicator::Division(division.to_string()), pulse);
    }

    /// Recompute the flow index from the local log and display it
    pub async fn refresh_flow_index(&self) -> u8 {
        let value = flow::compute(&self.log.entries().await);
        self.indicators.flow_index(value);
        value
    }
}

/// Body posted to the memory service for a packet
pub fn remote_projection(packet: &Packet) -> NewMemory {
    NewMemory {
        text: packet.text.clone(),
        tone: Some(packet.tone),
        ts: Some(packet.ts),
        device_id: packet.device_id().map(str::to_string),
        division: packet.division.clone(),
        location: None,
    }
}
