//! Outbound dispatch
//!
//! Executes a packet's routing intent in a fixed order: local store, remote
//! store, gate notification, then the outbound pulse and a flow index
//! refresh. A failing remote never stops the later steps.

use super::context::RouteContext;
use super::indicators::Pulse;
use super::packet::Packet;
use crate::bus::{BusMessage, RouteNotice};
use crate::remote::BestEffort;

/// What a dispatch did
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    /// Whether the packet landed in the local log
    pub stored_local: bool,
    /// Remote result, when the packet asked for remote storage
    pub remote: Option<BestEffort>,
    /// Gate the notification was addressed to
    pub notified: Option<String>,
    /// Flow index after the dispatch
    pub flow_index: u8,
}

/// Executes outbound packets
#[derive(Clone)]
pub struct Dispatcher {
    ctx: RouteContext,
}

impl Dispatcher {
    pub fn new(ctx: RouteContext) -> Self {
        Self { ctx }
    }

    /// Route one packet produced for `entry`
    pub async fn dispatch(&self, packet: &Packet, entry: &str) -> DispatchOutcome {
        let division = packet.division_or_default();
        tracing::debug!(
            division,
            entry,
            store = %packet.store,
            show = %packet.show,
            "Dispatching packet"
        );

        let stored_local = packet.store.includes_local() && self.ctx.store_local(packet).await;

        let remote = if packet.store.includes_global() {
            Some(self.ctx.store_global(packet).await)
        } else {
            None
        };

        let notified = packet.show.gate().map(|gate| {
            self.ctx.bus.publish(BusMessage::Route(RouteNotice {
                packet: packet.clone(),
                notify: gate.to_string(),
            }));
            gate.to_string()
        });

        self.ctx.pulse(division, Pulse::Outbound);
        let flow_index = self.ctx.refresh_flow_index().await;

        DispatchOutcome {
            stored_local,
            remote,
            notified,
            flow_index,
        }
    }
}
