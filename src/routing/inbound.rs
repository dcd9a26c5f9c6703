//! Inbound acceptance
//!
//! Packets coming back from other apps are admitted per (division, entry)
//! by two independent checks. The scope check compares `in_mode` with where
//! the packet was produced: `Local` wants this device, `Global` wants any
//! other device, `Both` takes either. The source check compares
//! `in_source` with the packet's gate. A packet that names no origin
//! counts as foreign. A muted entry (`in_mode = None`) discards before
//! either check runs.

use super::context::RouteContext;
use super::entry::{EntryConfig, EntryConfigResolver, SourceFilter};
use super::indicators::Pulse;
use super::packet::{Packet, Scope};
use crate::remote::BestEffort;

/// Why an inbound packet was discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Entry does not accept inbound packets
    Muted,
    /// Packet origin does not fit the entry's inbound mode
    ScopeMismatch,
    /// Packet gate does not fit the entry's inbound source
    SourceMismatch,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Muted => write!(f, "muted"),
            Self::ScopeMismatch => write!(f, "scope mismatch"),
            Self::SourceMismatch => write!(f, "source mismatch"),
        }
    }
}

/// Admission decision for `packet` under `config`
pub fn admit(
    config: &EntryConfig,
    packet: &Packet,
    local_device_id: &str,
) -> Result<(), Rejection> {
    let same_device = packet.device_id() == Some(local_device_id);

    let allow_scope = match config.in_mode {
        Scope::None => return Err(Rejection::Muted),
        Scope::Both => true,
        Scope::Local => same_device,
        Scope::Global => !same_device,
    };
    if !allow_scope {
        return Err(Rejection::ScopeMismatch);
    }

    let allow_source = match &config.in_source {
        SourceFilter::None => false,
        SourceFilter::Any => true,
        SourceFilter::Gate(gate) => packet.gate.as_deref() == Some(gate.as_str()),
    };
    if !allow_source {
        return Err(Rejection::SourceMismatch);
    }

    Ok(())
}

/// What an inbound packet led to
#[derive(Debug, Clone, PartialEq)]
pub enum InboundOutcome {
    /// Nothing happened
    Discarded(Rejection),
    /// Packet was stored per the entry's inbound mode
    Accepted {
        stored_local: bool,
        remote: Option<BestEffort>,
        flow_index: u8,
    },
}

impl InboundOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// Admits packets from other apps into a division's entries
#[derive(Clone)]
pub struct InboundAcceptor {
    resolver: EntryConfigResolver,
    ctx: RouteContext,
    local_device_id: String,
}

impl InboundAcceptor {
    pub fn new(
        resolver: EntryConfigResolver,
        ctx: RouteContext,
        local_device_id: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            ctx,
            local_device_id: local_device_id.into(),
        }
    }

    /// Offer `packet` to (`division`, `entry`)
    pub async fn accept(&self, packet: &Packet, division: &str, entry: &str) -> InboundOutcome {
        let config = self.resolver.read(division, entry).await;

        if let Err(rejection) = admit(&config, packet, &self.local_device_id) {
            tracing::debug!(
                division,
                entry,
                origin = packet.device_id().unwrap_or("-"),
                gate = packet.gate.as_deref().unwrap_or("-"),
                reason = %rejection,
                "Discarded inbound packet"
            );
            return InboundOutcome::Discarded(rejection);
        }

        let stored_local = config.in_mode.includes_local() && self.ctx.store_local(packet).await;
        let remote = if config.in_mode.includes_global() {
            Some(self.ctx.store_global(packet).await)
        } else {
            None
        };

        self.ctx.pulse(division, Pulse::Inbound);
        let flow_index = self.ctx.refresh_flow_index().await;

        tracing::info!(division, entry, in_mode = %config.in_mode, "Accepted inbound packet");
        InboundOutcome::Accepted {
            stored_local,
            remote,
            flow_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::NotificationBus;
    use crate::remote::testing::RecordingRemote;
    use crate::remote::OfflineRemote;
    use crate::routing::indicators::testing::RecordingIndicators;
    use crate::routing::indicators::Indicator;
    use crate::routing::packet::{PacketDraft, LOCAL_DEVICE_ID};
    use crate::storage::{ClientStorage, LocalMemoryLog};
    use std::sync::Arc;

    const SCOPES: [Scope; 4] = [Scope::None, Scope::Local, Scope::Global, Scope::Both];

    fn sources() -> [SourceFilter; 4] {
        [
            SourceFilter::None,
            SourceFilter::Any,
            SourceFilter::Gate("LearnLume".to_string()),
            SourceFilter::Gate("PlanMore".to_string()),
        ]
    }

    fn local_packet() -> Packet {
        PacketDraft::new().text("quiz").gate("LearnLume").build()
    }

    fn unknown_origin_packet() -> Packet {
        PacketDraft::new().text("quiz").gate("LearnLume").build_received()
    }

    fn remote_packet() -> Packet {
        PacketDraft::new()
            .text("quiz")
            .gate("LearnLume")
            .origin("learnlume-web")
            .build()
    }

    fn config(in_mode: Scope, in_source: SourceFilter) -> EntryConfig {
        EntryConfig {
            in_mode,
            in_source,
            ..Default::default()
        }
    }

    /// Reference decision written out longhand
    fn expected(in_mode: Scope, in_source: &SourceFilter, packet: &Packet) -> bool {
        let same_device = packet.device_id() == Some(LOCAL_DEVICE_ID);
        let scope = match in_mode {
            Scope::None => return false,
            Scope::Both => true,
            Scope::Local => same_device,
            Scope::Global => !same_device,
        };
        let source = match in_source {
            SourceFilter::None => false,
            SourceFilter::Any => true,
            SourceFilter::Gate(g) => packet.gate.as_deref() == Some(g.as_str()),
        };
        scope && source
    }

    #[test]
    fn test_truth_table() {
        for packet in [local_packet(), remote_packet(), unknown_origin_packet()] {
            for in_mode in SCOPES {
                for in_source in sources() {
                    let decision = admit(&config(in_mode, in_source.clone()), &packet, LOCAL_DEVICE_ID);
                    assert_eq!(
                        decision.is_ok(),
                        expected(in_mode, &in_source, &packet),
                        "in_mode={} in_source={} origin={:?}",
                        in_mode,
                        in_source,
                        packet.device_id()
                    );
                    if in_mode == Scope::None {
                        assert_eq!(decision, Err(Rejection::Muted));
                    }
                }
            }
        }
    }

    #[test]
    fn test_named_cases() {
        let local = local_packet();
        assert!(admit(&config(Scope::Local, SourceFilter::Any), &local, LOCAL_DEVICE_ID).is_ok());
        assert_eq!(
            admit(&config(Scope::Global, SourceFilter::Any), &local, LOCAL_DEVICE_ID),
            Err(Rejection::ScopeMismatch)
        );
        assert_eq!(
            admit(&config(Scope::Both, SourceFilter::None), &local, LOCAL_DEVICE_ID),
            Err(Rejection::SourceMismatch)
        );
        assert!(admit(
            &config(Scope::Both, SourceFilter::from("LearnLume")),
            &local,
            LOCAL_DEVICE_ID
        )
        .is_ok());
        assert_eq!(
            admit(&config(Scope::None, SourceFilter::Any), &local, LOCAL_DEVICE_ID),
            Err(Rejection::Muted)
        );
    }

    #[test]
    fn test_unknown_origin_is_foreign() {
        let packet = unknown_origin_packet();
        assert_eq!(
            admit(&config(Scope::Local, SourceFilter::Any), &packet, LOCAL_DEVICE_ID),
            Err(Rejection::ScopeMismatch)
        );
        assert!(admit(&config(Scope::Global, SourceFilter::Any), &packet, LOCAL_DEVICE_ID).is_ok());
        assert!(admit(&config(Scope::Both, SourceFilter::Any), &packet, "kitchen-tablet").is_ok());
    }

    #[test]
    fn test_configured_device_id() {
        let packet = PacketDraft::new().gate("LearnLume").origin("kitchen-tablet").build();
        let cfg = config(Scope::Local, SourceFilter::Any);
        assert!(admit(&cfg, &packet, "kitchen-tablet").is_ok());
        assert!(admit(&cfg, &packet, LOCAL_DEVICE_ID).is_err());
    }

    struct Harness {
        acceptor: InboundAcceptor,
        resolver: EntryConfigResolver,
        log: LocalMemoryLog,
        indicators: Arc<RecordingIndicators>,
    }

    fn harness(remote: Arc<dyn crate::remote::RemoteMemory>) -> Harness {
        let storage = ClientStorage::in_memory();
        let log = LocalMemoryLog::new(storage.clone(), 5000);
        let resolver = EntryConfigResolver::new(storage);
        let indicators = Arc::new(RecordingIndicators::default());
        let ctx = RouteContext::new(
            log.clone(),
            remote,
            NotificationBus::default(),
            indicators.clone(),
        );
        Harness {
            acceptor: InboundAcceptor::new(resolver.clone(), ctx, LOCAL_DEVICE_ID),
            resolver,
            log,
            indicators,
        }
    }

    #[tokio::test]
    async fn test_unconfigured_entry_discards() {
        let h = harness(Arc::new(OfflineRemote));
        let outcome = h.acceptor.accept(&local_packet(), "educationFlow", "Maths").await;
        assert_eq!(outcome, InboundOutcome::Discarded(Rejection::Muted));
        assert!(h.log.is_empty().await);
        assert!(h.indicators.pulses().is_empty());
        assert!(h.indicators.last_flow().is_none());
    }

    #[tokio::test]
    async fn test_accept_both_stores_everywhere_and_pulses_inbound() {
        let remote = Arc::new(RecordingRemote::default());
        let h = harness(remote.clone());
        h.resolver
            .write(
                "educationFlow",
                "Maths",
                &config(Scope::Both, SourceFilter::from("LearnLume")),
            )
            .await
            .unwrap();

        let outcome = h.acceptor.accept(&remote_packet(), "educationFlow", "Maths").await;
        match outcome {
            InboundOutcome::Accepted {
                stored_local,
                remote: Some(BestEffort::Delivered(())),
                flow_index,
            } => {
                assert!(stored_local);
                assert!(flow_index > 0);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(h.log.len().await, 1);
        assert_eq!(remote.saved().len(), 1);
        assert_eq!(
            h.indicators.pulses(),
            vec![
                (Indicator::Core, Pulse::Inbound),
                (Indicator::Division("educationFlow".to_string()), Pulse::Inbound),
            ]
        );
    }

    #[tokio::test]
    async fn test_accept_global_only_skips_local_log() {
        let h = harness(Arc::new(OfflineRemote));
        h.resolver
            .write("fieldOps", "Harvest", &config(Scope::Global, SourceFilter::Any))
            .await
            .unwrap();

        let outcome = h.acceptor.accept(&remote_packet(), "fieldOps", "Harvest").await;
        assert_eq!(
            outcome,
            InboundOutcome::Accepted {
                stored_local: false,
                remote: Some(BestEffort::Unreachable("offline".to_string())),
                flow_index: 0,
            }
        );
        assert!(h.log.is_empty().await);
    }

    #[tokio::test]
    async fn test_both_with_source_none_discards() {
        let h = harness(Arc::new(OfflineRemote));
        h.resolver
            .write("mindRhythm", "Evening", &config(Scope::Both, SourceFilter::None))
            .await
            .unwrap();
        let outcome = h.acceptor.accept(&local_packet(), "mindRhythm", "Evening").await;
        assert_eq!(outcome, InboundOutcome::Discarded(Rejection::SourceMismatch));
        assert!(!outcome.is_accepted());
    }
}
