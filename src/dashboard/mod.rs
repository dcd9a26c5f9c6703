//! Dashboard core
//!
//! Everything the reflection dashboard does apart from drawing: logging
//! reflections, handling packets returned by apps, tracking the memory
//! service's availability, and keeping the mode, dials, division notes and
//! mood beam.
//!
//! ```text
//! log_reflection ──► ToneClassifier ──► Dispatcher ──► local log / remote
//!        │                                  │
//!        ├──► bridge state (lucenUpdate)    └──► pulses + flow index
//!        └──► dial drift + beam
//!
//! bus (lucenReturn) ──► handle_return ──► InboundAcceptor
//! ```

pub mod dials;
pub mod divisions;
pub mod scheduler;

pub use dials::{Dial, Dials, Mode};
pub use divisions::{
    beam_color, client_gates, gate_key, gate_keys_for_division, ClientGate, DivisionNotes,
    Divisions, CORE_DIVISION,
};
pub use scheduler::TickIntervals;

use crate::bus::{BridgeState, BusMessage, NotificationBus, ReturnPacket, Topic};
use crate::config::InfloConfig;
use crate::error::{Error, Result};
use crate::remote::{
    BestEffort, GateInfo, HttpRemote, MemoryItem, PaymentRequest, PaymentResponse, RemoteMemory,
};
use crate::routing::{
    flow, DispatchOutcome, Dispatcher, EntryConfig, EntryConfigResolver, InboundAcceptor,
    InboundOutcome, Indicator, Indicators, Packet, PacketDraft, Pulse, RouteContext, Scope,
};
use crate::storage::{keys, ClientStorage, LocalMemoryLog, MemoryLogEntry};
use crate::time::now_millis;
use crate::tone::{Tone, ToneClassifier};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Entry name of reflections typed into the main input
pub const REFLECTION_ENTRY: &str = "reflections";

/// Entry a returned packet is offered to when it names none
pub const RETURN_ENTRY: &str = "returns";

/// Number of remote reflections fetched for the global view
pub const GLOBAL_VIEW_LIMIT: usize = 200;

/// Toll paid when the caller names no amount
pub const DEFAULT_TOLL_AMOUNT: f64 = 3.0;

/// Which memory log the dashboard lists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryView {
    #[default]
    Local,
    Global,
}

impl std::fmt::Display for MemoryView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Global => write!(f, "global"),
        }
    }
}

impl std::str::FromStr for MemoryView {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "local" => Ok(Self::Local),
            "global" => Ok(Self::Global),
            other => Err(format!("unknown memory view: {}", other)),
        }
    }
}

/// A reflection as listed in the memory view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryCard {
    pub text: String,
    pub tone: Tone,
    pub ts: i64,
    pub color: &'static str,
}

impl From<MemoryLogEntry> for MemoryCard {
    fn from(entry: MemoryLogEntry) -> Self {
        Self {
            color: entry.tone.color(),
            text: entry.text,
            tone: entry.tone,
            ts: entry.ts,
        }
    }
}

impl From<MemoryItem> for MemoryCard {
    fn from(item: MemoryItem) -> Self {
        Self {
            color: item.tone.color(),
            text: item.text,
            tone: item.tone,
            ts: item.ts,
        }
    }
}

/// Result of logging one reflection
#[derive(Debug, Clone)]
pub struct ReflectionOutcome {
    pub packet: Packet,
    pub dispatch: DispatchOutcome,
    pub bridge: BridgeState,
    pub dials: Dials,
}

/// Result of a sync tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub online: bool,
    pub dials: Dials,
    pub flow_index: u8,
}

/// Dashboard state and operations
pub struct Dashboard {
    storage: ClientStorage,
    log: LocalMemoryLog,
    remote: HttpRemote,
    bus: NotificationBus,
    indicators: Arc<dyn Indicators>,
    classifier: ToneClassifier,
    resolver: EntryConfigResolver,
    dispatcher: Dispatcher,
    acceptor: InboundAcceptor,
    device_id: String,
    default_currency: String,
    online: AtomicBool,
    server_gates: RwLock<Vec<GateInfo>>,
    server_memory: RwLock<Vec<MemoryItem>>,
}

impl Dashboard {
    /// Build a dashboard over `storage`; the memory service URL saved in
    /// storage takes precedence over the configured one
    pub async fn open(
        config: &InfloConfig,
        storage: ClientStorage,
        bus: NotificationBus,
        indicators: Arc<dyn Indicators>,
    ) -> Result<Self> {
        let classifier = ToneClassifier::new(config.tone.rules.clone())?;
        let api_base = storage
            .get_string(keys::API_BASE)
            .await
            .filter(|base| !base.trim().is_empty())
            .unwrap_or_else(|| config.client.api_base.clone());
        let remote = HttpRemote::new(api_base);

        let log = LocalMemoryLog::new(storage.clone(), config.client.memory_cap);
        let resolver = EntryConfigResolver::new(storage.clone());
        let ctx = RouteContext::new(
            log.clone(),
            Arc::new(remote.clone()),
            bus.clone(),
            indicators.clone(),
        );
        let device_id = config.client.device_id.clone();

        Ok(Self {
            dispatcher: Dispatcher::new(ctx.clone()),
            acceptor: InboundAcceptor::new(resolver.clone(), ctx, device_id.clone()),
            storage,
            log,
            remote,
            bus,
            indicators,
            classifier,
            resolver,
            device_id,
            default_currency: config.payments.default_currency.clone(),
            online: AtomicBool::new(false),
            server_gates: RwLock::new(Vec::new()),
            server_memory: RwLock::new(Vec::new()),
        })
    }

    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    pub fn storage(&self) -> &ClientStorage {
        &self.storage
    }

    pub fn log(&self) -> &LocalMemoryLog {
        &self.log
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    // =========================================================================
    // Reflections and routed packets
    // =========================================================================

    /// Log a reflection typed by the user
    pub async fn log_reflection(
        &self,
        text: &str,
        division: Option<&str>,
    ) -> Result<ReflectionOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::Validation("Enter a reflection first.".to_string()));
        }
        let division = division
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(CORE_DIVISION)
            .to_string();
        let tone = self.classifier.classify(text);

        let packet = PacketDraft::new()
            .text(text)
            .tone(tone)
            .division(division.clone())
            .store(Scope::Both)
            .origin(self.device_id.clone())
            .build();
        let dispatch = self.dispatcher.dispatch(&packet, REFLECTION_ENTRY).await;
        if matches!(dispatch.remote, Some(BestEffort::Delivered(()))) {
            self.online.store(true, Ordering::Relaxed);
        }

        for key in gate_keys_for_division(&division) {
            self.indicators
                .pulse(&Indicator::Gate(key.to_string()), Pulse::Outbound);
        }

        let bridge = BridgeState {
            beam_color: self.current_beam_color().await.to_string(),
            last_reflection: text.to_string(),
            tone,
            division: division.clone(),
            ts: now_millis(),
        };
        if let Err(e) = self.storage.write_json(keys::BRIDGE_STATE, &bridge).await {
            tracing::warn!("Failed to save bridge state: {}", e);
        }
        self.bus.publish(BusMessage::Update(bridge.clone()));

        let dials = self.drift_dials(tone).await;
        self.beam_tick().await;

        tracing::info!(division = %division, tone = %tone, "Logged reflection");
        Ok(ReflectionOutcome {
            packet,
            dispatch,
            bridge,
            dials,
        })
    }

    /// Dispatch a packet on behalf of a journal entry; unset `store` and
    /// `show` come from the entry's outbound configuration
    pub async fn send_from_entry(
        &self,
        division: &str,
        entry: &str,
        mut draft: PacketDraft,
    ) -> DispatchOutcome {
        let config = self.resolver.read(division, entry).await;
        draft.division.get_or_insert_with(|| division.to_string());
        draft.store.get_or_insert(config.out_mode);
        draft.show.get_or_insert(config.out_target);
        if draft.origin.is_none() {
            draft = draft.origin(self.device_id.clone());
        }
        if draft.tone.is_none() {
            let tone = self.classifier.classify(draft.text.as_deref().unwrap_or_default());
            draft = draft.tone(tone);
        }
        self.dispatcher.dispatch(&draft.build(), entry).await
    }

    /// Offer a packet returned by an app to its entry.
    /// Returns without text are ignored and yield `None`.
    pub async fn handle_return(&self, ret: ReturnPacket) -> Option<InboundOutcome> {
        let has_text = ret
            .draft
            .text
            .as_deref()
            .map_or(false, |t| !t.trim().is_empty());
        if !has_text {
            tracing::debug!("Ignoring return without text");
            return None;
        }

        let entry = ret
            .entry
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| RETURN_ENTRY.to_string());
        let packet = ret.draft.build_received();
        let division = packet.division_or_default().to_string();

        let outcome = self.acceptor.accept(&packet, &division, &entry).await;
        if outcome.is_accepted() {
            if let Some(gate) = packet.gate.as_deref() {
                let key = gate_key(gate).unwrap_or(gate);
                self.indicators
                    .pulse(&Indicator::Gate(key.to_string()), Pulse::Inbound);
            }
        }
        self.beam_tick().await;
        Some(outcome)
    }

    /// Feed `lucenReturn` messages from the bus into [`Self::handle_return`]
    pub fn spawn_return_listener(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        let mut returns = self.bus.subscribe(Topic::Return);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    message = returns.recv() => match message {
                        Some(BusMessage::Return(ret)) => {
                            self.handle_return(ret).await;
                        }
                        Some(_) => {}
                        None => break,
                    }
                }
            }
        })
    }

    /// Recompute and display the flow index
    pub async fn flow_index(&self) -> u8 {
        let value = flow::compute(&self.log.entries().await);
        self.indicators.flow_index(value);
        value
    }

    // =========================================================================
    // Entry routing configuration
    // =========================================================================

    pub async fn route_config(&self, division: &str, entry: &str) -> EntryConfig {
        self.resolver.read(division, entry).await
    }

    pub async fn set_route_config(
        &self,
        division: &str,
        entry: &str,
        config: &EntryConfig,
    ) -> Result<()> {
        self.resolver.write(division, entry, config).await
    }

    // =========================================================================
    // Memory service
    // =========================================================================

    /// Memory service base URL in use
    pub async fn api_base(&self) -> String {
        self.remote.base().await
    }

    /// Save a new memory service URL and check it
    pub async fn save_api_base(&self, url: &str) -> Result<bool> {
        let url = url.trim();
        if url.is_empty() {
            return Err(Error::Validation("Enter API URL".to_string()));
        }
        self.storage.set_string(keys::API_BASE, url).await?;
        self.remote.set_base(url).await;
        tracing::info!(api_base = url, "Saved memory service URL");
        Ok(self.refresh_online().await)
    }

    /// Check the memory service; when it answers, refresh its gate list
    /// and recent memory
    pub async fn refresh_online(&self) -> bool {
        let online = match self.remote.health().await {
            Ok(health) if health.ok => {
                match self.remote.gates().await {
                    Ok(gates) => *self.server_gates.write().await = gates,
                    Err(e) => {
                        tracing::debug!("Gate list unavailable: {}", e);
                        self.server_gates.write().await.clear();
                    }
                }
                match self.remote.list_memory(GLOBAL_VIEW_LIMIT).await {
                    Ok(items) => *self.server_memory.write().await = items,
                    Err(e) => tracing::debug!("Server memory unavailable: {}", e),
                }
                true
            }
            Ok(_) => false,
            Err(e) => {
                tracing::debug!("Memory service unreachable: {}", e);
                false
            }
        };

        if self.online.swap(online, Ordering::Relaxed) != online {
            tracing::info!(online, "Memory service status changed");
        }
        online
    }

    /// Whether the memory service answered last time it was asked
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }

    /// Gates reported by the memory service on the last refresh
    pub async fn server_gates(&self) -> Vec<GateInfo> {
        self.server_gates.read().await.clone()
    }

    /// Memory fetched from the service on the last refresh
    pub async fn server_memory(&self) -> Vec<MemoryItem> {
        self.server_memory.read().await.clone()
    }

    /// Pay a toll (defaults: gate `core`, amount 3)
    pub async fn pay(&self, gate: Option<&str>, amount: Option<f64>) -> Result<PaymentResponse> {
        let request = PaymentRequest {
            gate: gate.unwrap_or(CORE_DIVISION).to_string(),
            amount: amount.unwrap_or(DEFAULT_TOLL_AMOUNT),
            currency: Some(self.default_currency.clone()),
            metadata: Default::default(),
        };
        let response = self.remote.pay(&request).await?;
        if response.simulated {
            tracing::info!(gate = %request.gate, "Simulated payment ok");
        } else if response.client_secret.is_some() {
            tracing::info!(gate = %request.gate, "Payment intent created");
        }
        Ok(response)
    }

    // =========================================================================
    // Memory view
    // =========================================================================

    pub async fn memory_view_mode(&self) -> MemoryView {
        self.storage
            .get_string(keys::MEMORY_VIEW)
            .await
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default()
    }

    pub async fn set_memory_view_mode(&self, view: MemoryView) -> Result<()> {
        self.storage
            .set_string(keys::MEMORY_VIEW, view.to_string())
            .await
    }

    /// Reflections to list, newest first, from the selected log.
    /// The global view is empty while the service is unreachable.
    pub async fn memory_view(&self) -> Vec<MemoryCard> {
        match self.memory_view_mode().await {
            MemoryView::Local => self
                .log
                .entries()
                .await
                .into_iter()
                .rev()
                .map(MemoryCard::from)
                .collect(),
            MemoryView::Global => match self.remote.recent(GLOBAL_VIEW_LIMIT).await {
                BestEffort::Delivered(items) => {
                    let mut cards: Vec<MemoryCard> = items
                        .into_iter()
                        .filter(|item| !item.text.is_empty())
                        .map(MemoryCard::from)
                        .collect();
                    cards.sort_by(|a, b| b.ts.cmp(&a.ts));
                    cards
                }
                BestEffort::Unreachable(_) => Vec::new(),
            },
        }
    }

    // =========================================================================
    // Mode, dials, divisions, beam
    // =========================================================================

    pub async fn mode(&self) -> Mode {
        dials::load_mode(&self.storage).await
    }

    pub async fn set_mode(&self, mode: Mode) -> Result<()> {
        dials::save_mode(&self.storage, mode).await?;
        self.beam_tick().await;
        Ok(())
    }

    pub async fn dials(&self) -> Dials {
        dials::load_dials(&self.storage).await
    }

    /// Set one dial (clamped to [0, 100])
    pub async fn set_dial(&self, dial: Dial, value: f64) -> Result<Dials> {
        let mut current = self.dials().await;
        match dial {
            Dial::Rc => current.rc = value,
            Dial::Ge => current.ge = value,
        }
        let current = current.clamped();
        dials::save_dials(&self.storage, current).await?;
        Ok(current)
    }

    async fn drift_dials(&self, tone: Tone) -> Dials {
        let current = self.dials().await;
        if self.mode().await != Mode::Guidance {
            return current;
        }
        let drifted = current.drift(tone, dials::jitter());
        if let Err(e) = dials::save_dials(&self.storage, drifted).await {
            tracing::warn!("Failed to save dials: {}", e);
        }
        drifted
    }

    pub async fn divisions(&self) -> Divisions {
        divisions::load_divisions(&self.storage).await
    }

    /// Replace one division's notes and recolor the beam
    pub async fn update_division(&self, division: &str, notes: DivisionNotes) -> Result<()> {
        let mut all = self.divisions().await;
        all.insert(division.to_string(), notes);
        divisions::save_divisions(&self.storage, &all).await?;
        self.beam_tick().await;
        Ok(())
    }

    async fn current_beam_color(&self) -> &'static str {
        beam_color(&self.divisions().await)
    }

    /// Recompute the beam color and show it at the mode's pace
    pub async fn beam_tick(&self) -> &'static str {
        let color = self.current_beam_color().await;
        let mode = self.mode().await;
        self.indicators.beam(color, mode.beam_period());
        color
    }

    /// Periodic background work: online check, dial breathing, flow index
    pub async fn sync_tick(&self) -> TickReport {
        let online = self.refresh_online().await;

        let mut dials = self.dials().await;
        if self.mode().await == Mode::Guidance {
            dials = dials.breathe(dials::jitter(), dials::jitter());
            if let Err(e) = dials::save_dials(&self.storage, dials).await {
                tracing::warn!("Failed to save dials: {}", e);
            }
        }

        let flow_index = self.flow_index().await;
        TickReport {
            online,
            dials,
            flow_index,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::api::build_app;
    use crate::routing::indicators::testing::RecordingIndicators;
    use crate::routing::{Rejection, SourceFilter, LOCAL_DEVICE_ID};
    use crate::server::ServerState;
    use std::time::Duration;
    use tempfile::TempDir;

    const UNREACHABLE: &str = "http://127.0.0.1:9";

    async fn dashboard_at(base: &str) -> (Dashboard, Arc<RecordingIndicators>) {
        let mut config = InfloConfig::default();
        config.client.api_base = base.to_string();
        let indicators = Arc::new(RecordingIndicators::default());
        let dashboard = Dashboard::open(
            &config,
            ClientStorage::in_memory(),
            NotificationBus::default(),
            indicators.clone(),
        )
        .await
        .unwrap();
        (dashboard, indicators)
    }

    pub(crate) async fn offline_dashboard() -> (Dashboard, Arc<RecordingIndicators>) {
        dashboard_at(UNREACHABLE).await
    }

    async fn spawn_service() -> (String, TempDir) {
        let dir = TempDir::new().unwrap();
        let mut config = InfloConfig::default();
        config.server.data_dir = dir.path().to_path_buf();
        let state = ServerState::open(&config).await.unwrap();
        let app = build_app(state, &[]);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), dir)
    }

    #[tokio::test]
    async fn test_log_reflection_rejects_empty() {
        let (dashboard, _) = offline_dashboard().await;
        let err = dashboard.log_reflection("   ", None).await.unwrap_err();
        assert!(matches!(err, Error::Validation(ref m) if m == "Enter a reflection first."));
        assert!(dashboard.log().is_empty().await);
    }

    #[tokio::test]
    async fn test_log_reflection_offline() {
        let (dashboard, indicators) = offline_dashboard().await;
        let mut updates = dashboard.bus().subscribe(Topic::Update);

        let outcome = dashboard
            .log_reflection("  sketch a new idea  ", Some("educationFlow"))
            .await
            .unwrap();

        assert_eq!(outcome.packet.text, "sketch a new idea");
        assert_eq!(outcome.packet.tone, Tone::Creative);
        assert_eq!(outcome.packet.store, Scope::Both);
        assert!(outcome.dispatch.stored_local);
        assert!(matches!(outcome.dispatch.remote, Some(BestEffort::Unreachable(_))));
        assert!(!dashboard.is_online());

        let entries = dashboard.log().entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(
            dashboard.log().checksum().await,
            Some(format!("1:{}", entries[0].ts))
        );

        let pulses = indicators.pulses();
        assert!(pulses.contains(&(Indicator::Gate("learn".to_string()), Pulse::Outbound)));
        assert!(pulses.contains(&(Indicator::Gate("teacheasy".to_string()), Pulse::Outbound)));

        match updates.try_recv() {
            Some(BusMessage::Update(state)) => {
                assert_eq!(state.last_reflection, "sketch a new idea");
                assert_eq!(state.division, "educationFlow");
                assert_eq!(state.beam_color, "#999");
            }
            other => panic!("expected bridge update, got {:?}", other),
        }
        let saved: BridgeState = dashboard
            .storage()
            .read_json(keys::BRIDGE_STATE)
            .await
            .unwrap();
        assert_eq!(saved, outcome.bridge);

        assert_eq!(outcome.dials, Dials { rc: 53.0, ge: 52.0 });
        assert_eq!(dashboard.dials().await, outcome.dials);
        assert_eq!(indicators.last_beam(), Some(("#999".to_string(), Duration::from_secs(3))));
    }

    #[tokio::test]
    async fn test_log_reflection_defaults_to_core() {
        let (dashboard, _) = offline_dashboard().await;
        let outcome = dashboard.log_reflection("quiet evening", None).await.unwrap();
        assert_eq!(outcome.packet.division.as_deref(), Some(CORE_DIVISION));
        assert_eq!(outcome.packet.tone, Tone::Reflective);
        assert_eq!(outcome.packet.device_id(), Some(LOCAL_DEVICE_ID));
    }

    #[tokio::test]
    async fn test_creation_mode_skips_drift() {
        let (dashboard, indicators) = offline_dashboard().await;
        dashboard.set_mode(Mode::Creation).await.unwrap();
        let outcome = dashboard.log_reflection("fix the fence today", None).await.unwrap();
        assert_eq!(outcome.packet.tone, Tone::Directive);
        assert_eq!(outcome.dials, Dials::default());
        assert_eq!(
            indicators.last_beam().unwrap().1,
            Duration::from_millis(1500)
        );
    }

    #[tokio::test]
    async fn test_handle_return() {
        let (dashboard, indicators) = offline_dashboard().await;
        let ret = ReturnPacket {
            draft: PacketDraft::new()
                .text("quiz done")
                .gate("LearnLume")
                .division("educationFlow"),
            entry: Some("Maths".to_string()),
        };

        let outcome = dashboard.handle_return(ret.clone()).await;
        assert_eq!(outcome, Some(InboundOutcome::Discarded(Rejection::Muted)));

        let route = |in_mode| EntryConfig {
            in_mode,
            in_source: SourceFilter::from("LearnLume"),
            ..Default::default()
        };
        dashboard
            .set_route_config("educationFlow", "Maths", &route(Scope::Local))
            .await
            .unwrap();
        // no origin: not produced here
        let outcome = dashboard.handle_return(ret.clone()).await;
        assert_eq!(outcome, Some(InboundOutcome::Discarded(Rejection::ScopeMismatch)));
        assert!(dashboard.log().is_empty().await);

        let own = ReturnPacket {
            draft: ret.draft.clone().origin(LOCAL_DEVICE_ID),
            entry: ret.entry.clone(),
        };
        assert!(dashboard.handle_return(own).await.unwrap().is_accepted());
        assert_eq!(dashboard.log().len().await, 1);

        dashboard
            .set_route_config("educationFlow", "Maths", &route(Scope::Both))
            .await
            .unwrap();
        let outcome = dashboard.handle_return(ret).await.unwrap();
        assert!(outcome.is_accepted());
        assert_eq!(dashboard.log().len().await, 2);
        assert!(indicators
            .pulses()
            .contains(&(Indicator::Gate("learn".to_string()), Pulse::Inbound)));

        let empty = ReturnPacket {
            draft: PacketDraft::new().gate("LearnLume"),
            entry: None,
        };
        assert!(dashboard.handle_return(empty).await.is_none());
    }

    #[tokio::test]
    async fn test_return_without_entry_uses_default_entry() {
        let (dashboard, _) = offline_dashboard().await;
        dashboard
            .set_route_config(
                crate::routing::DEFAULT_DIVISION,
                RETURN_ENTRY,
                &EntryConfig {
                    in_mode: Scope::Both,
                    in_source: SourceFilter::Any,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let ret = ReturnPacket {
            draft: PacketDraft::new().text("from an app").origin("phone"),
            entry: None,
        };
        let outcome = dashboard.handle_return(ret).await.unwrap();
        assert!(outcome.is_accepted());
    }

    #[tokio::test]
    async fn test_return_listener() {
        let (dashboard, _) = offline_dashboard().await;
        dashboard
            .set_route_config(
                "mindRhythm",
                "Evening",
                &EntryConfig {
                    in_mode: Scope::Both,
                    in_source: SourceFilter::Any,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let dashboard = Arc::new(dashboard);
        let shutdown = CancellationToken::new();
        let handle = dashboard.clone().spawn_return_listener(shutdown.clone());

        dashboard.bus().publish(BusMessage::Return(ReturnPacket {
            draft: PacketDraft::new().text("breathing done").division("mindRhythm"),
            entry: Some("Evening".to_string()),
        }));

        let mut stored = false;
        for _ in 0..50 {
            if dashboard.log().len().await == 1 {
                stored = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(stored);

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_send_from_entry_uses_outbound_config() {
        let (dashboard, _) = offline_dashboard().await;
        let mut routes = dashboard.bus().subscribe(Topic::Route);
        dashboard
            .set_route_config(
                "creativeOps",
                "Brand",
                &EntryConfig {
                    out_mode: Scope::Local,
                    out_target: "PlanMore".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let outcome = dashboard
            .send_from_entry("creativeOps", "Brand", PacketDraft::new().text("new logo idea"))
            .await;
        assert!(outcome.stored_local);
        assert!(outcome.remote.is_none());
        assert_eq!(outcome.notified.as_deref(), Some("PlanMore"));

        match routes.try_recv() {
            Some(BusMessage::Route(notice)) => {
                assert_eq!(notice.packet.division.as_deref(), Some("creativeOps"));
                assert_eq!(notice.packet.tone, Tone::Creative);
            }
            other => panic!("expected route notice, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_online_round_trip() {
        let (base, _dir) = spawn_service().await;
        let (dashboard, _) = dashboard_at(&base).await;

        assert!(dashboard.refresh_online().await);
        assert!(dashboard.is_online());
        assert_eq!(dashboard.server_gates().await.len(), 4);

        let outcome = dashboard.log_reflection("deploy the site", Some("businessLine")).await.unwrap();
        assert_eq!(outcome.dispatch.remote, Some(BestEffort::Delivered(())));

        dashboard.set_memory_view_mode(MemoryView::Global).await.unwrap();
        let cards = dashboard.memory_view().await;
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].text, "deploy the site");
        assert_eq!(cards[0].tone, Tone::Directive);
        assert_eq!(cards[0].color, "orange");

        dashboard.refresh_online().await;
        assert_eq!(dashboard.server_memory().await.len(), 1);

        let paid = dashboard.pay(Some("learn"), None).await.unwrap();
        assert!(paid.simulated);
    }

    #[tokio::test]
    async fn test_memory_views_offline() {
        let (dashboard, _) = offline_dashboard().await;
        assert_eq!(dashboard.memory_view_mode().await, MemoryView::Local);

        dashboard.log_reflection("first", None).await.unwrap();
        dashboard.log_reflection("second", None).await.unwrap();
        let cards = dashboard.memory_view().await;
        assert_eq!(cards[0].text, "second");
        assert_eq!(cards[1].text, "first");
        assert_eq!(cards[0].color, "blue");

        dashboard.set_memory_view_mode(MemoryView::Global).await.unwrap();
        assert!(dashboard.memory_view().await.is_empty());
        assert!(!dashboard.refresh_online().await);
        assert!(dashboard.pay(None, None).await.is_err());
    }

    #[tokio::test]
    async fn test_save_api_base() {
        let (base, _dir) = spawn_service().await;
        let (dashboard, _) = offline_dashboard().await;

        assert!(matches!(
            dashboard.save_api_base("  ").await,
            Err(Error::Validation(_))
        ));
        assert!(dashboard.save_api_base(&base).await.unwrap());
        assert_eq!(dashboard.api_base().await, base);
        assert_eq!(
            dashboard.storage().get_string(keys::API_BASE).await,
            Some(base.clone())
        );

        // a saved URL wins over the configured one
        let mut config = InfloConfig::default();
        config.client.api_base = UNREACHABLE.to_string();
        let reopened = Dashboard::open(
            &config,
            dashboard.storage().clone(),
            NotificationBus::default(),
            Arc::new(RecordingIndicators::default()),
        )
        .await
        .unwrap();
        assert_eq!(reopened.api_base().await, base);
    }

    #[tokio::test]
    async fn test_sync_tick_breathes() {
        let (dashboard, indicators) = offline_dashboard().await;
        let report = dashboard.sync_tick().await;
        assert!(!report.online);
        assert!((49.0..=51.0).contains(&report.dials.rc));
        assert!((49.0..=51.0).contains(&report.dials.ge));
        assert_eq!(report.flow_index, 0);
        assert_eq!(indicators.last_flow(), Some(0));

        dashboard.set_mode(Mode::Creation).await.unwrap();
        dashboard.set_dial(Dial::Rc, 10.0).await.unwrap();
        let report = dashboard.sync_tick().await;
        assert_eq!(report.dials.rc, 10.0);
    }

    #[tokio::test]
    async fn test_division_mood_recolors_beam() {
        let (dashboard, indicators) = offline_dashboard().await;
        assert_eq!(dashboard.beam_tick().await, "#999");

        dashboard
            .update_division(
                "fieldOps",
                DivisionNotes {
                    mood: "Energy high".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(indicators.last_beam().unwrap().0, "#ff6f61");
        assert_eq!(dashboard.divisions().await["fieldOps"].mood, "Energy high");

        let outcome = dashboard.log_reflection("note", None).await.unwrap();
        assert_eq!(outcome.bridge.beam_color, "#ff6f61");
    }

    #[tokio::test]
    async fn test_set_dial_clamps() {
        let (dashboard, _) = offline_dashboard().await;
        let dials = dashboard.set_dial(Dial::Ge, 250.0).await.unwrap();
        assert_eq!(dials.ge, 100.0);
        assert_eq!(dials.get(Dial::Rc), 50.0);
    }
}
