//! Memory service
//!
//! A small REST service that keeps reflections and toll transactions in
//! capped JSON files and brokers toll payments. See [`handler`] for the
//! endpoints.

pub mod handler;
pub mod payments;
pub mod store;

pub use handler::{memory_router, service_router, tolls_router};
pub use payments::{PaymentIntent, PaymentProvider, StripePayments};
pub use store::{JsonLog, MemoryStore, TollStore};

use crate::config::InfloConfig;
use crate::error::Result;
use crate::remote::GateInfo;
use crate::tone::ToneClassifier;
use std::sync::Arc;

/// Service name reported by `/health`
pub const SERVICE_NAME: &str = "lucen17-inflo";

/// Request limits applied by the memory endpoints
#[derive(Debug, Clone, Copy)]
pub struct MemoryLimits {
    pub max_text_len: usize,
    pub default_limit: usize,
    pub max_limit: usize,
}

/// Shared state of the memory service
#[derive(Clone)]
pub struct ServerState {
    pub memory: Arc<MemoryStore>,
    pub tolls: Arc<TollStore>,
    pub classifier: Arc<ToneClassifier>,
    pub payments: Option<Arc<dyn PaymentProvider>>,
    pub gates: Arc<Vec<GateInfo>>,
    pub limits: MemoryLimits,
    pub default_currency: String,
}

impl ServerState {
    /// Open the data files and build the state described by `config`
    pub async fn open(config: &InfloConfig) -> Result<Self> {
        let data_dir = &config.server.data_dir;
        let memory = MemoryStore::open(data_dir.join("memory.json"), config.server.memory_cap).await?;
        let tolls = TollStore::open(data_dir.join("tolls.json"), config.server.tolls_cap).await?;
        let classifier = ToneClassifier::new(config.tone.rules.clone())?;
        let payments = StripePayments::from_config(&config.payments)
            .map(|p| Arc::new(p) as Arc<dyn PaymentProvider>);

        let memory_len = memory.len().await;
        let tolls_len = tolls.len().await;
        tracing::info!(
            data_dir = %data_dir.display(),
            memory = memory_len,
            tolls = tolls_len,
            payments = if payments.is_some() { "live" } else { "simulated" },
            "Memory service state loaded"
        );

        Ok(Self {
            memory: Arc::new(memory),
            tolls: Arc::new(tolls),
            classifier: Arc::new(classifier),
            payments,
            gates: Arc::new(default_gates()),
            limits: MemoryLimits {
                max_text_len: config.server.max_text_len,
                default_limit: config.server.default_limit,
                max_limit: config.server.max_limit,
            },
            default_currency: config.payments.default_currency.clone(),
        })
    }
}

/// Gates offered by the service
pub fn default_gates() -> Vec<GateInfo> {
    [
        ("mindset", "MindSetFree", "Mind rhythm tools."),
        ("planmore", "PlanMore", "Plan resonance."),
        ("diet", "DietDiary", "Nutrition rhythm."),
        ("learn", "LearnLume", "Education flow."),
    ]
    .into_iter()
    .map(|(key, name, blurb)| GateInfo {
        key: key.to_string(),
        name: name.to_string(),
        toll: "free".to_string(),
        blurb: blurb.to_string(),
    })
    .collect()
}
