//! Inflo configuration management

use crate::error::{Error, Result};
use crate::tone::Tone;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main Inflo configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InfloConfig {
    /// Memory service configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Dashboard client configuration
    #[serde(default)]
    pub client: ClientConfig,

    /// Payment provider configuration
    #[serde(default)]
    pub payments: PaymentsConfig,

    /// Periodic tick configuration
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Tone classification rules
    #[serde(default)]
    pub tone: ToneConfig,
}

impl InfloConfig {
    /// Load and validate a TOML configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&raw).map_err(|e| {
            Error::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(Error::Config("server.host must be non-empty".to_string()));
        }
        if self.server.memory_cap == 0 || self.server.tolls_cap == 0 {
            return Err(Error::Config(
                "server.memory_cap and server.tolls_cap must be greater than zero".to_string(),
            ));
        }
        if self.server.max_limit == 0 || self.server.default_limit == 0 {
            return Err(Error::Config(
                "server.default_limit and server.max_limit must be greater than zero"
                    .to_string(),
            ));
        }
        if self.client.memory_cap == 0 {
            return Err(Error::Config(
                "client.memory_cap must be greater than zero".to_string(),
            ));
        }
        if self.client.device_id.trim().is_empty() {
            return Err(Error::Config("client.device_id must be non-empty".to_string()));
        }
        if self.schedule.sync_interval_secs == 0 || self.schedule.beam_interval_secs == 0 {
            return Err(Error::Config(
                "schedule intervals must be greater than zero".to_string(),
            ));
        }
        for rule in &self.tone.rules {
            regex::Regex::new(&rule.pattern).map_err(|e| {
                Error::Config(format!("Invalid tone pattern '{}': {}", rule.name, e))
            })?;
        }
        Ok(())
    }
}

/// Memory service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Allowed CORS origins (empty = any)
    pub cors_origins: Vec<String>,

    /// Directory holding `memory.json` and `tolls.json`
    pub data_dir: PathBuf,

    /// Maximum number of memory entries kept (oldest evicted first)
    pub memory_cap: usize,

    /// Maximum number of toll transactions kept
    pub tolls_cap: usize,

    /// Reflection text is truncated to this many characters
    pub max_text_len: usize,

    /// `GET /memory` default limit
    pub default_limit: usize,

    /// `GET /memory` upper bound on limit
    pub max_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            cors_origins: Vec::new(),
            data_dir: PathBuf::from("./data"),
            memory_cap: 5000,
            tolls_cap: 5000,
            max_text_len: 4000,
            default_limit: 50,
            max_limit: 500,
        }
    }
}

/// Dashboard client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Memory service base URL used until one is saved in client storage
    pub api_base: String,

    /// Identifier stamped on packets produced by this device
    pub device_id: String,

    /// JSON file backing the client key-value store
    pub state_file: PathBuf,

    /// Maximum number of local memory log entries
    pub memory_cap: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: "https://lucen17-backend.onrender.com".to_string(),
            device_id: crate::routing::LOCAL_DEVICE_ID.to_string(),
            state_file: default_state_file(),
            memory_cap: 5000,
        }
    }
}

/// Default client state file (~/.inflo/state.json)
pub fn default_state_file() -> PathBuf {
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".inflo")
        .join("state.json")
}

/// Payment provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentsConfig {
    /// Provider secret key; payments are simulated when absent
    pub secret_key: Option<String>,

    /// Provider API base URL
    pub api_base: String,

    /// Currency used when a request omits one
    pub default_currency: String,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            api_base: "https://api.stripe.com".to_string(),
            default_currency: "GBP".to_string(),
        }
    }
}

/// Periodic tick configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Background sync / dial breathing interval
    pub sync_interval_secs: u64,

    /// Mood beam recompute interval
    pub beam_interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            sync_interval_secs: 60,
            beam_interval_secs: 5,
        }
    }
}

/// Tone classification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToneConfig {
    /// Ordered rules; the first matching rule decides the tone
    pub rules: Vec<ToneRule>,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            rules: default_tone_rules(),
        }
    }
}

/// A keyword rule mapping matching text to a tone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToneRule {
    /// Rule name
    pub name: String,
    /// Regex pattern
    pub pattern: String,
    /// Tone assigned on match
    pub tone: Tone,
}

/// Default tone rules: directive vocabulary first, then creative
pub fn default_tone_rules() -> Vec<ToneRule> {
    vec![
        ToneRule {
            name: "directive".to_string(),
            pattern: r"(?i)(do|today|plan|next|ship|build|fix|schedule|deploy|commit|merge)"
                .to_string(),
            tone: Tone::Directive,
        },
        ToneRule {
            name: "creative".to_string(),
            pattern: r"(?i)(idea|imagine|design|create|vision|dream|invent|sketch)".to_string(),
            tone: Tone::Creative,
        },
    ]
}
