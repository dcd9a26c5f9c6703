//! Visual feedback sinks
//!
//! The routing core does not draw anything. It reports pulses and flow
//! index changes to an [`Indicators`] implementation, which a UI can render
//! and which the CLI logs.

use std::time::Duration;

/// Pulse flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pulse {
    /// Packet leaving the dashboard
    Outbound,
    /// Packet accepted from another app
    Inbound,
}

impl Pulse {
    /// Display color of the pulse
    pub fn color(&self) -> &'static str {
        match self {
            Self::Outbound => "green",
            Self::Inbound => "cyan",
        }
    }

    /// How long the pulse stays lit
    pub fn duration(&self) -> Duration {
        match self {
            Self::Outbound => Duration::from_millis(900),
            Self::Inbound => Duration::from_millis(1200),
        }
    }
}

/// An indicator dot
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Indicator {
    /// Core sync dot
    Core,
    /// Dot of a division
    Division(String),
    /// Dot of a gate, by gate key
    Gate(String),
}

impl std::fmt::Display for Indicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Core => write!(f, "core"),
            Self::Division(name) => write!(f, "division:{}", name),
            Self::Gate(key) => write!(f, "gate:{}", key),
        }
    }
}

/// Receiver of visual feedback
pub trait Indicators: Send + Sync {
    /// Light an indicator
    fn pulse(&self, indicator: &Indicator, pulse: Pulse);

    /// Show a freshly computed flow index
    fn flow_index(&self, value: u8);

    /// Recolor the mood beam
    fn beam(&self, _color: &str, _period: Duration) {}
}

/// Indicators that only emit tracing events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingIndicators;

impl Indicators for TracingIndicators {
    fn pulse(&self, indicator: &Indicator, pulse: Pulse) {
        tracing::debug!(
            indicator = %indicator,
            color = pulse.color(),
            duration_ms = pulse.duration().as_millis() as u64,
            "Pulse"
        );
    }

    fn flow_index(&self, value: u8) {
        tracing::info!(flow_index = %super::flow::format_flow_index(value), "Flow index updated");
    }

    fn beam(&self, color: &str, period: Duration) {
        tracing::debug!(color, period_ms = period.as_millis() as u64, "Beam");
    }
}
