//! Dashboard mode and resonance dials
//!
//! Two dials, `rc` and `ge`, hold values in [0, 100]. In `Guidance` mode
//! they drift with the tone of each logged reflection and breathe by a
//! small random amount on every sync tick. `Creation` mode leaves them
//! alone and speeds up the beam.

use crate::error::Result;
use crate::storage::{keys, ClientStorage};
use crate::tone::Tone;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lowest dial value
pub const DIAL_MIN: f64 = 0.0;
/// Highest dial value
pub const DIAL_MAX: f64 = 100.0;
/// Value of a dial that was never set
pub const DIAL_DEFAULT: f64 = 50.0;

/// Dashboard mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Creation,
    #[default]
    Guidance,
}

impl Mode {
    /// Beam animation period
    pub fn beam_period(&self) -> Duration {
        match self {
            Self::Creation => Duration::from_millis(1500),
            Self::Guidance => Duration::from_secs(3),
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Creation => write!(f, "Creation"),
            Self::Guidance => write!(f, "Guidance"),
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Creation" => Ok(Self::Creation),
            "Guidance" => Ok(Self::Guidance),
            other => Err(format!("unknown mode: {}", other)),
        }
    }
}

/// Which dial
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dial {
    Rc,
    Ge,
}

/// Current dial values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dials {
    pub rc: f64,
    pub ge: f64,
}

impl Default for Dials {
    fn default() -> Self {
        Self {
            rc: DIAL_DEFAULT,
            ge: DIAL_DEFAULT,
        }
    }
}

fn clamp(value: f64) -> f64 {
    value.clamp(DIAL_MIN, DIAL_MAX)
}

impl Dials {
    /// Both dials clamped into range
    pub fn clamped(self) -> Self {
        Self {
            rc: clamp(self.rc),
            ge: clamp(self.ge),
        }
    }

    /// Value of one dial
    pub fn get(&self, dial: Dial) -> f64 {
        match dial {
            Dial::Rc => self.rc,
            Dial::Ge => self.ge,
        }
    }

    /// Drift after a reflection of `tone`; `jitter` in [-1, 1] is used
    /// for reflective text
    pub fn drift(self, tone: Tone, jitter: f64) -> Self {
        match tone {
            Tone::Creative => Self {
                rc: clamp(self.rc + 3.0),
                ge: clamp(self.ge + 2.0),
            },
            Tone::Directive => Self {
                rc: clamp(self.rc - 2.0),
                ge: clamp(self.ge - 1.0),
            },
            Tone::Reflective => Self {
                rc: clamp(self.rc + jitter),
                ge: self.ge,
            },
        }
    }

    /// Passive breathing on a sync tick
    pub fn breathe(self, rc_jitter: f64, ge_jitter: f64) -> Self {
        Self {
            rc: clamp(self.rc + rc_jitter),
            ge: clamp(self.ge + ge_jitter),
        }
    }
}

/// Random offset in [-1, 1]
pub fn jitter() -> f64 {
    rand::thread_rng().gen_range(-1.0..=1.0)
}

/// Saved mode; anything unrecognised reads as `Guidance`
pub async fn load_mode(storage: &ClientStorage) -> Mode {
    storage
        .get_string(keys::MODE)
        .await
        .and_then(|raw| raw.parse().ok())
        .unwrap_or_default()
}

pub async fn save_mode(storage: &ClientStorage, mode: Mode) -> Result<()> {
    storage.set_string(keys::MODE, mode.to_string()).await
}

/// Saved dials, falling back to the legacy keys and then the default
pub async fn load_dials(storage: &ClientStorage) -> Dials {
    let rc = match storage.read_f64(keys::DIAL_RC).await {
        Some(v) => v,
        None => storage
            .read_f64(keys::LEGACY_DIAL_RC)
            .await
            .unwrap_or(DIAL_DEFAULT),
    };
    let ge = match storage.read_f64(keys::DIAL_GE).await {
        Some(v) => v,
        None => storage
            .read_f64(keys::LEGACY_DIAL_GE)
            .await
            .unwrap_or(DIAL_DEFAULT),
    };
    Dials { rc, ge }.clamped()
}

pub async fn save_dials(storage: &ClientStorage, dials: Dials) -> Result<()> {
    let dials = dials.clamped();
    storage.set_string(keys::DIAL_RC, dials.rc.to_string()).await?;
    storage.set_string(keys::DIAL_GE, dials.ge.to_string()).await
}
