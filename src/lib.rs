//! Inflo - reflection logging core of the Lucen17 dashboard
//!
//! Inflo turns short reflections into routed packets. Each packet is
//! classified by tone, kept in a local memory log, optionally mirrored to a
//! remote memory service, and announced to companion apps (gates) over a
//! local notification bus. Apps can send packets back, and each journal
//! entry decides which of them it accepts.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────── dashboard ─────────────────────────────┐
//! │  log_reflection   dials / mode   divisions / beam   periodic ticks │
//! └───────┬───────────────────────────────────────────────▲────────────┘
//!         │                                               │ lucenReturn
//! ┌───────▼──────────────── routing ──────────────────────┴────────────┐
//! │  ToneClassifier ─► PacketDraft ─► Dispatcher      InboundAcceptor   │
//! │                                   │        │            │           │
//! │                          local log│        │lucenRoute  │ entry cfg │
//! └───────────────────────────────────┼────────┼────────────┼───────────┘
//!                                     │        ▼            │
//!                               storage    bus          remote (HTTP)
//!                                                           │
//!                                          ┌────────────────▼─────────┐
//!                                          │ server: /health /gates   │
//!                                          │ /memory /tolls /tolls/pay│
//!                                          └──────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`routing`]: packets, dispatch, inbound admission, flow index
//! - [`tone`]: rule-based tone classification
//! - [`storage`]: client key-value storage and the local memory log
//! - [`bus`]: local notification channel
//! - [`remote`]: memory service client
//! - [`server`]: memory and tolls REST service
//! - [`dashboard`]: reflection logging, dials, mood beam, ticks
//! - [`config`]: configuration management

pub mod api;
pub mod bus;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod remote;
pub mod routing;
pub mod server;
pub mod storage;
pub mod time;
pub mod tone;

pub use config::InfloConfig;
pub use dashboard::Dashboard;
pub use error::{Error, Result};
pub use tone::{Tone, ToneClassifier};
