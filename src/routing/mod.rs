//! Packet routing core
//!
//! Packets are built by the factory in [`packet`], executed outbound by the
//! [`Dispatcher`], and admitted inbound by the [`InboundAcceptor`] according
//! to per-entry configuration from [`entry`]. Both paths finish by
//! refreshing the [`flow`] index.

pub mod context;
pub mod dispatcher;
pub mod entry;
pub mod flow;
pub mod inbound;
pub mod indicators;
pub mod packet;

pub use context::RouteContext;
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use entry::{EntryConfig, EntryConfigResolver, SourceFilter};
pub use inbound::{admit, InboundAcceptor, InboundOutcome, Rejection};
pub use indicators::{Indicator, Indicators, Pulse, TracingIndicators};
pub use packet::{
    GateTarget, Media, MediaKind, Origin, Packet, PacketDraft, PacketType, Scope,
    DEFAULT_DIVISION, LOCAL_DEVICE_ID,
};
