//! `rbnbot-relay`: turns the spot feed into short-lived channel messages.
//!
//! # Overview
//!
//! Lines from the supervised feed are parsed and rendered into the current
//! [`window::SpotAggregator`] window. On every publish tick the window is
//! taken, deduplicated by spotted call and sent as one rich message; the
//! returned handle lands in the [`registry::MessageRegistry`], which the
//! eviction tick drains oldest-first once messages outlive their TTL. A
//! slower legend tick posts an informational notice into the same registry.
//!
//! The platform itself sits behind [`sink::MessageSink`].

pub mod continent;
pub mod engine;
pub mod error;
pub mod registry;
pub mod sink;
pub mod stats;
pub mod window;

pub use continent::{ContinentResolver, PrefixTable};
pub use engine::{RelayEngine, RelayTasks};
pub use error::{Result, SinkError};
pub use registry::{EvictionReport, MessageRegistry};
pub use sink::MessageSink;
pub use stats::{RelayStats, StatsSnapshot};
pub use window::{FlushOutcome, FragmentTemplate, RenderedBatch, Sked, SpotAggregator};
