//! Arrival feed: wire DTOs, snapshot parsing, and payload sources.
//!
//! Two sources exist: the live 511.org StopMonitoring API and a file-backed
//! replay used for deterministic offline runs. Both produce the same
//! payload shape and go through the same parser.

mod client;
mod convert;
mod error;
mod replay;
mod types;

use std::future::Future;

use chrono::{DateTime, Utc};

pub use client::{DEFAULT_AGENCY, DEFAULT_BASE_URL, LiveFeedClient, LiveFeedConfig};
pub use convert::{EntryError, convert_visit, parse_snapshot};
pub use error::{FeedError, ReplayError};
pub use replay::{ReplaySource, TestEntry};
pub use types::{
    MonitoredCall, MonitoredStopVisit, MonitoredVehicleJourney, OneOrMany, ServiceDelivery,
    StopMonitoringDelivery, StopMonitoringResponse,
};

/// A raw feed document as handed to the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub body: String,
    /// When the payload was obtained.
    pub received_at: DateTime<Utc>,
    /// Replay index, for recorded payloads.
    pub entry: Option<usize>,
}

/// Trait for providing raw feed payloads.
///
/// This abstraction lets the scheduler run against the live API, a replay
/// file, or scripted payloads in tests.
pub trait FeedSource {
    /// Get the next payload, or `None` if nothing is available this cycle.
    fn next_payload(&mut self) -> impl Future<Output = Result<Option<Payload>, FeedError>> + Send;
}
