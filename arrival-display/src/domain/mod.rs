//! Domain types for the arrival display.
//!
//! Feed payloads are normalized into these types at the boundary, so
//! everything downstream works with validated, strongly typed data.

mod arrival;
mod snapshot;
mod urgency;

pub use arrival::{ArrivalEvent, ArrivalKey};
pub use snapshot::{DropCounts, Snapshot, SnapshotError};
pub use urgency::{InvalidThresholds, UrgencyThresholds, UrgencyTier};
