//! Feed snapshots: one normalized capture of arrival data.

use std::fmt;

use chrono::{DateTime, Utc};

use super::ArrivalEvent;

/// Why a snapshot carries no usable arrivals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotError {
    /// The payload was not valid structured data, or the fetch failed.
    Malformed,
    /// The payload parsed but held no usable arrivals.
    NoData,
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::Malformed => write!(f, "malformed"),
            SnapshotError::NoData => write!(f, "no data"),
        }
    }
}

/// Count of arrival records dropped while parsing, per reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DropCounts {
    pub missing_line: usize,
    pub missing_destination: usize,
    pub missing_timestamp: usize,
    pub invalid_timestamp: usize,
    /// Records whose shape could not be decoded at all.
    pub undecodable: usize,
}

impl DropCounts {
    pub fn total(&self) -> usize {
        self.missing_line
            + self.missing_destination
            + self.missing_timestamp
            + self.invalid_timestamp
            + self.undecodable
    }
}

/// An atomic capture of the feed at one instant.
///
/// Events are ordered by expected arrival, ascending; ties keep feed order.
/// Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    captured_at: DateTime<Utc>,
    events: Vec<ArrivalEvent>,
    error: Option<SnapshotError>,
    dropped: DropCounts,
}

impl Snapshot {
    /// Build a snapshot from parsed events.
    ///
    /// Sorts stably by expected arrival. An empty list marks the snapshot
    /// as [`SnapshotError::NoData`].
    pub fn new(
        captured_at: DateTime<Utc>,
        mut events: Vec<ArrivalEvent>,
        dropped: DropCounts,
    ) -> Self {
        events.sort_by_key(ArrivalEvent::expected);
        let error = events.is_empty().then_some(SnapshotError::NoData);
        Self {
            captured_at,
            events,
            error,
            dropped,
        }
    }

    /// A snapshot with no events, marked with `error`.
    pub fn failed(captured_at: DateTime<Utc>, error: SnapshotError) -> Self {
        Self {
            captured_at,
            events: Vec::new(),
            error: Some(error),
            dropped: DropCounts::default(),
        }
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Arrivals, earliest first.
    pub fn events(&self) -> &[ArrivalEvent] {
        &self.events
    }

    pub fn error(&self) -> Option<SnapshotError> {
        self.error
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn dropped(&self) -> DropCounts {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn event(dest: &str, mins: i64) -> ArrivalEvent {
        ArrivalEvent::new("L", "IB", dest, t0() + Duration::minutes(mins), None)
    }

    #[test]
    fn sorts_by_expected_keeping_ties_stable() {
        let snapshot = Snapshot::new(
            t0(),
            vec![event("C", 9), event("A", 3), event("B", 3)],
            DropCounts::default(),
        );

        let order: Vec<_> = snapshot.events().iter().map(|e| e.destination()).collect();
        assert_eq!(order, vec!["A", "B", "C"]);
        assert!(snapshot.is_ok());
    }

    #[test]
    fn empty_snapshot_is_no_data() {
        let snapshot = Snapshot::new(t0(), Vec::new(), DropCounts::default());
        assert_eq!(snapshot.error(), Some(SnapshotError::NoData));
    }

    #[test]
    fn failed_snapshot_has_no_events() {
        let snapshot = Snapshot::failed(t0(), SnapshotError::Malformed);
        assert!(snapshot.events().is_empty());
        assert_eq!(snapshot.error(), Some(SnapshotError::Malformed));
        assert_eq!(snapshot.error().unwrap().to_string(), "malformed");
    }

    #[test]
    fn drop_total() {
        let dropped = DropCounts {
            missing_destination: 2,
            invalid_timestamp: 1,
            ..DropCounts::default()
        };
        assert_eq!(dropped.total(), 3);
    }
}
