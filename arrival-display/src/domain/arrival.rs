//! A single predicted arrival at the monitored stop.

use std::fmt;

use chrono::{DateTime, Utc};

/// One predicted vehicle arrival, as parsed from a feed snapshot.
///
/// Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrivalEvent {
    line: String,
    direction: String,
    destination: String,
    expected: DateTime<Utc>,
    aimed: Option<DateTime<Utc>>,
}

impl ArrivalEvent {
    /// Create a new arrival event.
    ///
    /// `aimed` is the scheduled arrival, when the feed supplies one.
    pub fn new(
        line: impl Into<String>,
        direction: impl Into<String>,
        destination: impl Into<String>,
        expected: DateTime<Utc>,
        aimed: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            line: line.into(),
            direction: direction.into(),
            destination: destination.into(),
            expected,
            aimed,
        }
    }

    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn direction(&self) -> &str {
        &self.direction
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Predicted arrival instant.
    pub fn expected(&self) -> DateTime<Utc> {
        self.expected
    }

    /// Scheduled arrival instant, if known.
    pub fn aimed(&self) -> Option<DateTime<Utc>> {
        self.aimed
    }

    /// Identity used to recognise the same vehicle across snapshots.
    ///
    /// Keyed on the scheduled instant when available, so a revised
    /// prediction does not make the arrival look like a different one.
    pub fn key(&self) -> ArrivalKey {
        ArrivalKey {
            line: self.line.clone(),
            direction: self.direction.clone(),
            destination: self.destination.clone(),
            instant: self.aimed.unwrap_or(self.expected),
        }
    }

    /// Whole minutes until arrival, rounded up, never negative.
    pub fn minutes_until(&self, now: DateTime<Utc>) -> i64 {
        let secs = (self.expected - now).num_seconds();
        if secs <= 0 { 0 } else { (secs + 59) / 60 }
    }
}

/// Identity of an arrival: line, direction, destination and original instant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArrivalKey {
    pub line: String,
    pub direction: String,
    pub destination: String,
    pub instant: DateTime<Utc>,
}

impl fmt::Display for ArrivalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} to {} @ {}",
            self.line,
            self.direction,
            self.destination,
            self.instant.format("%H:%M:%S")
        )
    }
}
