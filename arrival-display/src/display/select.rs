//! Primary arrival selection.
//!
//! Each cycle derives a [`DisplayState`] from the latest snapshot and the
//! previous display state. The sequence number only moves when the primary
//! arrival's identity changes, which is how the animation detects that a
//! different arrival is being shown.

use chrono::{DateTime, Duration, Utc};

use crate::domain::{ArrivalEvent, Snapshot, SnapshotError, UrgencyThresholds, UrgencyTier};

/// The arrival selected for display, with its urgency at selection time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryArrival {
    pub event: ArrivalEvent,
    pub tier: UrgencyTier,
}

/// What should currently be on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayState {
    sequence: u64,
    primary: Option<PrimaryArrival>,
    upcoming: Vec<ArrivalEvent>,
    as_of: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    fault: Option<SnapshotError>,
}

impl DisplayState {
    /// Monotonic counter bumped whenever the primary arrival changes.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn primary(&self) -> Option<&PrimaryArrival> {
        self.primary.as_ref()
    }

    pub fn tier(&self) -> Option<UrgencyTier> {
        self.primary.as_ref().map(|p| p.tier)
    }

    /// Arrivals following the primary, earliest first.
    pub fn upcoming(&self) -> &[ArrivalEvent] {
        &self.upcoming
    }

    /// Reference instant the state was computed against.
    pub fn as_of(&self) -> DateTime<Utc> {
        self.as_of
    }

    /// Capture instant of the snapshot the state was derived from.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Why there is no primary, if there is none.
    pub fn fault(&self) -> Option<SnapshotError> {
        self.fault
    }

    pub fn is_error(&self) -> bool {
        self.primary.is_none()
    }

    /// Whether moving from `shown` to `self` needs a visual transition.
    ///
    /// True when the primary changed identity, its tier changed, or the
    /// display enters or leaves the error state.
    pub fn is_change_from(&self, shown: &DisplayState) -> bool {
        self.sequence != shown.sequence
            || self.tier() != shown.tier()
            || self.is_error() != shown.is_error()
    }
}

/// Picks the primary arrival from each snapshot.
#[derive(Debug, Clone)]
pub struct PrimarySelector {
    thresholds: UrgencyThresholds,
    departed_grace: Duration,
    upcoming_count: usize,
}

impl PrimarySelector {
    pub fn new(
        thresholds: UrgencyThresholds,
        departed_grace: Duration,
        upcoming_count: usize,
    ) -> Self {
        Self {
            thresholds,
            departed_grace,
            upcoming_count,
        }
    }

    pub fn thresholds(&self) -> &UrgencyThresholds {
        &self.thresholds
    }

    /// Derive the display state for `snapshot` as seen from `now`.
    ///
    /// The primary is the earliest event that has not departed; events
    /// sharing an instant keep snapshot order. An erroneous or exhausted
    /// snapshot yields no primary.
    pub fn select(
        &self,
        snapshot: &Snapshot,
        previous: Option<&DisplayState>,
        now: DateTime<Utc>,
    ) -> DisplayState {
        let cutoff = now - self.departed_grace;
        let mut remaining = snapshot
            .events()
            .iter()
            .filter(|event| event.expected() >= cutoff);

        let primary = remaining.next().map(|event| PrimaryArrival {
            event: event.clone(),
            tier: self.thresholds.classify(now, event.expected()),
        });
        let upcoming = remaining.take(self.upcoming_count).cloned().collect();

        let fault = match (&primary, snapshot.error()) {
            (Some(_), _) => None,
            (None, Some(error)) => Some(error),
            (None, None) => Some(SnapshotError::NoData),
        };

        let previous_key = previous
            .and_then(DisplayState::primary)
            .map(|p| p.event.key());
        let current_key = primary.as_ref().map(|p| p.event.key());
        let previous_sequence = previous.map_or(0, DisplayState::sequence);

        let sequence = if previous_key != current_key {
            previous_sequence + 1
        } else {
            previous_sequence
        };

        DisplayState {
            sequence,
            primary,
            upcoming,
            as_of: now,
            updated_at: snapshot.captured_at(),
            fault,
        }
    }
}

impl Default for PrimarySelector {
    fn default() -> Self {
        Self::new(UrgencyThresholds::default(), Duration::seconds(60), 2)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::domain::DropCounts;
    use chrono::TimeZone;
    use proptest::prelude::*;

    proptest! {
        /// The primary is never later than any other non-departed event,
        /// and the sequence never goes backwards.
        #[test]
        fn primary_is_earliest_remaining(offsets in prop::collection::vec(-600i64..3600, 0..12)) {
            let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
            let events: Vec<_> = offsets
                .iter()
                .enumerate()
                .map(|(i, secs)| {
                    let at = now + Duration::seconds(*secs);
                    ArrivalEvent::new("L", "IB", format!("D{i}"), at, None)
                })
                .collect();
            let snap = Snapshot::new(now, events, DropCounts::default());
            let selector = PrimarySelector::default();

            let failed = Snapshot::failed(now, SnapshotError::NoData);
            let previous = selector.select(&failed, None, now);
            let state = selector.select(&snap, Some(&previous), now);
            prop_assert!(state.sequence() >= previous.sequence());

            let cutoff = now - Duration::seconds(60);
            let remaining: Vec<_> = snap
                .events()
                .iter()
                .filter(|e| e.expected() >= cutoff)
                .collect();

            match state.primary() {
                Some(primary) => {
                    for event in remaining {
                        prop_assert!(primary.event.expected() <= event.expected());
                    }
                }
                None => prop_assert!(remaining.is_empty()),
            }
        }
    }
}
