//! Urgency classification.
//!
//! An arrival's urgency is derived from how far away it is, never stored.
//! The tier drives the color an arrival is drawn in.

use std::fmt;

use chrono::{DateTime, Duration, Utc};

/// Discrete bucket derived from time-to-arrival.
///
/// Ordered from most to least urgent, so `Now < Imminent < Soon < Later`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UrgencyTier {
    /// Arriving or already late.
    Now,
    Imminent,
    Soon,
    Later,
}

impl UrgencyTier {
    /// All tiers, most urgent first.
    pub const ALL: [UrgencyTier; 4] = [
        UrgencyTier::Now,
        UrgencyTier::Imminent,
        UrgencyTier::Soon,
        UrgencyTier::Later,
    ];
}

impl fmt::Display for UrgencyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UrgencyTier::Now => "now",
            UrgencyTier::Imminent => "imminent",
            UrgencyTier::Soon => "soon",
            UrgencyTier::Later => "later",
        };
        f.write_str(name)
    }
}

/// Error returned when tier boundaries are not non-decreasing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("urgency thresholds must satisfy now <= imminent <= soon")]
pub struct InvalidThresholds;

/// Upper bounds (inclusive) of the first three tiers.
///
/// Anything beyond `soon` is [`UrgencyTier::Later`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UrgencyThresholds {
    now: Duration,
    imminent: Duration,
    soon: Duration,
}

impl UrgencyThresholds {
    /// Create thresholds, rejecting bounds that are out of order.
    pub fn new(
        now: Duration,
        imminent: Duration,
        soon: Duration,
    ) -> Result<Self, InvalidThresholds> {
        if now > imminent || imminent > soon {
            return Err(InvalidThresholds);
        }
        Ok(Self {
            now,
            imminent,
            soon,
        })
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn imminent(&self) -> Duration {
        self.imminent
    }

    pub fn soon(&self) -> Duration {
        self.soon
    }

    /// Classify an arrival expected at `expected` as seen from `now`.
    ///
    /// Total: a delta exactly on a boundary falls into the more urgent tier,
    /// and negative deltas (late feed) are [`UrgencyTier::Now`].
    pub fn classify(&self, now: DateTime<Utc>, expected: DateTime<Utc>) -> UrgencyTier {
        let delta = expected - now;
        if delta <= self.now {
            UrgencyTier::Now
        } else if delta <= self.imminent {
            UrgencyTier::Imminent
        } else if delta <= self.soon {
            UrgencyTier::Soon
        } else {
            UrgencyTier::Later
        }
    }
}

impl Default for UrgencyThresholds {
    fn default() -> Self {
        Self {
            now: Duration::zero(),
            imminent: Duration::minutes(2),
            soon: Duration::minutes(10),
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    proptest! {
        /// Moving an arrival later never makes it more urgent.
        #[test]
        fn classification_is_monotonic(a in -7200i64..7200, b in -7200i64..7200) {
            let th = UrgencyThresholds::default();
            let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
            let (early, late) = if a <= b { (a, b) } else { (b, a) };

            let early_tier = th.classify(now, now + Duration::seconds(early));
            let late_tier = th.classify(now, now + Duration::seconds(late));
            prop_assert!(early_tier <= late_tier);
        }

        /// Classification depends only on the delta, not the absolute instant.
        #[test]
        fn classification_is_shift_invariant(delta in -7200i64..7200, shift in 0i64..1_000_000) {
            let th = UrgencyThresholds::default();
            let base = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
            let shifted = base + Duration::seconds(shift);

            prop_assert_eq!(
                th.classify(base, base + Duration::seconds(delta)),
                th.classify(shifted, shifted + Duration::seconds(delta))
            );
        }
    }
}
