//! Conversion from StopMonitoring payloads to snapshots.
//!
//! Parsing never fails the cycle: a bad record is dropped and counted,
//! an empty delivery becomes a "no data" snapshot, and a payload that is
//! not a StopMonitoring document becomes a "malformed" snapshot.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::domain::{ArrivalEvent, DropCounts, Snapshot, SnapshotError};

use super::types::{MonitoredStopVisit, StopMonitoringResponse};

/// Why a single visit record was dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntryError {
    #[error("missing line reference")]
    MissingLine,

    #[error("missing destination name")]
    MissingDestination,

    #[error("missing arrival time")]
    MissingTimestamp,

    #[error("invalid arrival time: {0}")]
    InvalidTimestamp(String),

    #[error("undecodable visit: {0}")]
    Undecodable(String),
}

/// Parse a raw payload into a snapshot.
///
/// The capture instant is the payload's `ResponseTimestamp` when present
/// and valid, otherwise `received_at`.
pub fn parse_snapshot(payload: &str, received_at: DateTime<Utc>) -> Snapshot {
    // 511.org prefixes its JSON with a byte-order mark.
    let payload = payload.trim_start_matches('\u{feff}');

    let response: StopMonitoringResponse = match serde_json::from_str(payload) {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "malformed feed payload");
            return Snapshot::failed(received_at, SnapshotError::Malformed);
        }
    };

    let delivery = response.service_delivery;
    let captured_at = delivery
        .response_timestamp
        .as_deref()
        .and_then(|ts| parse_instant(ts).ok())
        .unwrap_or(received_at);

    let visits = delivery
        .stop_monitoring_delivery
        .map(|d| d.into_vec())
        .unwrap_or_default()
        .into_iter()
        .flat_map(|d| d.monitored_stop_visit.unwrap_or_default());

    let mut events = Vec::new();
    let mut dropped = DropCounts::default();

    for visit in visits {
        match convert_visit(visit) {
            Ok(event) => events.push(event),
            Err(e) => {
                debug!(reason = %e, "dropping arrival record");
                record_drop(&mut dropped, &e);
            }
        }
    }

    if dropped.total() > 0 {
        debug!(
            kept = events.len(),
            dropped = dropped.total(),
            "parsed snapshot with dropped records"
        );
    }

    Snapshot::new(captured_at, events, dropped)
}

/// Convert one raw visit record to an arrival event.
pub fn convert_visit(visit: serde_json::Value) -> Result<ArrivalEvent, EntryError> {
    let visit: MonitoredStopVisit =
        serde_json::from_value(visit).map_err(|e| EntryError::Undecodable(e.to_string()))?;
    let journey = visit.monitored_vehicle_journey;

    let line = journey
        .line_ref
        .filter(|l| !l.trim().is_empty())
        .ok_or(EntryError::MissingLine)?;

    let destination = journey
        .destination_name
        .map(|d| {
            d.into_vec()
                .into_iter()
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect::<Vec<_>>()
                .join(" & ")
        })
        .filter(|name| !name.is_empty())
        .ok_or(EntryError::MissingDestination)?;

    let call = journey.monitored_call.ok_or(EntryError::MissingTimestamp)?;

    let aimed = call.aimed_arrival_time.as_deref().map(parse_instant);

    let (expected, aimed) = match call.expected_arrival_time.as_deref() {
        Some(ts) => {
            // A usable prediction survives a bad scheduled time.
            let aimed = aimed.and_then(|aimed| {
                aimed
                    .inspect_err(|e| debug!(reason = %e, "ignoring aimed arrival time"))
                    .ok()
            });
            (parse_instant(ts)?, aimed)
        }
        // Unmonitored vehicles only carry the scheduled time.
        None => {
            let aimed = aimed.ok_or(EntryError::MissingTimestamp)??;
            (aimed, Some(aimed))
        }
    };

    Ok(ArrivalEvent::new(
        line.trim(),
        journey.direction_ref.unwrap_or_default().trim(),
        destination,
        expected,
        aimed,
    ))
}

fn parse_instant(s: &str) -> Result<DateTime<Utc>, EntryError> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| EntryError::InvalidTimestamp(s.to_string()))
}

fn record_drop(counts: &mut DropCounts, err: &EntryError) {
    match err {
        EntryError::MissingLine => counts.missing_line += 1,
        EntryError::MissingDestination => counts.missing_destination += 1,
        EntryError::MissingTimestamp => counts.missing_timestamp += 1,
        EntryError::InvalidTimestamp(_) => counts.invalid_timestamp += 1,
        EntryError::Undecodable(_) => counts.undecodable += 1,
    }
}
