//! SIRI StopMonitoring response DTOs.
//!
//! These types map directly to the 511.org StopMonitoring JSON. They use
//! `Option` liberally because the feed omits fields rather than sending
//! nulls, and some fields come as either a single value or an array
//! depending on the producer.

use serde::Deserialize;

/// Top-level StopMonitoring document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StopMonitoringResponse {
    pub service_delivery: ServiceDelivery,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceDelivery {
    /// When this response was generated (RFC 3339).
    pub response_timestamp: Option<String>,

    /// Delivery for the monitored stop. 511.org sends an object; other SIRI
    /// producers send an array.
    pub stop_monitoring_delivery: Option<OneOrMany<StopMonitoringDelivery>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StopMonitoringDelivery {
    /// Raw visit records. Decoded one at a time so a single bad record
    /// does not reject the whole delivery.
    pub monitored_stop_visit: Option<Vec<serde_json::Value>>,
}

/// A vehicle visit at the monitored stop.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MonitoredStopVisit {
    pub monitored_vehicle_journey: MonitoredVehicleJourney,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MonitoredVehicleJourney {
    /// Line identifier (e.g. "L").
    pub line_ref: Option<String>,

    /// Direction identifier (e.g. "IB", "OB").
    pub direction_ref: Option<String>,

    /// Destination name(s).
    pub destination_name: Option<OneOrMany<String>>,

    /// Prediction for the monitored stop.
    pub monitored_call: Option<MonitoredCall>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MonitoredCall {
    /// Predicted arrival (RFC 3339).
    pub expected_arrival_time: Option<String>,

    /// Scheduled arrival (RFC 3339).
    pub aimed_arrival_time: Option<String>,
}

/// A field that may be a single value or an array of values.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(v) => vec![v],
            OneOrMany::Many(vs) => vs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_as_object_or_array() {
        let object = r#"{"ServiceDelivery":{"StopMonitoringDelivery":{"MonitoredStopVisit":[]}}}"#;
        let array = r#"{"ServiceDelivery":{"StopMonitoringDelivery":[{"MonitoredStopVisit":[]}]}}"#;

        for doc in [object, array] {
            let resp: StopMonitoringResponse = serde_json::from_str(doc).unwrap();
            let deliveries = resp.service_delivery.stop_monitoring_delivery.unwrap().into_vec();
            assert_eq!(deliveries.len(), 1);
        }
    }

    #[test]
    fn destination_as_string_or_array() {
        let json = r#"{
            "LineRef": "L",
            "DestinationName": ["Embarcadero", "Ferry Plaza"]
        }"#;
        let journey: MonitoredVehicleJourney = serde_json::from_str(json).unwrap();
        assert_eq!(journey.destination_name.unwrap().into_vec().len(), 2);

        let json = r#"{"LineRef": "L", "DestinationName": "SF Zoo"}"#;
        let journey: MonitoredVehicleJourney = serde_json::from_str(json).unwrap();
        assert_eq!(journey.destination_name.unwrap().into_vec(), vec!["SF Zoo"]);
        assert!(journey.monitored_call.is_none());
    }

    #[test]
    fn missing_service_delivery_is_rejected() {
        let result = serde_json::from_str::<StopMonitoringResponse>(r#"{"Siri": {}}"#);
        assert!(result.is_err());
    }
}
