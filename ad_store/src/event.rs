//! The `AnomalyEvent` record and its JSON payload shape.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One dimension's contribution to a closed anomaly event, as it appears in
/// the event's `payload_json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionContribution {
    pub dimension_id: String,
    pub anomaly_rate: f64,
}

/// A single closed host-wide anomaly event, ready to append to an
/// [`crate::EventStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyEvent {
    pub detector_name: String,
    pub detector_version: i32,
    pub host_uuid: Uuid,
    pub after: i64,
    pub before: i64,
    /// Contributing dimensions, already filtered to `anomaly_rate >=
    /// ADUnitRateThreshold` and sorted descending by `anomaly_rate`.
    pub payload: Vec<DimensionContribution>,
}

impl AnomalyEvent {
    pub const DETECTOR_NAME: &'static str = "AD1";
    pub const DETECTOR_VERSION: i32 = 1;

    /// Build an event for the current detector name/version (hard-coded on
    /// insert; queries stay parameterized for forward compatibility).
    pub fn new(host_uuid: Uuid, after: i64, before: i64, payload: Vec<DimensionContribution>) -> Self {
        Self {
            detector_name: Self::DETECTOR_NAME.to_string(),
            detector_version: Self::DETECTOR_VERSION,
            host_uuid,
            after,
            before,
            payload,
        }
    }

    pub fn payload_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_serializes_as_array_of_objects() {
        let event = AnomalyEvent::new(
            Uuid::nil(),
            100,
            160,
            vec![
                DimensionContribution {
                    dimension_id: "system.cpu.user".to_string(),
                    anomaly_rate: 0.9,
                },
                DimensionContribution {
                    dimension_id: "system.net.received".to_string(),
                    anomaly_rate: 0.4,
                },
            ],
        );
        let json = event.payload_json().unwrap();
        assert!(json.starts_with('['));
        assert!(json.contains("system.cpu.user"));
    }
}
