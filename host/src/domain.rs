//! ==============================================================================
//! domain.rs - telemetry data model
//! ==============================================================================
//!
//! purpose:
//!     the types that flow between the mqtt ingest path and the http read path.
//!
//!     - Reading:  one decoded sensor sample (what the node published)
//!     - Status:   the severity label derived from a reading
//!     - Snapshot: a reading paired with ITS status - the unit of shared state
//!
//! relationships:
//!     - used by: classifier.rs (reads pressure/charge)
//!     - used by: state.rs (stores one Snapshot)
//!     - used by: ingest.rs (decodes payloads into Readings)
//!     - used by: api.rs (serializes the Snapshot as the api response)
//!
//! ==============================================================================

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::classifier;

/// node id reported when the payload (or the initial state) has none
pub const UNKNOWN_NODE: &str = "N/A";

fn unknown_node() -> String {
    UNKNOWN_NODE.to_string()
}

/// a key that is present must hold a number; only a missing key becomes None
/// (via `#[serde(default)]`). an explicit null is a decode error.
fn present_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    f64::deserialize(deserializer).map(Some)
}

// ==============================================================================
// reading
// ==============================================================================
// numeric fields are Option so that "absent" and "present but zero" stay
// distinguishable. the classifier only substitutes its defaults for None.

/// one telemetry sample as published by a sensor node
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// originating node (e.g. "MD-01")
    #[serde(default = "unknown_node")]
    pub node_id: String,

    /// barometric pressure in hPa
    #[serde(
        default,
        deserialize_with = "present_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub pressure_hpa: Option<f64>,

    /// infrared sky temperature in celsius
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sky_temp_c: Option<f64>,

    /// atmospheric charge sensor voltage
    #[serde(
        default,
        deserialize_with = "present_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub charge_v: Option<f64>,

    /// producer-side emission time, seconds since epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

impl Reading {
    /// placeholder reading held before the first message arrives
    pub fn sentinel() -> Self {
        Self {
            node_id: unknown_node(),
            pressure_hpa: Some(0.0),
            sky_temp_c: Some(0.0),
            charge_v: Some(0.0),
            timestamp: None,
        }
    }

    /// decode a raw mqtt payload (utf-8 json object)
    ///
    /// extra keys are ignored, missing keys are tolerated. anything that is not
    /// a json object with correctly typed fields is rejected.
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let text = std::str::from_utf8(payload)?;
        Ok(serde_json::from_str(text)?)
    }
}

/// why a payload could not be turned into a Reading
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("payload is not valid utf-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("payload is not a valid reading: {0}")]
    Json(#[from] serde_json::Error),
}

// ==============================================================================
// status
// ==============================================================================

/// severity label shown on the dashboard
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// no reading has been received yet
    Initializing,
    Normal,
    Warning,
    Alert,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Initializing => "INITIALIZING",
            Status::Normal => "NORMAL",
            Status::Warning => "WARNING",
            Status::Alert => "ALERT",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==============================================================================
// snapshot
// ==============================================================================
// fields are private: the only ways to build a Snapshot are the initial
// sentinel and classified(), so a status can never be paired with a reading
// it was not derived from.

/// a reading together with the status derived from it
///
/// serializes flat: `{"node_id": .., "pressure_hpa": .., .., "status": ..}`
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Snapshot {
    #[serde(flatten)]
    reading: Reading,
    status: Status,
}

impl Snapshot {
    /// sentinel reading with status INITIALIZING
    pub fn initial() -> Self {
        Self {
            reading: Reading::sentinel(),
            status: Status::Initializing,
        }
    }

    /// classify `reading` and pair it with the result
    pub fn classified(reading: Reading) -> Self {
        let status = classifier::classify(&reading);
        Self { reading, status }
    }

    pub fn reading(&self) -> &Reading {
        &self.reading
    }

    pub fn status(&self) -> Status {
        self.status
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::initial()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_full_payload() {
        let payload = br#"{"node_id":"MD-01","pressure_hpa":950.5,"sky_temp_c":-15.2,"charge_v":850.0,"timestamp":1700000000.0}"#;
        let reading = Reading::decode(payload).unwrap();

        assert_eq!(reading.node_id, "MD-01");
        assert_eq!(reading.pressure_hpa, Some(950.5));
        assert_eq!(reading.sky_temp_c, Some(-15.2));
        assert_eq!(reading.charge_v, Some(850.0));
        assert_eq!(reading.timestamp, Some(1_700_000_000.0));
    }

    #[test]
    fn missing_fields_stay_absent() {
        let reading = Reading::decode(br#"{"sky_temp_c": 3}"#).unwrap();

        assert_eq!(reading.node_id, UNKNOWN_NODE);
        assert_eq!(reading.pressure_hpa, None);
        assert_eq!(reading.charge_v, None);
        assert_eq!(reading.timestamp, None);
        assert_eq!(reading.sky_temp_c, Some(3.0));
    }

    #[test]
    fn zero_is_not_absent() {
        let reading = Reading::decode(br#"{"pressure_hpa": 0, "charge_v": 0}"#).unwrap();
        assert_eq!(reading.pressure_hpa, Some(0.0));
        assert_eq!(reading.charge_v, Some(0.0));
    }

    #[test]
    fn null_classifier_inputs_are_rejected() {
        assert!(matches!(
            Reading::decode(br#"{"pressure_hpa":null,"charge_v":900}"#),
            Err(DecodeError::Json(_))
        ));
        assert!(matches!(
            Reading::decode(br#"{"pressure_hpa":950,"charge_v":null}"#),
            Err(DecodeError::Json(_))
        ));
    }

    #[test]
    fn extra_keys_are_ignored() {
        let reading =
            Reading::decode(br#"{"node_id":"MD-02","humidity":80,"firmware":"1.2"}"#).unwrap();
        assert_eq!(reading.node_id, "MD-02");
    }

    #[test]
    fn rejects_malformed_payloads() {
        assert!(matches!(Reading::decode(b"not json"), Err(DecodeError::Json(_))));
        assert!(matches!(Reading::decode(b"[1,2,3]"), Err(DecodeError::Json(_))));
        assert!(matches!(
            Reading::decode(br#"{"pressure_hpa":"low"}"#),
            Err(DecodeError::Json(_))
        ));
        assert!(matches!(Reading::decode(&[0xff, 0xfe, 0x7b]), Err(DecodeError::Utf8(_))));
    }

    #[test]
    fn initial_snapshot_serializes_zeroed() {
        let json = serde_json::to_value(Snapshot::initial()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "node_id": "N/A",
                "status": "INITIALIZING",
                "pressure_hpa": 0.0,
                "sky_temp_c": 0.0,
                "charge_v": 0.0,
            })
        );
    }

    #[test]
    fn classified_snapshot_carries_its_status() {
        let reading = Reading::decode(br#"{"pressure_hpa":975,"charge_v":900}"#).unwrap();
        let snapshot = Snapshot::classified(reading.clone());

        assert_eq!(snapshot.status(), Status::Alert);
        assert_eq!(snapshot.reading(), &reading);
    }
}
