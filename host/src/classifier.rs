//! ==============================================================================
//! classifier.rs - rule-based severity classification
//! ==============================================================================
//!
//! purpose:
//!     maps a reading to NORMAL / WARNING / ALERT from pressure and charge.
//!     first matching rule wins:
//!
//!         pressure < 980  AND charge > 800  ->  ALERT
//!         pressure < 1000 AND charge > 500  ->  WARNING
//!         otherwise                         ->  NORMAL
//!
//!     a sharp pressure drop together with high atmospheric charge is the
//!     signature of an incoming cloudburst.
//!
//! relationships:
//!     - used by: domain.rs (Snapshot::classified)
//!
//! ==============================================================================

use crate::domain::{Reading, Status};

/// pressure assumed when a reading does not carry one (approx. sea level)
pub const DEFAULT_PRESSURE_HPA: f64 = 1012.0;
/// charge assumed when a reading does not carry one (fair-weather baseline)
pub const DEFAULT_CHARGE_V: f64 = 110.0;

pub const ALERT_PRESSURE_HPA: f64 = 980.0;
pub const ALERT_CHARGE_V: f64 = 800.0;
pub const WARNING_PRESSURE_HPA: f64 = 1000.0;
pub const WARNING_CHARGE_V: f64 = 500.0;

/// classify a reading. total and pure; never returns INITIALIZING.
pub fn classify(reading: &Reading) -> Status {
    let pressure = reading.pressure_hpa.unwrap_or(DEFAULT_PRESSURE_HPA);
    let charge = reading.charge_v.unwrap_or(DEFAULT_CHARGE_V);

    if pressure < ALERT_PRESSURE_HPA && charge > ALERT_CHARGE_V {
        Status::Alert
    } else if pressure < WARNING_PRESSURE_HPA && charge > WARNING_CHARGE_V {
        Status::Warning
    } else {
        Status::Normal
    }
}
