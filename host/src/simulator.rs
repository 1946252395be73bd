//! ==============================================================================
//! simulator.rs - synthetic sensor node
//! ==============================================================================
//!
//! purpose:
//!     stands in for a field node when no hardware is deployed. every interval
//!     it synthesizes a reading around one of two weather profiles and
//!     publishes it as json on the sensor topic.
//!
//!     fair weather:  ~1012.3 hPa, ~12.5 C sky, ~110 V charge   -> NORMAL
//!     cloudburst:    ~950.5 hPa, ~-15.2 C sky, ~850 V charge   -> ALERT
//!
//! relationships:
//!     - uses: mqtt.rs (client construction)
//!     - uses: domain.rs (Reading is the wire format)
//!     - used by: main.rs (sensor role)
//!
//! ==============================================================================

use rand::Rng;
use rumqttc::{EventLoop, QoS};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

use crate::config::{MqttConfig, SimulatorConfig};
use crate::domain::Reading;
use crate::mqtt;

/// centre values and noise amplitudes for one kind of weather
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeatherProfile {
    pub pressure_hpa: f64,
    pub sky_temp_c: f64,
    pub charge_v: f64,
    pub pressure_jitter: f64,
    pub sky_temp_jitter: f64,
    pub charge_jitter: f64,
}

impl WeatherProfile {
    pub const FAIR: Self = Self {
        pressure_hpa: 1012.3,
        sky_temp_c: 12.5,
        charge_v: 110.0,
        pressure_jitter: 1.0,
        sky_temp_jitter: 1.0,
        charge_jitter: 5.0,
    };

    /// sharp pressure drop, cold sky, high atmospheric charge
    pub const CLOUDBURST: Self = Self {
        pressure_hpa: 950.5,
        sky_temp_c: -15.2,
        charge_v: 850.0,
        pressure_jitter: 1.0,
        sky_temp_jitter: 1.0,
        charge_jitter: 5.0,
    };

    pub fn for_config(config: &SimulatorConfig) -> Self {
        if config.trigger_cloudburst {
            Self::CLOUDBURST
        } else {
            Self::FAIR
        }
    }
}

/// one reading around `profile`, values rounded to two decimals
pub fn synthesize<R: Rng>(node_id: &str, profile: &WeatherProfile, rng: &mut R) -> Reading {
    Reading {
        node_id: node_id.to_string(),
        pressure_hpa: Some(jitter(rng, profile.pressure_hpa, profile.pressure_jitter)),
        sky_temp_c: Some(jitter(rng, profile.sky_temp_c, profile.sky_temp_jitter)),
        charge_v: Some(jitter(rng, profile.charge_v, profile.charge_jitter)),
        timestamp: Some(epoch_seconds()),
    }
}

fn jitter<R: Rng>(rng: &mut R, centre: f64, amplitude: f64) -> f64 {
    round2(centre + rng.random_range(-amplitude..=amplitude))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn epoch_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

/// publish forever. connection problems are logged, never fatal.
pub async fn run(mqtt_config: &MqttConfig, config: &SimulatorConfig) {
    let client_id = format!("sensor-{}", config.node_id);
    let (client, eventloop) = mqtt::client(mqtt_config, &client_id);
    let retry = Duration::from_secs(mqtt_config.retry_seconds);
    tokio::spawn(drive(eventloop, retry));

    let profile = WeatherProfile::for_config(config);
    info!(
        node = %config.node_id,
        topic = %mqtt_config.topic,
        cloudburst = config.trigger_cloudburst,
        "starting sensor simulation"
    );

    let mut ticker = tokio::time::interval(Duration::from_secs(config.interval_seconds));
    loop {
        ticker.tick().await;

        let reading = synthesize(&config.node_id, &profile, &mut rand::rng());
        let payload = match serde_json::to_vec(&reading) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "failed to encode reading");
                continue;
            }
        };

        // try_publish so a disconnected broker cannot stall the ticker
        match client.try_publish(&mqtt_config.topic, QoS::AtMostOnce, false, payload) {
            Ok(()) => info!(
                topic = %mqtt_config.topic,
                pressure_hpa = ?reading.pressure_hpa,
                sky_temp_c = ?reading.sky_temp_c,
                charge_v = ?reading.charge_v,
                "reading published"
            ),
            Err(e) => warn!(topic = %mqtt_config.topic, error = %e, "failed to publish reading"),
        }
    }
}

/// keep the client's event loop moving so publishes reach the broker
async fn drive(mut eventloop: EventLoop, retry: Duration) {
    loop {
        match eventloop.poll().await {
            Ok(event) => debug!(?event, "mqtt event"),
            Err(rumqttc::ConnectionError::RequestsDone) => break,
            Err(e) => {
                warn!(error = %e, retry_in = ?retry, "mqtt connection error");
                tokio::time::sleep(retry).await;
            }
        }
    }
}
