//! ==============================================================================
//! ingest.rs - message handling seam between the transport and the state cell
//! ==============================================================================
//!
//! purpose:
//!     - MessageHandler: what a transport calls once per delivered message
//!     - Transport:      "subscribe(topic, handler)" - owns the delivery loop
//!     - Ingestor:       the handler that decodes, classifies and stores
//!
//! relationships:
//!     - implemented by: mqtt.rs (MqttTransport)
//!     - uses: domain.rs (Reading::decode, Snapshot::classified)
//!     - writes: state.rs (SnapshotCell::replace)
//!
//! failure policy:
//!     a payload that does not decode is logged and dropped. the cell keeps its
//!     previous snapshot and the delivery loop carries on.
//!
//! ==============================================================================

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::{DecodeError, Reading, Snapshot, Status};
use crate::state::SnapshotCell;

/// receives raw payloads from a transport
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn on_message(&self, topic: &str, payload: &[u8]);
}

/// a publish/subscribe source of messages
///
/// `subscribe` runs until the transport shuts down. connection retries are the
/// transport's business; the handler only ever sees delivered payloads.
#[async_trait]
pub trait Transport: Send {
    async fn subscribe(
        self,
        topic: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), TransportError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("mqtt client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    #[error("transport closed: {0}")]
    Closed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

// ==============================================================================
// ingestor
// ==============================================================================

pub struct Ingestor {
    cell: Arc<SnapshotCell>,
    show_sensor_data: bool,
}

impl Ingestor {
    pub fn new(cell: Arc<SnapshotCell>) -> Self {
        Self {
            cell,
            show_sensor_data: false,
        }
    }

    /// log every accepted reading at info instead of debug
    pub fn show_sensor_data(mut self, show: bool) -> Self {
        self.show_sensor_data = show;
        self
    }

    /// decode + classify + replace. exactly one replace per Ok, none per Err.
    pub async fn ingest(&self, payload: &[u8]) -> Result<Status, IngestError> {
        let reading = match Reading::decode(payload) {
            Ok(reading) => reading,
            Err(e) => {
                self.cell.record_rejected();
                return Err(e.into());
            }
        };

        let snapshot = Snapshot::classified(reading);
        let status = snapshot.status();
        self.log_reading(&snapshot);
        self.cell.replace(snapshot).await;
        Ok(status)
    }

    fn log_reading(&self, snapshot: &Snapshot) {
        let r = snapshot.reading();
        if self.show_sensor_data {
            info!(
                node = %r.node_id,
                status = %snapshot.status(),
                pressure_hpa = ?r.pressure_hpa,
                sky_temp_c = ?r.sky_temp_c,
                charge_v = ?r.charge_v,
                "reading received"
            );
        } else {
            debug!(node = %r.node_id, status = %snapshot.status(), "reading received");
        }
    }
}

#[async_trait]
impl MessageHandler for Ingestor {
    async fn on_message(&self, topic: &str, payload: &[u8]) {
        if let Err(e) = self.ingest(payload).await {
            warn!(
                topic,
                bytes = payload.len(),
                error = %e,
                "dropping malformed sensor message"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALERT_PAYLOAD: &[u8] = br#"{"node_id":"MD-01","pressure_hpa":950.5,"sky_temp_c":-15.2,"charge_v":850.0,"timestamp":1700000000.0}"#;

    #[tokio::test]
    async fn ingest_stores_classified_snapshot() {
        let cell = Arc::new(SnapshotCell::new());
        let ingestor = Ingestor::new(cell.clone());

        let status = ingestor.ingest(ALERT_PAYLOAD).await.unwrap();
        assert_eq!(status, Status::Alert);

        let snapshot = cell.read().await;
        assert_eq!(snapshot.status(), Status::Alert);
        assert_eq!(snapshot.reading().node_id, "MD-01");
        assert_eq!(snapshot.reading().pressure_hpa, Some(950.5));
        assert_eq!(snapshot.reading().timestamp, Some(1_700_000_000.0));
    }

    #[tokio::test]
    async fn malformed_payload_leaves_cell_untouched() {
        let cell = Arc::new(SnapshotCell::new());
        let ingestor = Ingestor::new(cell.clone());
        ingestor.ingest(ALERT_PAYLOAD).await.unwrap();
        let before = cell.read().await;

        let bad_payloads: [&[u8]; 5] = [b"not json", b"", br#"{"charge_v": "high"}"#, b"42", &[0xc3, 0x28]];
        for bad in bad_payloads {
            assert!(ingestor.ingest(bad).await.is_err());
        }

        assert_eq!(cell.read().await, before);
        assert_eq!(cell.stats().messages_accepted, 1);
        assert_eq!(cell.stats().messages_rejected, 5);
    }

    #[tokio::test]
    async fn handler_swallows_decode_errors() {
        let cell = Arc::new(SnapshotCell::new());
        let handler: Arc<dyn MessageHandler> = Arc::new(Ingestor::new(cell.clone()));

        handler.on_message("sih/project_cwarn/data", b"{{{").await;
        assert_eq!(cell.read().await, Snapshot::initial());

        handler.on_message("sih/project_cwarn/data", ALERT_PAYLOAD).await;
        assert_eq!(cell.read().await.status(), Status::Alert);
    }

    #[tokio::test]
    async fn null_pressure_is_dropped_not_defaulted() {
        let cell = Arc::new(SnapshotCell::new());
        let ingestor = Ingestor::new(cell.clone());
        ingestor.ingest(ALERT_PAYLOAD).await.unwrap();
        let before = cell.read().await;

        let result = ingestor
            .ingest(br#"{"node_id":"MD-01","pressure_hpa":null,"charge_v":900.0}"#)
            .await;

        assert!(matches!(result, Err(IngestError::Decode(_))));
        assert_eq!(cell.read().await, before);
        assert_eq!(cell.stats().messages_accepted, 1);
        assert_eq!(cell.stats().messages_rejected, 1);
    }

    #[tokio::test]
    async fn missing_numeric_fields_still_classify() {
        let cell = Arc::new(SnapshotCell::new());
        let ingestor = Ingestor::new(cell.clone()).show_sensor_data(true);

        let status = ingestor.ingest(br#"{"node_id":"MD-03"}"#).await.unwrap();

        assert_eq!(status, Status::Normal);
        let snapshot = cell.read().await;
        assert_eq!(snapshot.reading().pressure_hpa, None);
        assert_eq!(snapshot.reading().charge_v, None);
    }
}
