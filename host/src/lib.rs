//! ==============================================================================
//! cwarn-host - cloudburst early-warning hub
//! ==============================================================================
//!
//! a sensor node publishes pressure / sky temperature / atmospheric charge over
//! mqtt. the hub classifies each reading and keeps the latest one, with its
//! status, in a single shared cell that the dashboard api reads.
//!
//!     mqtt broker ──► MqttTransport ──► Ingestor ──► SnapshotCell ◄── api (axum)
//!                                       decode +       replace()     read()
//!                                       classify
//!
//! ==============================================================================

pub mod api;
pub mod classifier;
pub mod config;
pub mod domain;
pub mod ingest;
pub mod mqtt;
pub mod simulator;
pub mod state;
