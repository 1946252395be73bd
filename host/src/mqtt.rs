//! ==============================================================================
//! mqtt.rs - mqtt transport for the hub
//! ==============================================================================
//!
//! purpose:
//!     implements ingest::Transport on top of rumqttc. the event loop is polled
//!     here; each incoming PUBLISH is handed to the MessageHandler.
//!
//! connection lifecycle:
//!     rumqttc connects lazily on the first poll and reconnects on the next poll
//!     after an error. we only pause between polls so a dead broker does not
//!     spin the loop, and resubscribe on every CONNACK because a clean session
//!     forgets subscriptions.
//!
//! relationships:
//!     - implements: ingest.rs (Transport)
//!     - used by: main.rs (hub role), simulator.rs (options)
//!
//! ==============================================================================

use async_trait::async_trait;
use rumqttc::{AsyncClient, ClientError, ConnectionError, Event, EventLoop, MqttOptions, Packet, QoS};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::MqttConfig;
use crate::ingest::{MessageHandler, Transport, TransportError};

/// capacity of the client -> event loop request channel
const REQUEST_CAPACITY: usize = 10;

/// mqtt v3.1.1 options for `client_id` against the configured broker
pub fn options(config: &MqttConfig, client_id: &str) -> MqttOptions {
    let mut options = MqttOptions::new(client_id, &config.broker_host, config.broker_port);
    options.set_keep_alive(Duration::from_secs(config.keep_alive_seconds));
    options
}

/// create a client and its (not yet polled) event loop
pub fn client(config: &MqttConfig, client_id: &str) -> (AsyncClient, EventLoop) {
    AsyncClient::new(options(config, client_id), REQUEST_CAPACITY)
}

/// queue a subscribe without blocking the event loop that would drain it
fn request_subscription(client: &AsyncClient, topic: &str) -> Result<(), ClientError> {
    client.try_subscribe(topic, QoS::AtMostOnce)
}

pub struct MqttTransport {
    client: AsyncClient,
    eventloop: EventLoop,
    broker: String,
    retry: Duration,
}

impl MqttTransport {
    pub fn new(config: &MqttConfig) -> Self {
        let (client, eventloop) = client(config, &config.client_id);
        Self {
            client,
            eventloop,
            broker: format!("{}:{}", config.broker_host, config.broker_port),
            retry: Duration::from_secs(config.retry_seconds),
        }
    }
}

#[async_trait]
impl Transport for MqttTransport {
    async fn subscribe(
        mut self,
        topic: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), TransportError> {
        info!(broker = %self.broker, topic, "connecting to mqtt broker");

        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!(broker = %self.broker, "connected to mqtt broker");
                    if let Err(e) = request_subscription(&self.client, topic) {
                        // retried on the next connack
                        warn!(topic, error = %e, "failed to request subscription");
                    }
                }
                Ok(Event::Incoming(Packet::SubAck(_))) => {
                    info!(topic, "subscribed");
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    handler.on_message(&publish.topic, &publish.payload).await;
                }
                Ok(event) => {
                    debug!(?event, "mqtt event");
                }
                Err(e) => match recovery_for(&e) {
                    Recovery::Stop => {
                        return Err(TransportError::Closed(e.to_string()));
                    }
                    Recovery::Retry => {
                        if let ConnectionError::ConnectionRefused(code) = &e {
                            warn!(broker = %self.broker, ?code, retry_in = ?self.retry, "broker refused connection");
                        } else {
                            warn!(broker = %self.broker, error = %e, retry_in = ?self.retry, "mqtt connection error");
                        }
                        tokio::time::sleep(self.retry).await;
                    }
                },
            }
        }
    }
}

/// what the delivery loop does after a failed poll
#[derive(Debug, PartialEq, Eq)]
enum Recovery {
    /// every client handle is gone, nothing can be delivered again
    Stop,
    /// rumqttc reconnects on the next poll
    Retry,
}

fn recovery_for(error: &ConnectionError) -> Recovery {
    match error {
        ConnectionError::RequestsDone => Recovery::Stop,
        _ => Recovery::Retry,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumqttc::ConnectReturnCode;

    #[test]
    fn full_request_queue_is_an_error_not_a_panic() {
        let config = MqttConfig::default();
        // event loop never polled, so nothing drains the queue
        let (client, _eventloop) = client(&config, "cwarn-test");

        let mut results = Vec::new();
        for _ in 0..REQUEST_CAPACITY + 1 {
            results.push(request_subscription(&client, &config.topic));
        }

        assert!(results[..REQUEST_CAPACITY].iter().all(Result::is_ok));
        assert!(matches!(
            results[REQUEST_CAPACITY],
            Err(ClientError::TryRequest(_))
        ));
    }

    #[test]
    fn refused_and_io_errors_are_retried() {
        let refused = ConnectionError::ConnectionRefused(ConnectReturnCode::NotAuthorized);
        let io = ConnectionError::Io(std::io::Error::from(std::io::ErrorKind::ConnectionReset));

        assert_eq!(recovery_for(&refused), Recovery::Retry);
        assert_eq!(recovery_for(&io), Recovery::Retry);
        assert_eq!(recovery_for(&ConnectionError::RequestsDone), Recovery::Stop);
    }

    #[test]
    fn options_follow_config() {
        let config = MqttConfig {
            broker_host: "localhost".into(),
            broker_port: 1884,
            keep_alive_seconds: 30,
            ..MqttConfig::default()
        };
        let options = options(&config, "cwarn-test");

        assert_eq!(options.broker_address(), ("localhost".to_string(), 1884));
        assert_eq!(options.client_id(), "cwarn-test");
        assert_eq!(options.keep_alive(), Duration::from_secs(30));
    }
}
