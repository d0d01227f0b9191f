//! MQTT channel: async client for AWS IoT Core.
//!
//! Wraps `rumqttc::AsyncClient` with an explicit connect step, a
//! background task that drives the event loop (reconnects with backoff,
//! drains queued publishes), and bounded publish/disconnect timeouts.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS,
};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::backoff::ReconnectBackoff;
use crate::config::{ConnectionPolicy, MqttConfig};
use crate::error::{MqttError, MqttResult};
use crate::tls;

// ── Channel trait ─────────────────────────────────────────────

/// The MQTT client operations the publisher relies on.
///
/// Enables mocking in tests without a real MQTT broker.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Open the connection. `Ok(false)` means the broker could not be
    /// reached or refused the session.
    async fn connect(&self) -> MqttResult<bool>;

    /// Publish a raw payload to a topic. `Ok(false)` means the message was
    /// not accepted for delivery (queue full, too large, timed out).
    async fn publish(&self, topic: &str, payload: &[u8], qos: QoS) -> MqttResult<bool>;

    /// Close the connection.
    async fn disconnect(&self) -> MqttResult<()>;

    /// Broker address, for error messages and logs.
    fn endpoint(&self) -> &str;
}

#[async_trait]
impl<C: Channel + ?Sized> Channel for Arc<C> {
    async fn connect(&self) -> MqttResult<bool> {
        (**self).connect().await
    }

    async fn publish(&self, topic: &str, payload: &[u8], qos: QoS) -> MqttResult<bool> {
        (**self).publish(topic, payload, qos).await
    }

    async fn disconnect(&self) -> MqttResult<()> {
        (**self).disconnect().await
    }

    fn endpoint(&self) -> &str {
        (**self).endpoint()
    }
}

// ── MqttChannel ───────────────────────────────────────────────

#[derive(Debug, Default)]
struct LinkState {
    connected: AtomicBool,
    closing: AtomicBool,
}

/// MQTT channel connected to AWS IoT Core.
///
/// The `EventLoop` stays inside the channel until `connect()` succeeds;
/// from then on a spawned task owns it until `disconnect()`.
pub struct MqttChannel {
    client: AsyncClient,
    eventloop: Mutex<Option<EventLoop>>,
    driver: Mutex<Option<JoinHandle<()>>>,
    link: Arc<LinkState>,
    policy: ConnectionPolicy,
    endpoint: String,
}

impl MqttChannel {
    /// Create a configured, not yet connected channel.
    ///
    /// TLS material is read here, so a missing certificate fails before
    /// any network traffic.
    pub fn new(config: &MqttConfig) -> MqttResult<Self> {
        // rumqttc panics on these ids.
        if config.client_id.is_empty() || config.client_id.starts_with(' ') {
            return Err(MqttError::Other(format!(
                "invalid client id '{}'",
                config.client_id
            )));
        }

        let mut options = MqttOptions::new(&config.client_id, &config.endpoint, config.port);
        options.set_keep_alive(Duration::from_secs(config.keepalive_secs.into()));
        options.set_pending_throttle(config.policy.draining_interval());
        options.set_max_packet_size(config.policy.max_packet_bytes, config.policy.max_packet_bytes);

        if config.use_tls {
            options.set_transport(tls::load_tls_transport(config)?);
        }

        let (client, eventloop) = AsyncClient::new(options, config.policy.request_capacity());

        Ok(Self {
            client,
            eventloop: Mutex::new(Some(eventloop)),
            driver: Mutex::new(None),
            link: Arc::new(LinkState::default()),
            policy: config.policy.clone(),
            endpoint: format!("{}:{}", config.endpoint, config.port),
        })
    }

    /// Whether the broker link is currently up.
    pub fn is_connected(&self) -> bool {
        self.link.connected.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Channel for MqttChannel {
    async fn connect(&self) -> MqttResult<bool> {
        let mut slot = self.eventloop.lock().await;
        let Some(mut eventloop) = slot.take() else {
            // Already handed to the driver task.
            return Ok(self.is_connected());
        };

        let timeout = self.policy.connect_timeout();
        match tokio::time::timeout(timeout, await_connack(&mut eventloop)).await {
            Ok(Ok(())) => {
                self.link.closing.store(false, Ordering::Release);
                self.link.connected.store(true, Ordering::Release);
                let backoff = ReconnectBackoff::new(&self.policy.backoff);
                let handle = tokio::spawn(drive(eventloop, Arc::clone(&self.link), backoff));
                *self.driver.lock().await = Some(handle);
                tracing::info!(endpoint = %self.endpoint, "MQTT connected");
                Ok(true)
            }
            Ok(Err(e)) => {
                tracing::warn!(endpoint = %self.endpoint, error = %e, "MQTT connect failed");
                *slot = Some(eventloop);
                Ok(false)
            }
            Err(_) => {
                tracing::warn!(
                    endpoint = %self.endpoint,
                    timeout_secs = timeout.as_secs(),
                    "MQTT connect timed out"
                );
                *slot = Some(eventloop);
                Ok(false)
            }
        }
    }

    async fn publish(&self, topic: &str, payload: &[u8], qos: QoS) -> MqttResult<bool> {
        if self.link.closing.load(Ordering::Acquire) {
            return Err(MqttError::Publish("channel is disconnected".into()));
        }
        if payload.len() > self.policy.max_packet_bytes {
            tracing::warn!(
                topic,
                size = payload.len(),
                limit = self.policy.max_packet_bytes,
                "payload exceeds max packet size"
            );
            return Ok(false);
        }

        if self.policy.offline_queue_depth.is_some() {
            // Bounded queue: a full request channel drops the message.
            return Ok(self.client.try_publish(topic, qos, false, payload).is_ok());
        }

        let timeout = self.policy.operation_timeout();
        match tokio::time::timeout(timeout, self.client.publish(topic, qos, false, payload)).await
        {
            Ok(Ok(())) => Ok(true),
            Ok(Err(e)) => Err(MqttError::Publish(e.to_string())),
            Err(_) => {
                tracing::warn!(topic, timeout_secs = timeout.as_secs(), "publish timed out");
                Ok(false)
            }
        }
    }

    async fn disconnect(&self) -> MqttResult<()> {
        self.link.closing.store(true, Ordering::Release);
        let Some(handle) = self.driver.lock().await.take() else {
            return Ok(());
        };

        let timeout = self.policy.connect_timeout();
        let requested = tokio::time::timeout(timeout, self.client.disconnect()).await;

        let abort = handle.abort_handle();
        if tokio::time::timeout(timeout, handle).await.is_err() {
            tracing::warn!(endpoint = %self.endpoint, "event loop did not stop, aborting");
            abort.abort();
        }
        self.link.connected.store(false, Ordering::Release);
        tracing::info!(endpoint = %self.endpoint, "MQTT disconnected");

        match requested {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(MqttError::Connection(e.to_string())),
            Err(_) => Err(MqttError::Timeout {
                operation: "disconnect",
                secs: timeout.as_secs(),
            }),
        }
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

// ── Event loop ────────────────────────────────────────────────

async fn await_connack(eventloop: &mut EventLoop) -> MqttResult<()> {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                return if ack.code == ConnectReturnCode::Success {
                    Ok(())
                } else {
                    Err(MqttError::Connection(format!(
                        "broker refused connection: {:?}",
                        ack.code
                    )))
                };
            }
            Ok(_) => {}
            Err(e) => return Err(MqttError::Connection(e.to_string())),
        }
    }
}

/// Drive the event loop until the channel is closed.
///
/// rumqttc reconnects on the next `poll()` after an error; the sleep in
/// between follows `backoff`.
async fn drive(mut eventloop: EventLoop, link: Arc<LinkState>, mut backoff: ReconnectBackoff) {
    let mut connected_at = Some(Instant::now());

    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                link.connected.store(true, Ordering::Release);
                connected_at = Some(Instant::now());
                tracing::info!("MQTT reconnected");
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                link.connected.store(false, Ordering::Release);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                link.connected.store(false, Ordering::Release);
                if link.closing.load(Ordering::Acquire) {
                    break;
                }
                let delay = backoff.next_delay(connected_at.take().map(|t| t.elapsed()));
                tracing::warn!(
                    error = %e,
                    delay_secs = delay.as_secs(),
                    "MQTT connection lost, reconnecting"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plaintext_config(port: u16) -> MqttConfig {
        MqttConfig {
            endpoint: "127.0.0.1".into(),
            port,
            client_id: "car1".into(),
            use_tls: false,
            ca_cert_path: Default::default(),
            private_key_path: Default::default(),
            client_cert_path: Default::default(),
            keepalive_secs: 30,
            policy: ConnectionPolicy {
                connect_timeout_secs: 1,
                ..Default::default()
            },
        }
    }

    #[test]
    fn tls_config_without_certs_fails_at_construction() {
        let mut config = plaintext_config(8883);
        config.use_tls = true;
        config.ca_cert_path = "/nonexistent/ca.pem".into();
        let err = MqttChannel::new(&config).err().expect("should fail");
        assert!(matches!(err, MqttError::Tls(_)));
    }

    #[tokio::test]
    async fn new_channel_is_not_connected() {
        let channel = MqttChannel::new(&plaintext_config(1883)).unwrap();
        assert!(!channel.is_connected());
        assert_eq!(channel.endpoint(), "127.0.0.1:1883");
    }

    #[tokio::test]
    async fn connect_to_closed_port_reports_false() {
        // Bind then drop a listener so the port is known to be closed.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let channel = MqttChannel::new(&plaintext_config(port)).unwrap();
        assert!(!channel.connect().await.unwrap());
        assert!(!channel.is_connected());
    }

    #[tokio::test]
    async fn disconnect_without_connect_is_noop() {
        let channel = MqttChannel::new(&plaintext_config(1883)).unwrap();
        channel.disconnect().await.unwrap();
        let err = channel
            .publish("AutonomousVehicles/car1", b"{}", QoS::AtMostOnce)
            .await
            .unwrap_err();
        assert!(matches!(err, MqttError::Publish(_)));
    }

    #[tokio::test]
    async fn oversized_payload_is_refused_locally() {
        let mut config = plaintext_config(1883);
        config.policy.max_packet_bytes = 8;
        let channel = MqttChannel::new(&config).unwrap();
        let accepted = channel
            .publish("AutonomousVehicles/car1", &[0u8; 16], QoS::AtMostOnce)
            .await
            .unwrap();
        assert!(!accepted);
    }
}
