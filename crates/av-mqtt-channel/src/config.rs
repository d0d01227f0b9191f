use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::backoff::BackoffConfig;

/// Request channel depth used when the offline queue is unlimited.
const UNLIMITED_QUEUE_CAPACITY: usize = 16 * 1024;

/// AWS IoT Core accepts payloads up to 128 KB.
const DEFAULT_MAX_PACKET_BYTES: usize = 128 * 1024;

/// MQTT connection configuration, loadable from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct MqttConfig {
    /// Broker hostname (e.g., AWS IoT endpoint).
    pub endpoint: String,
    /// Broker port (default 8883 for TLS).
    #[serde(default = "default_port")]
    pub port: u16,
    /// MQTT client ID. The publisher fills this with the vehicle id.
    #[serde(default)]
    pub client_id: String,
    /// Enable TLS (mTLS). When false, connects plaintext (local dev).
    #[serde(default = "default_use_tls")]
    pub use_tls: bool,
    /// Path to CA certificate (e.g., AmazonRootCA1.pem).
    #[serde(default)]
    pub ca_cert_path: PathBuf,
    /// Path to device private key (PEM).
    #[serde(default)]
    pub private_key_path: PathBuf,
    /// Path to device X.509 certificate (PEM).
    #[serde(default)]
    pub client_cert_path: PathBuf,
    /// Keep-alive interval in seconds.
    #[serde(default = "default_keepalive")]
    pub keepalive_secs: u16,
    /// Queueing, timeout and reconnect settings.
    #[serde(flatten)]
    pub policy: ConnectionPolicy,
}

/// Queueing, timeout and reconnect behaviour of a connection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConnectionPolicy {
    /// Publishes buffered while the link is down. `None` is unlimited.
    pub offline_queue_depth: Option<usize>,
    /// Rate at which queued publishes are re-sent after a reconnect.
    pub draining_frequency_hz: f64,
    /// Connect and disconnect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Per-operation (publish) timeout in seconds.
    pub operation_timeout_secs: u64,
    /// Largest outgoing packet; bigger publishes are refused locally.
    pub max_packet_bytes: usize,
    pub backoff: BackoffConfig,
}

impl Default for ConnectionPolicy {
    fn default() -> Self {
        Self {
            offline_queue_depth: None,
            draining_frequency_hz: 2.0,
            connect_timeout_secs: 10,
            operation_timeout_secs: 5,
            max_packet_bytes: DEFAULT_MAX_PACKET_BYTES,
            backoff: BackoffConfig::default(),
        }
    }
}

impl ConnectionPolicy {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    /// Gap between queued publishes while draining; zero disables throttling.
    pub fn draining_interval(&self) -> Duration {
        if self.draining_frequency_hz > 0.0 {
            Duration::from_secs_f64(1.0 / self.draining_frequency_hz)
        } else {
            Duration::ZERO
        }
    }

    /// Capacity of the client's request channel.
    pub fn request_capacity(&self) -> usize {
        match self.offline_queue_depth {
            Some(depth) => depth.max(1),
            None => UNLIMITED_QUEUE_CAPACITY,
        }
    }
}

fn default_use_tls() -> bool {
    true
}

fn default_port() -> u16 {
    8883
}

fn default_keepalive() -> u16 {
    30
}
