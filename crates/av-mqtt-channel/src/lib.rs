//! MQTT channel for AWS IoT Core telemetry publishing.
//!
//! Provides the MQTT client the vehicle publisher talks to:
//! - `Channel` trait for connect/publish/disconnect (mockable in tests)
//! - `MqttChannel` with TLS (mTLS), offline queueing and reconnect backoff
//! - `MockChannel` for testing without a broker
//! - `ReconnectBackoff` for the event loop's reconnect delays

pub mod backoff;
pub mod channel;
pub mod config;
pub mod error;
pub mod mock;
pub mod tls;

// Re-exports for convenience.
pub use backoff::{BackoffConfig, ReconnectBackoff};
pub use channel::{Channel, MqttChannel};
pub use config::{ConnectionPolicy, MqttConfig};
pub use error::{MqttError, MqttResult};
pub use mock::{MOCK_ENDPOINT, MockChannel, MockPublish, PublishedMessage};
pub use rumqttc::QoS;
