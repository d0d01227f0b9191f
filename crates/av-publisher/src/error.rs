//! Publisher error types.

use av_mqtt_channel::MqttError;
use av_protocol::ProtocolError;
use thiserror::Error;

/// Errors surfaced to the caller of the publisher.
///
/// Publishes that the channel refused, or payloads that could not be
/// serialized, are logged and never appear here.
#[derive(Debug, Error)]
pub enum PublisherError {
    #[error("cannot establish connection with AWS IoT at '{endpoint}' for vehicle '{vehicle_id}'")]
    Connect { vehicle_id: String, endpoint: String },

    #[error("expected {expected} values (one per input), got {actual}")]
    Arity { expected: usize, actual: usize },

    #[error("unsupported type '{tag}' for field '{field}'")]
    UnsupportedType { field: String, tag: String },

    #[error("failed to encode field '{field}': {reason}")]
    Encode { field: String, reason: String },

    #[error("publisher is shut down")]
    ShutDown,

    #[error("invalid input: {0}")]
    Input(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Mqtt(#[from] MqttError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Convenience alias for publisher results.
pub type PublisherResult<T> = Result<T, PublisherError>;
