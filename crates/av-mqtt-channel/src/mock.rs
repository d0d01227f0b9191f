//! Mock MQTT channel for testing without a real broker.
//!
//! Records every accepted publish and counts connects/disconnects.
//! Publish results can be scripted to exercise the publisher's
//! failure handling.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use rumqttc::QoS;

use crate::channel::Channel;
use crate::error::{MqttError, MqttResult};

/// Endpoint reported by every `MockChannel`.
pub const MOCK_ENDPOINT: &str = "mock-broker:8883";

/// A recorded publish call.
#[derive(Debug, Clone)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: QoS,
}

impl PublishedMessage {
    /// Payload parsed as JSON.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.payload).unwrap()
    }
}

/// Scripted result for the next publish call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockPublish {
    /// Accept and record the message.
    Accept,
    /// Report the message as not accepted (`Ok(false)`).
    Reject,
    /// Fail with a serialization error.
    SerializationError,
    /// Fail with a publish (transport) error.
    Fatal,
}

/// Mock implementation of the `Channel` trait.
///
/// Thread-safe via `Mutex` (fine for test contexts).
pub struct MockChannel {
    connect_result: Mutex<bool>,
    connected: Mutex<bool>,
    connects: Mutex<usize>,
    disconnects: Mutex<usize>,
    scripted: Mutex<VecDeque<MockPublish>>,
    published: Mutex<Vec<PublishedMessage>>,
}

impl MockChannel {
    /// A mock whose `connect()` succeeds.
    pub fn new() -> Self {
        Self {
            connect_result: Mutex::new(true),
            connected: Mutex::new(false),
            connects: Mutex::new(0),
            disconnects: Mutex::new(0),
            scripted: Mutex::new(VecDeque::new()),
            published: Mutex::new(Vec::new()),
        }
    }

    /// A mock whose `connect()` reports failure.
    pub fn refusing_connections() -> Self {
        let mock = Self::new();
        *mock.connect_result.lock().unwrap() = false;
        mock
    }

    /// Queue the result of an upcoming publish. Unscripted publishes are accepted.
    pub fn script_publish(&self, result: MockPublish) {
        self.scripted.lock().unwrap().push_back(result);
    }

    /// Get all accepted messages.
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.published.lock().unwrap().clone()
    }

    /// Get the last accepted message.
    pub fn last_published(&self) -> Option<PublishedMessage> {
        self.published.lock().unwrap().last().cloned()
    }

    /// Get accepted messages for a specific topic.
    pub fn published_to(&self, topic: &str) -> Vec<PublishedMessage> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.topic == topic)
            .cloned()
            .collect()
    }

    pub fn is_connected(&self) -> bool {
        *self.connected.lock().unwrap()
    }

    pub fn connect_count(&self) -> usize {
        *self.connects.lock().unwrap()
    }

    pub fn disconnect_count(&self) -> usize {
        *self.disconnects.lock().unwrap()
    }

    /// Clear recorded messages and scripted results.
    pub fn reset(&self) {
        self.published.lock().unwrap().clear();
        self.scripted.lock().unwrap().clear();
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Channel for MockChannel {
    async fn connect(&self) -> MqttResult<bool> {
        *self.connects.lock().unwrap() += 1;
        let ok = *self.connect_result.lock().unwrap();
        *self.connected.lock().unwrap() = ok;
        Ok(ok)
    }

    async fn publish(&self, topic: &str, payload: &[u8], qos: QoS) -> MqttResult<bool> {
        let next = self
            .scripted
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(MockPublish::Accept);

        match next {
            MockPublish::Accept => {
                self.published.lock().unwrap().push(PublishedMessage {
                    topic: topic.to_string(),
                    payload: payload.to_vec(),
                    qos,
                });
                Ok(true)
            }
            MockPublish::Reject => Ok(false),
            MockPublish::SerializationError => {
                Err(MqttError::Serialization("mock payload rejected".into()))
            }
            MockPublish::Fatal => Err(MqttError::Publish("mock transport failure".into())),
        }
    }

    async fn disconnect(&self) -> MqttResult<()> {
        *self.disconnects.lock().unwrap() += 1;
        *self.connected.lock().unwrap() = false;
        Ok(())
    }

    fn endpoint(&self) -> &str {
        MOCK_ENDPOINT
    }
}
