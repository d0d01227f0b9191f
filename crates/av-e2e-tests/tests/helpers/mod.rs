//! Shared test harness for E2E integration tests.
//!
//! Builds a publisher through the `ConnectionFactory` on a shared
//! `MockChannel`, exercising the same code paths as the binary minus
//! the broker.

#![allow(dead_code)]

use std::sync::Arc;

use av_mqtt_channel::{MockChannel, PublishedMessage};
use av_protocol::ImageArray;
use av_publisher::{ConnectionFactory, RecordPublisher};
use base64::Engine;

pub const VEHICLE_ID: &str = "car1";

/// Factory + publisher wired to an in-memory channel.
pub struct TestHarness {
    pub factory: ConnectionFactory,
    pub mqtt: Arc<MockChannel>,
    pub publisher: RecordPublisher<Arc<MockChannel>>,
}

impl TestHarness {
    /// A session with the usual donkey car inputs: camera, steering, throttle, mode.
    pub async fn donkey_session() -> Self {
        Self::with_session(
            &["cam/image_array", "user/angle", "user/throttle", "user/mode"],
            &["image_array", "float", "float", "str"],
        )
        .await
    }

    pub async fn with_session(inputs: &[&str], types: &[&str]) -> Self {
        let factory = test_factory();
        let mqtt = Arc::new(MockChannel::new());
        let publisher = factory
            .bind_publisher(
                Arc::clone(&mqtt),
                inputs.iter().copied(),
                types.iter().copied(),
            )
            .await
            .unwrap();

        Self {
            factory,
            mqtt,
            publisher,
        }
    }

    /// The single message published so far, parsed as JSON.
    pub fn only_record(&self) -> serde_json::Value {
        let published = self.mqtt.published();
        assert_eq!(published.len(), 1, "expected exactly one publish");
        published[0].json()
    }

    pub fn published(&self) -> Vec<PublishedMessage> {
        self.mqtt.published()
    }
}

pub fn test_factory() -> ConnectionFactory {
    ConnectionFactory::new(
        VEHICLE_ID,
        "a1b2c3-ats.iot.us-east-1.amazonaws.com",
        "~/certs/AmazonRootCA1.pem",
        "~/certs/private.pem.key",
        "~/certs/certificate.pem.crt",
    )
    .unwrap()
}

/// An RGB frame with a horizontal gradient.
pub fn camera_frame(height: usize, width: usize) -> ImageArray {
    let mut data = Vec::with_capacity(height * width * 3);
    for _ in 0..height {
        for x in 0..width {
            let v = (x * 255 / width.max(1)) as u8;
            data.extend_from_slice(&[v, v / 2, 255 - v]);
        }
    }
    ImageArray::from_u8(&[height, width, 3], data).unwrap()
}

/// Decode the base64 JPEG under `image` and return (width, height).
pub fn decoded_dimensions(record: &serde_json::Value) -> (u32, u32) {
    let b64 = record["image"].as_str().expect("record has no image");
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64)
        .unwrap();
    let img = image::load_from_memory_with_format(&bytes, image::ImageFormat::Jpeg).unwrap();
    (img.width(), img.height())
}
