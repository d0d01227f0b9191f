//! E2E tests for publisher construction and shutdown.

mod helpers;

use av_publisher::{PublisherError, PublisherState};
use helpers::{TestHarness, test_factory};

/// Credential paths are expanded and absolute once the factory exists.
#[test]
fn e2e_factory_resolves_credentials() {
    let factory = test_factory();
    for path in [factory.ca(), factory.private_key(), factory.certificate()] {
        assert!(path.is_absolute(), "{}", path.display());
        assert!(!path.to_string_lossy().contains('~'), "{}", path.display());
    }
    assert_eq!(factory.mqtt_config().port, 8883);
}

/// Construction connects once; shutdown disconnects once.
#[tokio::test]
async fn e2e_connect_then_shutdown() {
    let mut h = TestHarness::donkey_session().await;
    assert_eq!(h.mqtt.connect_count(), 1);
    assert!(h.mqtt.is_connected());

    h.publisher.shutdown().await.unwrap();
    h.publisher.shutdown().await.unwrap();

    assert_eq!(h.publisher.state(), PublisherState::ShutDown);
    assert_eq!(h.mqtt.disconnect_count(), 1);
    assert!(!h.mqtt.is_connected());
}

/// Nothing can be published after shutdown.
#[tokio::test]
async fn e2e_no_publish_after_shutdown() {
    let mut h = TestHarness::with_session(&["speed"], &["float"]).await;
    h.publisher.shutdown().await.unwrap();

    let err = h.publisher.run(vec![1.0.into()]).await.unwrap_err();
    assert!(matches!(err, PublisherError::ShutDown));
    assert!(h.published().is_empty());
}

/// Two sessions started back to back keep counting upward.
#[tokio::test]
async fn e2e_restart_counter_does_not_go_backwards() {
    let mut first = TestHarness::with_session(&["speed"], &["float"]).await;
    let last = first.publisher.run(vec![1.0.into()]).await.unwrap().current_ix;
    first.publisher.shutdown().await.unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = TestHarness::with_session(&["speed"], &["float"]).await;
    assert!(second.publisher.current_ix() >= last);
}

/// Session metadata is fixed at construction.
#[tokio::test]
async fn e2e_session_metadata_is_exposed() {
    let h = TestHarness::donkey_session().await;
    assert_eq!(h.publisher.inputs().len(), 4);
    assert_eq!(h.publisher.types()[0].to_string(), "image_array");
    assert_eq!(
        h.publisher.get_input_type("user/mode"),
        Some(av_protocol::FieldType::Str)
    );
    assert_eq!(h.publisher.get_input_type("user/brake"), None);
}
