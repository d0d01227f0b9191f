//! Connection factory: builds the IoT client and binds a publisher to it.

use std::path::{Path, PathBuf};

use av_mqtt_channel::{Channel, ConnectionPolicy, MqttChannel, MqttConfig};
use av_protocol::{FieldType, SessionMeta};

use crate::config::PublisherConfig;
use crate::error::{PublisherError, PublisherResult};
use crate::publisher::RecordPublisher;

/// AWS IoT Core MQTT over TLS.
pub const IOT_PORT: u16 = 8883;

const DEFAULT_KEEPALIVE_SECS: u16 = 30;

/// Holds the endpoint, credentials and connection policy for one vehicle.
#[derive(Debug, Clone)]
pub struct ConnectionFactory {
    vehicle_id: String,
    endpoint: String,
    port: u16,
    use_tls: bool,
    keepalive_secs: u16,
    ca: PathBuf,
    private_key: PathBuf,
    certificate: PathBuf,
    policy: ConnectionPolicy,
}

impl ConnectionFactory {
    /// Credential paths may start with `~`; they are resolved to absolute
    /// paths here.
    pub fn new(
        vehicle_id: impl Into<String>,
        endpoint: impl Into<String>,
        ca: impl AsRef<Path>,
        private_key: impl AsRef<Path>,
        certificate: impl AsRef<Path>,
    ) -> PublisherResult<Self> {
        let vehicle_id = vehicle_id.into();
        if vehicle_id.trim().is_empty() {
            return Err(PublisherError::Config("vehicle id must not be empty".into()));
        }

        Ok(Self {
            vehicle_id,
            endpoint: endpoint.into(),
            port: IOT_PORT,
            use_tls: true,
            keepalive_secs: DEFAULT_KEEPALIVE_SECS,
            ca: resolve_path(ca.as_ref())?,
            private_key: resolve_path(private_key.as_ref())?,
            certificate: resolve_path(certificate.as_ref())?,
            policy: ConnectionPolicy::default(),
        })
    }

    /// Build a factory from the `[mqtt]` section of the config file.
    pub fn from_config(config: &PublisherConfig) -> PublisherResult<Self> {
        let mqtt = &config.mqtt;
        let mut factory = Self::new(
            &config.vehicle_id,
            &mqtt.endpoint,
            &mqtt.ca_cert_path,
            &mqtt.private_key_path,
            &mqtt.client_cert_path,
        )?;
        factory.port = mqtt.port;
        factory.use_tls = mqtt.use_tls;
        factory.keepalive_secs = mqtt.keepalive_secs;
        factory.policy = mqtt.policy.clone();
        Ok(factory)
    }

    pub fn vehicle_id(&self) -> &str {
        &self.vehicle_id
    }

    pub fn ca(&self) -> &Path {
        &self.ca
    }

    pub fn private_key(&self) -> &Path {
        &self.private_key
    }

    pub fn certificate(&self) -> &Path {
        &self.certificate
    }

    /// MQTT settings for this vehicle; the client id is the vehicle id.
    pub fn mqtt_config(&self) -> MqttConfig {
        MqttConfig {
            endpoint: self.endpoint.clone(),
            port: self.port,
            client_id: self.vehicle_id.clone(),
            use_tls: self.use_tls,
            ca_cert_path: self.ca.clone(),
            private_key_path: self.private_key.clone(),
            client_cert_path: self.certificate.clone(),
            keepalive_secs: self.keepalive_secs,
            policy: self.policy.clone(),
        }
    }

    /// A configured client that has not connected yet.
    pub fn create_iot_client(&self) -> PublisherResult<MqttChannel> {
        Ok(MqttChannel::new(&self.mqtt_config())?)
    }

    /// Build a client and start a publisher session on it.
    pub async fn new_iot_publisher<I, T>(
        &self,
        inputs: I,
        types: T,
    ) -> PublisherResult<RecordPublisher<MqttChannel>>
    where
        I: IntoIterator,
        I::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<FieldType>,
    {
        let client = self.create_iot_client()?;
        self.bind_publisher(client, inputs, types).await
    }

    /// Start a publisher session on an existing channel.
    pub async fn bind_publisher<C, I, T>(
        &self,
        channel: C,
        inputs: I,
        types: T,
    ) -> PublisherResult<RecordPublisher<C>>
    where
        C: Channel,
        I: IntoIterator,
        I::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<FieldType>,
    {
        let meta = SessionMeta::new(inputs, types)?;
        RecordPublisher::new(&self.vehicle_id, channel, meta)
            .await
            .inspect_err(|e| {
                tracing::error!(
                    endpoint = %self.endpoint,
                    port = self.port,
                    error = %e,
                    "failed to start publisher"
                );
            })
    }
}

/// Expand a leading `~` and make the path absolute. Empty paths stay empty.
pub fn resolve_path(path: &Path) -> PublisherResult<PathBuf> {
    if path.as_os_str().is_empty() {
        return Ok(PathBuf::new());
    }
    let expanded = expand_home(path);
    std::path::absolute(&expanded).map_err(|e| {
        PublisherError::Config(format!("cannot resolve '{}': {e}", path.display()))
    })
}

fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => {
            tracing::warn!(path = %path.display(), "could not determine home directory");
            path.to_path_buf()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use av_mqtt_channel::MockChannel;

    fn factory() -> ConnectionFactory {
        ConnectionFactory::new(
            "car1",
            "a1b2c3-ats.iot.us-east-1.amazonaws.com",
            "/certs/ca.pem",
            "/certs/private.key",
            "/certs/cert.pem",
        )
        .unwrap()
    }

    #[test]
    fn tilde_paths_expand_to_home() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        let resolved = resolve_path(Path::new("~/certs/ca.pem")).unwrap();
        assert_eq!(resolved, home.join("certs/ca.pem"));
    }

    #[test]
    fn relative_paths_become_absolute() {
        let resolved = resolve_path(Path::new("certs/ca.pem")).unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("certs/ca.pem"));
    }

    #[test]
    fn tilde_inside_a_name_is_left_alone() {
        let resolved = resolve_path(Path::new("/certs/~ca.pem")).unwrap();
        assert_eq!(resolved, PathBuf::from("/certs/~ca.pem"));
    }

    #[test]
    fn empty_vehicle_id_is_rejected() {
        let err = ConnectionFactory::new(" ", "host", "a", "b", "c").unwrap_err();
        assert!(matches!(err, PublisherError::Config(_)));
    }

    #[test]
    fn client_config_uses_iot_policy() {
        let config = factory().mqtt_config();
        assert_eq!(config.port, 8883);
        assert_eq!(config.client_id, "car1");
        assert!(config.use_tls);
        assert_eq!(config.policy, ConnectionPolicy::default());
        assert_eq!(config.ca_cert_path, PathBuf::from("/certs/ca.pem"));
        assert_eq!(config.private_key_path, PathBuf::from("/certs/private.key"));
        assert_eq!(config.client_cert_path, PathBuf::from("/certs/cert.pem"));
    }

    #[test]
    fn create_client_reads_credentials() {
        let err = factory().create_iot_client().err().expect("should fail");
        assert!(err.to_string().contains("CA cert"), "{err}");
    }

    #[tokio::test]
    async fn bind_publisher_connects() {
        let publisher = factory()
            .bind_publisher(MockChannel::new(), ["speed"], ["float"])
            .await
            .unwrap();
        assert_eq!(publisher.vehicle_id(), "car1");
        assert!(publisher.channel().is_connected());
    }

    #[tokio::test]
    async fn bind_publisher_fails_when_connect_fails() {
        let err = factory()
            .bind_publisher(MockChannel::refusing_connections(), ["speed"], ["float"])
            .await
            .err()
            .expect("should fail");
        assert!(matches!(err, PublisherError::Connect { .. }));
    }

    #[tokio::test]
    async fn bind_publisher_checks_metadata_lengths() {
        let err = factory()
            .bind_publisher(MockChannel::new(), ["speed", "steer"], ["float"])
            .await
            .err()
            .expect("should fail");
        assert!(matches!(err, PublisherError::Protocol(_)));
    }
}
