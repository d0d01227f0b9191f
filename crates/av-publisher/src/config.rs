//! Publisher configuration, loadable from TOML.

use av_mqtt_channel::MqttConfig;
use serde::Deserialize;

/// Top-level configuration for the publisher binary.
#[derive(Debug, Clone, Deserialize)]
pub struct PublisherConfig {
    /// Vehicle identifier; also the MQTT client id and topic suffix.
    pub vehicle_id: String,
    /// MQTT connection settings.
    pub mqtt: MqttConfig,
    /// Inputs published each cycle.
    pub session: SessionConfig,
}

/// Input names and their type tags, paired by position.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub inputs: Vec<String>,
    pub types: Vec<String>,
}

impl PublisherConfig {
    /// Load config from a TOML file path.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }
}
