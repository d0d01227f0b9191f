//! Vehicle telemetry publisher: edge binary.
//!
//! Connects to AWS IoT Core and publishes one record per line of JSON
//! read from stdin until EOF or Ctrl-C.

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use av_mqtt_channel::MqttChannel;
use av_publisher::{ConnectionFactory, PublisherConfig, PublisherError, RecordPublisher, input};

const DEFAULT_CONFIG_PATH: &str = "/etc/av-publisher/publisher.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "av-publisher starting");

    // ── Load config ─────────────────────────────────────────────
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let config = PublisherConfig::from_file(&config_path)?;
    tracing::info!(
        vehicle_id = %config.vehicle_id,
        endpoint = %config.mqtt.endpoint,
        inputs = config.session.inputs.len(),
        "config loaded"
    );

    // ── Connect ─────────────────────────────────────────────────
    let factory = ConnectionFactory::from_config(&config)?;
    let mut publisher = factory
        .new_iot_publisher(config.session.inputs.clone(), config.session.types.clone())
        .await?;

    tracing::info!(topic = %publisher.topic(), "av-publisher ready");

    let result = pump_stdin(&mut publisher).await;
    publisher.shutdown().await?;

    tracing::info!(current_ix = publisher.current_ix(), "av-publisher stopped");
    result
}

/// Publish one record per stdin line until EOF or a shutdown signal.
///
/// Bad lines and records that fail to encode are skipped; channel
/// failures end the loop.
async fn pump_stdin(publisher: &mut RecordPublisher<MqttChannel>) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    tracing::info!("end of input");
                    return Ok(());
                };
                if line.trim().is_empty() {
                    continue;
                }

                let values = match input::parse_line(publisher.meta(), &line) {
                    Ok(values) => values,
                    Err(e) => {
                        tracing::warn!(error = %e, "skipping malformed input line");
                        continue;
                    }
                };

                match publisher.run(values).await {
                    Ok(receipt) => tracing::debug!(
                        current_ix = receipt.current_ix,
                        outcome = ?receipt.outcome,
                        record_time = publisher.record_time(),
                        "record handled"
                    ),
                    Err(e @ (PublisherError::UnsupportedType { .. } | PublisherError::Encode { .. })) => {
                        tracing::error!(error = %e, "record dropped");
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown signal received");
                return Ok(());
            }
        }
    }
}
