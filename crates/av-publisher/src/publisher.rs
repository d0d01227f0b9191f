//! Record publisher: encode → stamp → publish.
//!
//! One `RecordPublisher` per session. It owns the channel, the session
//! metadata and the sequence counter; records are built and dropped
//! inside a single call.

use av_mqtt_channel::Channel;
use av_protocol::{FieldType, FieldValue, SessionMeta, TelemetryRecord, topics};
use chrono::{Local, Utc};
use rumqttc::QoS;
use tokio::time::Instant;

use crate::encode;
use crate::error::{PublisherError, PublisherResult};

/// Lifecycle of a publisher. A value only exists once connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublisherState {
    Connected,
    ShutDown,
}

/// Result of handing a stamped record to the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Accepted by the channel (QoS 0, so not confirmed by the broker).
    Sent,
    /// Logged and dropped; the caller carries on.
    Dropped(DropReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// The channel did not accept the message.
    Rejected,
    /// The record could not be serialized to JSON.
    Serialization(String),
}

/// What became of one record passed to `run` or `put_record`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordReceipt {
    /// Sequence number stamped on the record.
    pub current_ix: i64,
    pub outcome: PublishOutcome,
}

/// Publishes one JSON record per telemetry cycle for a single vehicle.
pub struct RecordPublisher<C: Channel> {
    vehicle_id: String,
    channel: C,
    meta: SessionMeta,
    state: PublisherState,
    started: Instant,
    current_ix: i64,
    record_time: u64,
}

impl<C: Channel> RecordPublisher<C> {
    /// Connect `channel` and start a session.
    ///
    /// The sequence counter is seeded with the current time in
    /// milliseconds so restarts keep increasing it.
    pub async fn new(
        vehicle_id: impl Into<String>,
        channel: C,
        meta: SessionMeta,
    ) -> PublisherResult<Self> {
        let vehicle_id = vehicle_id.into();
        if !channel.connect().await? {
            return Err(PublisherError::Connect {
                vehicle_id,
                endpoint: channel.endpoint().to_string(),
            });
        }

        let current_ix = Utc::now().timestamp_millis();
        tracing::info!(
            vehicle_id = %vehicle_id,
            inputs = meta.len(),
            current_ix,
            "publisher session started"
        );

        Ok(Self {
            vehicle_id,
            channel,
            meta,
            state: PublisherState::Connected,
            started: Instant::now(),
            current_ix,
            record_time: 0,
        })
    }

    pub fn vehicle_id(&self) -> &str {
        &self.vehicle_id
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn meta(&self) -> &SessionMeta {
        &self.meta
    }

    pub fn inputs(&self) -> &[String] {
        self.meta.inputs()
    }

    pub fn types(&self) -> &[FieldType] {
        self.meta.types()
    }

    pub fn state(&self) -> PublisherState {
        self.state
    }

    /// Sequence number of the last record.
    pub fn current_ix(&self) -> i64 {
        self.current_ix
    }

    /// Whole seconds between session start and the last `run`.
    pub fn record_time(&self) -> u64 {
        self.record_time
    }

    /// Topic this publisher sends records on.
    pub fn topic(&self) -> String {
        topics::vehicle(&self.vehicle_id)
    }

    /// Declared type of an input, or `None` if it is not part of the session.
    pub fn get_input_type(&self, key: &str) -> Option<FieldType> {
        self.meta.input_type(key)
    }

    /// Publish one value per session input, in input order.
    pub async fn run(&mut self, values: Vec<FieldValue>) -> PublisherResult<RecordReceipt> {
        self.ensure_connected()?;
        if values.len() != self.meta.len() {
            return Err(PublisherError::Arity {
                expected: self.meta.len(),
                actual: values.len(),
            });
        }

        self.record_time = self.started.elapsed().as_secs();
        let data = self.meta.inputs().iter().cloned().zip(values).collect();
        self.put_record(data).await
    }

    /// Encode `data` by declared type, stamp it and publish it.
    ///
    /// The counter only advances once every field has been encoded, so a
    /// rejected record does not use up a sequence number.
    pub async fn put_record(
        &mut self,
        data: Vec<(String, FieldValue)>,
    ) -> PublisherResult<RecordReceipt> {
        self.ensure_connected()?;

        let next_ix = self.current_ix + 1;
        let mut record = TelemetryRecord::new();
        for (key, value) in data {
            let ty = self.get_input_type(&key);
            encode::encode_field(&mut record, next_ix, &key, ty, value)?;
        }

        self.current_ix = next_ix;
        let outcome = self.write_json_record(record).await?;
        Ok(RecordReceipt {
            current_ix: self.current_ix,
            outcome,
        })
    }

    /// Stamp `record` with the current sequence number, vehicle id and
    /// local time, then publish it at QoS 0.
    ///
    /// Rejections and serialization failures are logged and reported as
    /// `Dropped`; any other channel error is returned.
    pub async fn write_json_record(
        &self,
        mut record: TelemetryRecord,
    ) -> PublisherResult<PublishOutcome> {
        self.ensure_connected()?;
        record.stamp(self.current_ix, &self.vehicle_id, timestamp());
        let topic = self.topic();

        let payload = match serde_json::to_vec(&record) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, record = %record.summary(), "troubles with record");
                return Ok(PublishOutcome::Dropped(DropReason::Serialization(
                    e.to_string(),
                )));
            }
        };

        match self.channel.publish(&topic, &payload, QoS::AtMostOnce).await {
            Ok(true) => {
                tracing::debug!(
                    topic = %topic,
                    current_ix = self.current_ix,
                    bytes = payload.len(),
                    "record published"
                );
                Ok(PublishOutcome::Sent)
            }
            Ok(false) => {
                tracing::warn!(record = %record.summary(), "unable to publish record");
                Ok(PublishOutcome::Dropped(DropReason::Rejected))
            }
            Err(e) if e.is_serialization() => {
                tracing::warn!(error = %e, record = %record.summary(), "troubles with record");
                Ok(PublishOutcome::Dropped(DropReason::Serialization(
                    e.to_string(),
                )))
            }
            Err(e) => {
                tracing::error!(error = %e, record = %record.summary(), "unexpected publish error");
                Err(e.into())
            }
        }
    }

    /// Disconnect the channel. Calling it again is a no-op.
    pub async fn shutdown(&mut self) -> PublisherResult<()> {
        if self.state == PublisherState::ShutDown {
            return Ok(());
        }
        self.state = PublisherState::ShutDown;
        self.channel.disconnect().await?;
        tracing::info!(
            vehicle_id = %self.vehicle_id,
            current_ix = self.current_ix,
            "publisher shut down"
        );
        Ok(())
    }

    fn ensure_connected(&self) -> PublisherResult<()> {
        match self.state {
            PublisherState::Connected => Ok(()),
            PublisherState::ShutDown => Err(PublisherError::ShutDown),
        }
    }
}

/// Local ISO-8601 timestamp with microseconds, no offset.
fn timestamp() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}
