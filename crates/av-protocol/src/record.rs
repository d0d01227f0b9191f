//! The JSON record published for each telemetry cycle.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::field::FieldValue;

/// Key holding the record's sequence number.
pub const KEY_CURRENT_IX: &str = "current_ix";
/// Key holding the publishing vehicle's id.
pub const KEY_VEHICLE_ID: &str = "vehicleID";
/// Key holding the publish timestamp.
pub const KEY_TIME: &str = "time";
/// Key holding base64 JPEG bytes of an encoded camera frame.
pub const KEY_IMAGE: &str = "image";

/// An insertion-ordered set of fields, serialized as one JSON object.
///
/// Inserting a key that is already present replaces the value in place,
/// so a record never carries duplicate keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetryRecord {
    entries: Vec<(String, FieldValue)>,
}

impl TelemetryRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add the sequence number, vehicle id and timestamp.
    pub fn stamp(&mut self, current_ix: i64, vehicle_id: &str, time: impl Into<String>) {
        self.insert(KEY_CURRENT_IX, current_ix);
        self.insert(KEY_VEHICLE_ID, vehicle_id);
        let time: String = time.into();
        self.insert(KEY_TIME, time);
    }

    /// Short description for log lines; omits values so frames stay out of logs.
    pub fn summary(&self) -> String {
        let ix = match self.get(KEY_CURRENT_IX) {
            Some(FieldValue::Int(ix)) => ix.to_string(),
            _ => "-".to_string(),
        };
        let keys: Vec<&str> = self.keys().collect();
        format!("current_ix={ix} keys=[{}]", keys.join(","))
    }
}

impl Serialize for TelemetryRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
