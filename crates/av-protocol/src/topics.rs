//! MQTT topic builders for vehicle telemetry.
//!
//! Topic structure:
//! ```text
//! AutonomousVehicles/{vehicle_id}
//! ```

const PREFIX: &str = "AutonomousVehicles";

/// Topic a vehicle publishes its records on.
pub fn vehicle(vehicle_id: &str) -> String {
    format!("{PREFIX}/{vehicle_id}")
}

/// Extract the vehicle id from a record topic.
/// Returns `None` if the topic is not a vehicle topic.
pub fn parse_vehicle_id(topic: &str) -> Option<&str> {
    let id = topic.strip_prefix(PREFIX)?.strip_prefix('/')?;
    if id.is_empty() || id.contains('/') {
        return None;
    }
    Some(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vehicle_topic() {
        assert_eq!(vehicle("car1"), "AutonomousVehicles/car1");
    }

    #[test]
    fn parse_roundtrip() {
        assert_eq!(parse_vehicle_id(&vehicle("donkey-7")), Some("donkey-7"));
    }

    #[test]
    fn parse_rejects_other_topics() {
        assert_eq!(parse_vehicle_id("fleet/a/b"), None);
        assert_eq!(parse_vehicle_id("AutonomousVehicles/"), None);
        assert_eq!(parse_vehicle_id("AutonomousVehicles/a/b"), None);
        assert_eq!(parse_vehicle_id("AutonomousVehiclesX/a"), None);
    }
}
