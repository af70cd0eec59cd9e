use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// RabbitMQ event envelope wrapping all domain events.
///
/// Routing key format: `garden.{domain}.{entity}.{action}`
/// Example: `garden.sensor.reading.recorded`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event<T: Serialize> {
    pub id: Uuid,
    pub source: String,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: Option<Uuid>,
    pub data: T,
}

impl<T: Serialize> Event<T> {
    pub fn new(source: impl Into<String>, event_type: impl Into<String>, data: T) -> Self {
        Self {
            id: Uuid::now_v7(),
            source: source.into(),
            event_type: event_type.into(),
            timestamp: Utc::now(),
            user_id: None,
            data,
        }
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }
}

/// RabbitMQ routing keys
pub mod routing_keys {
    pub const SENSOR_READING_RECORDED: &str = "garden.sensor.reading.recorded";
}

pub mod payloads {
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ReadingRecorded {
        pub reading_id: Uuid,
        pub sensor_id: Uuid,
        pub user_id: Uuid,
        pub value: f64,
        pub battery_level: Option<i32>,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_carries_user_and_payload() {
        let user_id = Uuid::now_v7();
        let event = Event::new(
            "garden-sensor",
            routing_keys::SENSOR_READING_RECORDED,
            payloads::ReadingRecorded {
                reading_id: Uuid::now_v7(),
                sensor_id: Uuid::now_v7(),
                user_id,
                value: 42.5,
                battery_level: Some(80),
            },
        )
        .with_user(user_id);

        let bytes = serde_json::to_vec(&event).unwrap();
        let decoded: Event<payloads::ReadingRecorded> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded.user_id, Some(user_id));
        assert_eq!(decoded.event_type, "garden.sensor.reading.recorded");
        assert_eq!(decoded.data.value, 42.5);
    }
}
