use uuid::Uuid;

use garden_shared::clients::rabbitmq::RabbitMQClient;
use garden_shared::types::event::{payloads, routing_keys, Event};

use crate::models::Reading;

pub fn reading_recorded_event(reading: &Reading, user_id: Uuid) -> Event<payloads::ReadingRecorded> {
    Event::new(
        "garden-sensor",
        routing_keys::SENSOR_READING_RECORDED,
        payloads::ReadingRecorded {
            reading_id: reading.id,
            sensor_id: reading.sensor_id,
            user_id,
            value: reading.value,
            battery_level: reading.battery_level,
        },
    )
    .with_user(user_id)
}

pub async fn publish_reading_recorded(rabbitmq: &RabbitMQClient, reading: &Reading, user_id: Uuid) {
    let event = reading_recorded_event(reading, user_id);

    if let Err(e) = rabbitmq.publish(&event).await {
        tracing::error!(
            error = %e,
            sensor_id = %reading.sensor_id,
            "failed to publish sensor.reading.recorded event"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn event_carries_owner_and_reading() {
        let reading = Reading {
            id: Uuid::now_v7(),
            sensor_id: Uuid::now_v7(),
            value: 27.5,
            battery_level: Some(18),
            recorded_at: Utc::now(),
        };
        let owner = Uuid::now_v7();

        let event = reading_recorded_event(&reading, owner);
        assert_eq!(event.source, "garden-sensor");
        assert_eq!(event.user_id, Some(owner));
        assert_eq!(event.data.user_id, owner);
        assert_eq!(event.data.sensor_id, reading.sensor_id);
        assert_eq!(event.data.battery_level, Some(18));
    }
}
