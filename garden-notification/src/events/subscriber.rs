use std::sync::Arc;

use futures_lite::StreamExt;
use lapin::options::BasicAckOptions;

use garden_shared::types::event::{payloads, routing_keys, Event};

use crate::alerts::{AlertEvaluator, AlertSummary};
use crate::AppState;

/// Run the alert check for the owner of every recorded reading.
pub async fn listen_reading_events(
    state: Arc<AppState>,
    rabbitmq: garden_shared::clients::rabbitmq::RabbitMQClient,
) -> anyhow::Result<()> {
    let mut consumer = rabbitmq
        .subscribe(
            "garden-notification.sensor.reading",
            &[routing_keys::SENSOR_READING_RECORDED],
            state.config.reading_prefetch,
        )
        .await?;

    tracing::info!("listening for reading events");
    let evaluator = AlertEvaluator::new(state.deps.clone());

    while let Some(delivery) = consumer.next().await {
        match delivery {
            Ok(delivery) => {
                if let Err(e) = handle_reading(&evaluator, &delivery.data).await {
                    tracing::error!(error = %e, "failed to handle reading.recorded event");
                }

                let _ = delivery.ack(BasicAckOptions::default()).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "reading consumer error");
            }
        }
    }

    Ok(())
}

pub async fn handle_reading(evaluator: &AlertEvaluator, body: &[u8]) -> anyhow::Result<AlertSummary> {
    let event: Event<payloads::ReadingRecorded> = serde_json::from_slice(body)?;
    let data = &event.data;
    tracing::debug!(
        sensor_id = %data.sensor_id,
        user_id = %data.user_id,
        value = data.value,
        "received reading.recorded event"
    );

    Ok(evaluator.check_alerts(data.user_id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Harness;
    use uuid::Uuid;

    fn reading(user_id: Uuid, sensor_id: Uuid, value: f64) -> Vec<u8> {
        let event = Event::new(
            "garden-sensor",
            routing_keys::SENSOR_READING_RECORDED,
            payloads::ReadingRecorded {
                reading_id: Uuid::now_v7(),
                sensor_id,
                user_id,
                value,
                battery_level: None,
            },
        )
        .with_user(user_id);
        serde_json::to_vec(&event).unwrap()
    }

    #[tokio::test]
    async fn reading_event_triggers_alert_check() {
        let h = Harness::new();
        h.settings.put(h.user, serde_json::json!({ "moisture_alert": true }));
        let sensor = h.sensors.add(h.user, "s1", "Mint", 90, Some(70.0), 30.0, 60.0);

        let summary = handle_reading(&h.evaluator(), &reading(h.user, sensor, 70.0))
            .await
            .unwrap();
        assert_eq!(summary.moisture, 1);
        assert!(h.repo.all()[0].message.contains("high"));
    }

    #[tokio::test]
    async fn malformed_event_is_an_error() {
        let h = Harness::new();
        assert!(handle_reading(&h.evaluator(), b"{\"nope\":1}").await.is_err());
        assert!(h.repo.all().is_empty());
    }
}
