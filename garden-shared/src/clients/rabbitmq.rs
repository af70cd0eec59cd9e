//! Event bus over a single durable topic exchange.
//!
//! Events are routed by their own `event_type`, so a publisher cannot send an
//! envelope under a key that disagrees with its payload.

use lapin::options::{
    BasicConsumeOptions, BasicPublishOptions, BasicQosOptions, ExchangeDeclareOptions,
    QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, Consumer, ExchangeKind};
use serde::Serialize;

use crate::types::Event;

pub const EXCHANGE_NAME: &str = "garden.events";

const PERSISTENT: u8 = 2;

#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("amqp error: {0}")]
    Amqp(#[from] lapin::Error),

    #[error("event encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Clone)]
pub struct RabbitMQClient {
    channel: Channel,
}

impl RabbitMQClient {
    pub async fn connect(url: &str) -> Result<Self, BusError> {
        let conn = Connection::connect(url, ConnectionProperties::default()).await?;
        let channel = conn.create_channel().await?;

        let durable = ExchangeDeclareOptions { durable: true, ..Default::default() };
        channel
            .exchange_declare(EXCHANGE_NAME, ExchangeKind::Topic, durable, FieldTable::default())
            .await?;

        tracing::info!(exchange = EXCHANGE_NAME, "connected to RabbitMQ");
        Ok(Self { channel })
    }

    /// Publish `event` under its `event_type` and wait for the broker confirm.
    pub async fn publish<T: Serialize>(&self, event: &Event<T>) -> Result<(), BusError> {
        let payload = serde_json::to_vec(event)?;
        let properties = BasicProperties::default()
            .with_content_type("application/json".into())
            .with_delivery_mode(PERSISTENT);

        self.channel
            .basic_publish(
                EXCHANGE_NAME,
                &event.event_type,
                BasicPublishOptions::default(),
                &payload,
                properties,
            )
            .await?
            .await?;

        tracing::debug!(routing_key = %event.event_type, event_id = %event.id, "event published");
        Ok(())
    }

    /// Declare a durable queue bound to `routing_keys` and start consuming it.
    ///
    /// At most `prefetch` deliveries are in flight before the consumer acks.
    pub async fn subscribe(
        &self,
        queue_name: &str,
        routing_keys: &[&str],
        prefetch: u16,
    ) -> Result<Consumer, BusError> {
        self.channel.basic_qos(prefetch, BasicQosOptions::default()).await?;

        let durable = QueueDeclareOptions { durable: true, ..Default::default() };
        self.channel
            .queue_declare(queue_name, durable, FieldTable::default())
            .await?;

        for key in routing_keys {
            self.channel
                .queue_bind(queue_name, EXCHANGE_NAME, key, QueueBindOptions::default(), FieldTable::default())
                .await?;
        }

        let consumer = self
            .channel
            .basic_consume(
                queue_name,
                &format!("{queue_name}-consumer"),
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        tracing::info!(queue = %queue_name, bindings = ?routing_keys, prefetch, "subscribed");
        Ok(consumer)
    }
}
