use crate::error::GenericError;
use async_trait::async_trait;
use common::api::ModelId;
use pgmq::{Message, PGMQueue};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

/// A domain event, published as `{"type": TYPE, "payload": <self>}`.
pub trait Event: Serialize + Send + Sync {
    const TYPE: &'static str;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRegistered {
    pub email: String,
    pub verify_url: String,
}

impl Event for UserRegistered {
    const TYPE: &'static str = "user.registered";
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentSucceeded {
    pub email: String,
    pub order_id: ModelId,
    pub total: Decimal,
    #[serde(default)]
    pub user_id: Option<ModelId>,
    #[serde(default)]
    pub shipping_address: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

impl Event for PaymentSucceeded {
    const TYPE: &'static str = "payment.succeeded";
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderPaid {
    pub email: String,
    pub order_id: ModelId,
    pub total: Decimal,
}

impl Event for OrderPaid {
    const TYPE: &'static str = "order.paid";
}

pub fn envelope(event_type: &str, payload: Value) -> Value {
    json!({ "type": event_type, "payload": payload })
}

/// Empty strings, zero, `false`, empty arrays and objects, and null.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Splits a queue message into event type and payload.
///
/// The name comes from `type`, or from `event_type` when `type` is missing or blank.
/// A missing or blank payload counts as empty, any other payload must be an object.
pub fn parse_message(body: &Value) -> Option<(String, Map<String, Value>)> {
    let obj = body.as_object()?;
    let event_type = obj
        .get("type")
        .filter(|v| !is_blank(v))
        .or_else(|| obj.get("event_type"))?
        .as_str()?;

    let payload = match obj.get("payload") {
        None => Map::new(),
        Some(v) if is_blank(v) => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(_) => return None,
    };

    Some((event_type.to_string(), payload))
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event_type: &str, payload: Value) -> Result<(), GenericError>;
}

pub async fn publish_event<E: Event>(publisher: &dyn EventPublisher, event: &E) -> Result<(), GenericError> {
    publisher.publish(E::TYPE, serde_json::to_value(event)?).await
}

/// Publishes without failing the caller, the request already succeeded.
pub async fn publish_best_effort<E: Event>(publisher: &dyn EventPublisher, event: &E) {
    match publish_event(publisher, event).await {
        Ok(()) => debug!(event_type = E::TYPE, "Event published"),
        Err(e) => warn!(event_type = E::TYPE, error = %e, "Event publish failed"),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueuedMessage {
    pub msg_id: i64,
    /// How many times the message has been handed out, including this one.
    pub read_count: i32,
    pub body: Value,
}

// Consumer side of the events queue
#[async_trait]
pub trait EventQueue: Send + Sync {
    async fn fetch_batch(&self, max_messages: i32) -> Result<Vec<QueuedMessage>, GenericError>;
    async fn mark_processed(&self, msg_id: i64) -> Result<(), GenericError>;
}

/// Events queue on top of the `pgmq` Postgres extension.
pub struct PgmqEvents {
    queue: PGMQueue,
    queue_name: String,
    visibility_timeout_seconds: i32,
}

impl PgmqEvents {
    pub async fn new(
        database_url: &str,
        queue_name: &str,
        visibility_timeout_seconds: i32,
    ) -> Result<Self, GenericError> {
        info!("Connecting to events queue '{}'", queue_name);
        let queue = PGMQueue::new(database_url.to_string()).await?;
        queue.create(queue_name).await?;

        Ok(Self {
            queue,
            queue_name: queue_name.to_string(),
            visibility_timeout_seconds,
        })
    }
}

#[async_trait]
impl EventPublisher for PgmqEvents {
    async fn publish(&self, event_type: &str, payload: Value) -> Result<(), GenericError> {
        let msg_id = self
            .queue
            .send(&self.queue_name, &envelope(event_type, payload))
            .await?;
        debug!(msg_id, event_type, "Enqueued event");
        Ok(())
    }
}

#[async_trait]
impl EventQueue for PgmqEvents {
    async fn fetch_batch(&self, max_messages: i32) -> Result<Vec<QueuedMessage>, GenericError> {
        let messages: Option<Vec<Message<Value>>> = self
            .queue
            .read_batch(&self.queue_name, Some(self.visibility_timeout_seconds), max_messages)
            .await?;

        Ok(messages
            .unwrap_or_default()
            .into_iter()
            .map(|msg| QueuedMessage {
                msg_id: msg.msg_id,
                read_count: msg.read_ct,
                body: msg.message,
            })
            .collect())
    }

    async fn mark_processed(&self, msg_id: i64) -> Result<(), GenericError> {
        self.queue.archive(&self.queue_name, msg_id).await?;
        Ok(())
    }
}
