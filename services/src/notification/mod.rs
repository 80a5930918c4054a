pub mod mailer;

pub use mailer::{Mailer, SmtpMailer};

use crate::{
    error::GenericError,
    events::{Event, EventQueue, PaymentSucceeded, QueuedMessage, UserRegistered, parse_message},
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

pub const VERIFY_SUBJECT: &str = "Verify your MicroShop account";
pub const PAYMENT_SUBJECT: &str = "Payment confirmed - MicroShop";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("message is not a valid event envelope")]
    BadEnvelope,

    #[error("invalid payload for {event_type}: {reason}")]
    InvalidPayload { event_type: String, reason: String },

    #[error("mail delivery failed: {0}")]
    Mail(GenericError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    Sent,
    Ignored,
}

pub fn verify_email_body(verify_url: &str) -> String {
    format!(
        "<h3>Welcome to MicroShop</h3>\
         <p>Please verify your email:</p>\
         <p><a href='{url}'>{url}</a></p>",
        url = verify_url
    )
}

pub fn payment_email_body(event: &PaymentSucceeded) -> String {
    format!(
        "<h3>Payment successful</h3>\
         <p>Order <b>#{}</b> is paid.</p>\
         <p>Total: <b>${}</b></p>",
        event.order_id, event.total
    )
}

fn payload_as<E: Event + DeserializeOwned>(payload: Map<String, Value>) -> Result<E, NotifyError> {
    serde_json::from_value(Value::Object(payload)).map_err(|e| NotifyError::InvalidPayload {
        event_type: E::TYPE.to_string(),
        reason: e.to_string(),
    })
}

/// Sends the email belonging to one event. Unknown event types are ignored.
pub async fn handle_event(
    mailer: &dyn Mailer,
    event_type: &str,
    payload: Map<String, Value>,
) -> Result<Handled, NotifyError> {
    if event_type == UserRegistered::TYPE {
        let event: UserRegistered = payload_as(payload)?;
        mailer
            .send_html(&event.email, VERIFY_SUBJECT, &verify_email_body(&event.verify_url))
            .await
            .map_err(NotifyError::Mail)?;
        info!(email = %event.email, "Sent verification email");
        return Ok(Handled::Sent);
    }

    if event_type == PaymentSucceeded::TYPE {
        let event: PaymentSucceeded = payload_as(payload)?;
        mailer
            .send_html(&event.email, PAYMENT_SUBJECT, &payment_email_body(&event))
            .await
            .map_err(NotifyError::Mail)?;
        info!(email = %event.email, order_id = event.order_id, "Sent payment email");
        return Ok(Handled::Sent);
    }

    info!(event_type, "Ignoring event");
    Ok(Handled::Ignored)
}

pub async fn handle_message(mailer: &dyn Mailer, body: &Value) -> Result<Handled, NotifyError> {
    let (event_type, payload) = parse_message(body).ok_or(NotifyError::BadEnvelope)?;
    handle_event(mailer, &event_type, payload).await
}

/// Result of one batch, failures are queue message ids left for redelivery.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub processed: usize,
    pub failures: Vec<i64>,
}

impl BatchOutcome {
    pub fn is_empty(&self) -> bool {
        self.processed == 0 && self.failures.is_empty()
    }
}

pub struct Notifier {
    queue: Arc<dyn EventQueue>,
    mailer: Arc<dyn Mailer>,
    batch_size: i32,
    max_attempts: i32,
    poll_interval: Duration,
}

impl Notifier {
    pub fn new(
        queue: Arc<dyn EventQueue>,
        mailer: Arc<dyn Mailer>,
        batch_size: i32,
        max_attempts: i32,
        poll_interval: Duration,
    ) -> Self {
        Self {
            queue,
            mailer,
            batch_size: batch_size.max(1),
            max_attempts: max_attempts.max(1),
            poll_interval,
        }
    }

    async fn settle(&self, msg: &QueuedMessage) {
        if let Err(e) = self.queue.mark_processed(msg.msg_id).await {
            warn!(msg_id = msg.msg_id, error = %e, "Could not archive message");
        }
    }

    pub async fn process_batch(&self) -> Result<BatchOutcome, GenericError> {
        let messages = self.queue.fetch_batch(self.batch_size).await?;
        let mut outcome = BatchOutcome::default();

        for msg in &messages {
            match handle_message(self.mailer.as_ref(), &msg.body).await {
                Ok(_) => {
                    self.settle(msg).await;
                    outcome.processed += 1;
                    metrics::counter!("notifications_total", "result" => "processed").increment(1);
                }
                Err(e) => {
                    outcome.failures.push(msg.msg_id);
                    metrics::counter!("notifications_total", "result" => "failed").increment(1);

                    if msg.read_count >= self.max_attempts {
                        error!(
                            msg_id = msg.msg_id,
                            attempts = msg.read_count,
                            error = %e,
                            "Giving up on message, archiving as dead letter"
                        );
                        self.settle(msg).await;
                    } else {
                        warn!(
                            msg_id = msg.msg_id,
                            attempts = msg.read_count,
                            error = %e,
                            "Failed processing message, will retry"
                        );
                    }
                }
            }
        }

        if !messages.is_empty() {
            info!(
                processed = outcome.processed,
                failures = outcome.failures.len(),
                "Batch processed"
            );
        }
        Ok(outcome)
    }

    pub async fn run(&self) {
        info!(batch_size = self.batch_size, "Starting notification worker");
        loop {
            match self.process_batch().await {
                Ok(outcome) if outcome.is_empty() => {
                    debug!("No events to process, sleeping...");
                    sleep(self.poll_interval).await;
                }
                Ok(_) => {}
                Err(e) => {
                    error!("Error reading events: {}", e);
                    sleep(self.poll_interval).await;
                }
            }
        }
    }
}
