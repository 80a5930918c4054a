use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use services::events::PgmqEvents;
use services::executable_utils::{initialize_executable, initialize_tracing};
use services::notification::{Notifier, SmtpMailer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    println!("Starting notifier...");
    let config = initialize_executable()?;
    let settings = config.notification;
    initialize_tracing(&settings.log_level);

    let queue = PgmqEvents::new(
        &config.common.database_url,
        &config.common.events_queue,
        settings.visibility_timeout_seconds,
    )
    .await?;
    let mailer = SmtpMailer::new(&settings.smtp)?;

    let notifier = Notifier::new(
        Arc::new(queue),
        Arc::new(mailer),
        settings.batch_size,
        settings.max_attempts,
        Duration::from_millis(settings.poll_interval_ms),
    );
    notifier.run().await;

    Ok(())
}
