use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use services::clients::HttpOrderGateway;
use services::events::PgmqEvents;
use services::executable_utils::{
    initialize_executable, initialize_tracing, install_metrics, serve, with_common_routes,
};
use services::model::payment;
use services::payment::{PaymentState, router};
use services::security::JwtKeys;
use services::storage::ProdStorage;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    println!("Starting payment service...");
    let config = initialize_executable()?;
    initialize_tracing(&config.payment.log_level);
    let metrics = install_metrics()?;

    let storage =
        ProdStorage::connect(&config.common.database_url, &config.payment.db_schema).await?;
    storage.ensure_table(payment::Entity).await?;

    let orders = HttpOrderGateway::new(
        &config.payment.order_url,
        &config.payment.order_mark_paid_path,
        Duration::from_millis(config.payment.http_timeout_ms),
    )?;
    let events = PgmqEvents::new(
        &config.common.database_url,
        &config.common.events_queue,
        config.notification.visibility_timeout_seconds,
    )
    .await?;

    let state = PaymentState {
        payments: Arc::new(storage),
        orders: Arc::new(orders),
        events: Arc::new(events),
        keys: Arc::new(JwtKeys::from_config(&config.common.jwt)),
    };
    let app = with_common_routes(router(state), Some(metrics));
    serve("payment", &config.payment.server_address, app).await
}
