use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use services::clients::HttpProductCatalog;
use services::events::PgmqEvents;
use services::executable_utils::{
    initialize_executable, initialize_tracing, install_metrics, serve, with_common_routes,
};
use services::model::{order, order_item};
use services::order::{OrderState, router};
use services::security::JwtKeys;
use services::storage::ProdStorage;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    println!("Starting order service...");
    let config = initialize_executable()?;
    initialize_tracing(&config.order.log_level);
    let metrics = install_metrics()?;

    let storage = ProdStorage::connect(&config.common.database_url, &config.order.db_schema).await?;
    storage.ensure_table(order::Entity).await?;
    storage.ensure_table(order_item::Entity).await?;

    let catalog = HttpProductCatalog::new(
        &config.order.product_url,
        Duration::from_millis(config.order.http_timeout_ms),
    )?;
    let events = PgmqEvents::new(
        &config.common.database_url,
        &config.common.events_queue,
        config.notification.visibility_timeout_seconds,
    )
    .await?;

    let state = OrderState {
        orders: Arc::new(storage),
        catalog: Arc::new(catalog),
        events: Arc::new(events),
        keys: Arc::new(JwtKeys::from_config(&config.common.jwt)),
    };
    let app = with_common_routes(router(state), Some(metrics));
    serve("order", &config.order.server_address, app).await
}
