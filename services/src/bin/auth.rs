use std::error::Error;
use std::sync::Arc;

use services::auth::{AuthState, router};
use services::events::PgmqEvents;
use services::executable_utils::{
    initialize_executable, initialize_tracing, install_metrics, serve, with_common_routes,
};
use services::model::user;
use services::security::JwtKeys;
use services::storage::ProdStorage;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    println!("Starting auth service...");
    let config = initialize_executable()?;
    initialize_tracing(&config.auth.log_level);
    let metrics = install_metrics()?;

    let storage = ProdStorage::connect(&config.common.database_url, &config.auth.db_schema).await?;
    storage.ensure_table(user::Entity).await?;
    let events = PgmqEvents::new(
        &config.common.database_url,
        &config.common.events_queue,
        config.notification.visibility_timeout_seconds,
    )
    .await?;

    let state = AuthState {
        users: Arc::new(storage),
        keys: Arc::new(JwtKeys::from_config(&config.common.jwt)),
        events: Arc::new(events),
        verify_url_base: config.auth.verify_url_base.clone(),
    };
    let app = with_common_routes(router(state), Some(metrics));
    serve("auth", &config.auth.server_address, app).await
}
