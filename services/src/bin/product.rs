use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use services::executable_utils::{
    initialize_executable, initialize_tracing, install_metrics, serve, with_common_routes,
};
use services::model::product;
use services::product::{ProductState, router};
use services::security::JwtKeys;
use services::storage::ProdStorage;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    println!("Starting product service...");
    let config = initialize_executable()?;
    initialize_tracing(&config.product.log_level);
    let metrics = install_metrics()?;

    let storage =
        ProdStorage::connect(&config.common.database_url, &config.product.db_schema).await?;
    storage.ensure_table(product::Entity).await?;

    let upload_dir = PathBuf::from(&config.product.upload_dir);
    tokio::fs::create_dir_all(&upload_dir).await?;

    let state = ProductState {
        products: Arc::new(storage),
        keys: Arc::new(JwtKeys::from_config(&config.common.jwt)),
        upload_dir,
    };
    let app = with_common_routes(router(state), Some(metrics));
    serve("product", &config.product.server_address, app).await
}
