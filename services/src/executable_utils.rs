use axum::{Json, Router, routing::get};
use clap::Parser;
use common::{api::OkOut, config::Config};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::{error::Error, fmt::Debug, path::PathBuf};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to config file
    #[arg(short, long, default_value = "target/debug/config/total_config.yaml")]
    pub config: String,
}

/// Startup line for the `.env` lookup, printed since tracing isn't set up yet.
pub fn env_file_note(loaded: &Result<PathBuf, dotenvy::Error>) -> String {
    match loaded {
        Ok(path) => format!("Loaded environment from: {}", path.display()),
        Err(_) => "No .env file loaded".to_string(),
    }
}

/// Parses arguments, loads `.env` and the merged YAML config.
pub fn initialize_executable() -> Result<Config, Box<dyn Error + Send + Sync>> {
    let args = Args::parse();
    // A missing .env is normal outside local development
    let dotenv = dotenvy::dotenv();

    let config = Config::load(&args.config)?;
    println!("{}", env_file_note(&dotenv));
    println!("Loaded config from: {}", args.config);

    Ok(config)
}

/// `RUST_LOG` wins over the configured level.
pub fn initialize_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub fn install_metrics() -> Result<PrometheusHandle, Box<dyn Error + Send + Sync>> {
    Ok(PrometheusBuilder::new().install_recorder()?)
}

pub async fn health_check() -> Json<OkOut> {
    Json(OkOut { ok: true })
}

/// Adds `/health`, optional `/metrics`, request tracing and permissive CORS.
pub fn with_common_routes(app: Router, metrics: Option<PrometheusHandle>) -> Router {
    let mut app = app.route("/health", get(health_check));
    if let Some(handle) = metrics {
        app = app.route(
            "/metrics",
            get(move || {
                let handle = handle.clone();
                async move { handle.render() }
            }),
        );
    }

    app.layer(TraceLayer::new_for_http()).layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    )
}

pub async fn serve(
    name: &str,
    server_address: &str,
    app: Router,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing::info!("Starting {} service at {}", name, server_address);
    let listener = tokio::net::TcpListener::bind(server_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
