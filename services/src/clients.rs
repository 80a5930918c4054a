use crate::error::GenericError;
use async_trait::async_trait;
use common::api::{ModelId, OrderOut, ProductOut};
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

/// Failure talking to another MicroShop service.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request timed out")]
    Timeout,

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            UpstreamError::Timeout
        } else if e.is_decode() {
            UpstreamError::Decode(e.to_string())
        } else {
            UpstreamError::Unavailable(e.to_string())
        }
    }
}

fn build_client(timeout: Duration) -> Result<Client, GenericError> {
    Ok(Client::builder().timeout(timeout).build()?)
}

fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn record_latency(service: &'static str, started: Instant) {
    metrics::histogram!("upstream_request_duration_seconds", "service" => service)
        .record(started.elapsed().as_secs_f64());
}

/// Read access to the product catalogue, used to price orders.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn fetch_product(&self, product_id: ModelId) -> Result<ProductOut, UpstreamError>;
}

pub struct HttpProductCatalog {
    client: Client,
    base_url: String,
}

impl HttpProductCatalog {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GenericError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.to_string(),
        })
    }
}

#[async_trait]
impl ProductCatalog for HttpProductCatalog {
    async fn fetch_product(&self, product_id: ModelId) -> Result<ProductOut, UpstreamError> {
        let url = join_url(&self.base_url, &format!("products/{}", product_id));
        let started = Instant::now();
        let response = self.client.get(&url).send().await;
        record_latency("product", started);

        let response = response?;
        if response.status() != StatusCode::OK {
            debug!(product_id, status = %response.status(), "Product lookup failed");
            return Err(UpstreamError::Status(response.status().as_u16()));
        }
        Ok(response.json::<ProductOut>().await?)
    }
}

/// Order service as seen by the payment service, always on behalf of the caller.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    async fn fetch_order(&self, order_id: ModelId, token: &str) -> Result<OrderOut, UpstreamError>;

    /// Flips the order to PAID. A no-op when no path is configured.
    async fn mark_paid(&self, order_id: ModelId, token: &str) -> Result<(), UpstreamError>;
}

pub struct HttpOrderGateway {
    client: Client,
    base_url: String,
    mark_paid_path: Option<String>,
}

impl HttpOrderGateway {
    pub fn new(
        base_url: &str,
        mark_paid_path: &str,
        timeout: Duration,
    ) -> Result<Self, GenericError> {
        let mark_paid_path = Some(mark_paid_path.trim())
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.to_string(),
            mark_paid_path,
        })
    }

    fn mark_paid_url(&self, order_id: ModelId) -> Option<String> {
        self.mark_paid_path.as_ref().map(|path| {
            join_url(
                &self.base_url,
                &path.replace("{order_id}", &order_id.to_string()),
            )
        })
    }
}

#[async_trait]
impl OrderGateway for HttpOrderGateway {
    async fn fetch_order(&self, order_id: ModelId, token: &str) -> Result<OrderOut, UpstreamError> {
        let url = join_url(&self.base_url, &format!("orders/{}", order_id));
        let started = Instant::now();
        let response = self.client.get(&url).bearer_auth(token).send().await;
        record_latency("order", started);

        let response = response?;
        match response.status() {
            StatusCode::OK => Ok(response.json::<OrderOut>().await?),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(UpstreamError::Unauthorized),
            status => Err(UpstreamError::Status(status.as_u16())),
        }
    }

    async fn mark_paid(&self, order_id: ModelId, token: &str) -> Result<(), UpstreamError> {
        let Some(url) = self.mark_paid_url(order_id) else {
            return Ok(());
        };

        let response = self.client.post(&url).bearer_auth(token).send().await?;
        if !response.status().is_success() {
            return Err(UpstreamError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}
