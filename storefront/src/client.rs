use crate::error::ClientError;
use common::api::{
    LoginIn, MeOut, ModelId, OrderCreateIn, OrderOut, PaymentCreateIn, PaymentCreateOut, PaymentOut,
    ProductOut, RegisterIn, TokenOut,
};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Base URLs of the MicroShop HTTP services.
#[derive(Debug, Clone)]
pub struct ServiceUrls {
    pub auth: String,
    pub product: String,
    pub order: String,
    pub payment: String,
}

impl ServiceUrls {
    /// All services behind one origin, as in the test server.
    pub fn single(base_url: &str) -> Self {
        Self {
            auth: base_url.to_string(),
            product: base_url.to_string(),
            order: base_url.to_string(),
            payment: base_url.to_string(),
        }
    }
}

fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Picks the message to show for a failed response.
///
/// The services answer `{"detail": "..."}`; request validation failures carry a
/// list of `{"msg": ...}` objects instead.
pub fn error_detail(status: StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("detail").cloned());

    match detail {
        Some(Value::String(message)) if !message.is_empty() => message,
        Some(Value::Array(errors)) => errors
            .first()
            .and_then(|e| e.get("msg"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Request failed ({})", status.as_u16())),
        _ => format!("Request failed ({})", status.as_u16()),
    }
}

/// Typed REST client for the storefront.
#[derive(Clone)]
pub struct ShopClient {
    http: Client,
    urls: ServiceUrls,
}

impl ShopClient {
    pub fn new(urls: ServiceUrls, timeout: Duration) -> Result<Self, ClientError> {
        Ok(Self {
            http: Client::builder().timeout(timeout).build()?,
            urls,
        })
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<MeOut, ClientError> {
        let body = RegisterIn {
            email: email.to_string(),
            password: password.to_string(),
        };
        let request = self.http.post(join_url(&self.urls.auth, "auth/register")).json(&body);
        self.send(request, false).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<TokenOut, ClientError> {
        let body = LoginIn {
            email: email.to_string(),
            password: password.to_string(),
        };
        let request = self.http.post(join_url(&self.urls.auth, "auth/login")).json(&body);
        self.send(request, false).await
    }

    pub async fn me(&self, token: &str) -> Result<MeOut, ClientError> {
        let request = self.http.get(join_url(&self.urls.auth, "auth/me")).bearer_auth(token);
        self.send(request, true).await
    }

    pub async fn list_products(&self) -> Result<Vec<ProductOut>, ClientError> {
        let request = self.http.get(join_url(&self.urls.product, "products"));
        self.send(request, false).await
    }

    pub async fn create_order(&self, token: &str, order: &OrderCreateIn) -> Result<OrderOut, ClientError> {
        let request = self
            .http
            .post(join_url(&self.urls.order, "orders"))
            .bearer_auth(token)
            .json(order);
        self.send(request, true).await
    }

    pub async fn get_order(&self, token: &str, order_id: ModelId) -> Result<OrderOut, ClientError> {
        let request = self
            .http
            .get(join_url(&self.urls.order, &format!("orders/{}", order_id)))
            .bearer_auth(token);
        self.send(request, true).await
    }

    pub async fn list_orders(&self, token: &str) -> Result<Vec<OrderOut>, ClientError> {
        let request = self.http.get(join_url(&self.urls.order, "orders")).bearer_auth(token);
        self.send(request, true).await
    }

    pub async fn create_payment(
        &self,
        token: &str,
        order_id: ModelId,
        payment: &PaymentCreateIn,
    ) -> Result<PaymentCreateOut, ClientError> {
        let request = self
            .http
            .post(join_url(&self.urls.payment, &format!("payments/{}", order_id)))
            .bearer_auth(token)
            .json(payment);
        self.send(request, true).await
    }

    pub async fn list_payments(&self, token: &str) -> Result<Vec<PaymentOut>, ClientError> {
        let request = self.http.get(join_url(&self.urls.payment, "payments")).bearer_auth(token);
        self.send(request, true).await
    }

    /// Sends the request and decodes a 2xx body.
    ///
    /// 401/403 on an authenticated call means the token is no longer good; on
    /// anonymous calls (login) they are ordinary errors with a detail.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, authenticated: bool) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        debug!(url = %response.url(), status = status.as_u16(), "Response received");

        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        if authenticated && matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            warn!(status = status.as_u16(), "Session rejected by service");
            return Err(ClientError::SessionExpired);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ClientError::Api {
            status: status.as_u16(),
            detail: error_detail(status, &body),
        })
    }
}
