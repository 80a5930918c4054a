use crate::{
    clients::{OrderGateway, UpstreamError},
    error::ApiError,
    events::{EventPublisher, PaymentSucceeded, publish_best_effort},
    model::NewPayment,
    security::{AuthUser, JwtKeys},
    storage::PaymentStorage,
};
use axum::{
    Json, Router,
    extract::{FromRef, Path, State},
    routing::{get, post},
};
use common::{
    api::{ModelId, OrderStatus, PaymentCreateIn, PaymentCreateOut, PaymentOut, PaymentStatus},
    phone::PhoneNumber,
};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct PaymentState {
    pub payments: Arc<dyn PaymentStorage>,
    pub orders: Arc<dyn OrderGateway>,
    pub events: Arc<dyn EventPublisher>,
    pub keys: Arc<JwtKeys>,
}

impl FromRef<PaymentState> for Arc<JwtKeys> {
    fn from_ref(state: &PaymentState) -> Self {
        state.keys.clone()
    }
}

pub fn router(state: PaymentState) -> Router {
    Router::new()
        .route("/payments", get(list_payments))
        .route("/payments/{id}", get(get_payment).post(create_payment))
        .with_state(state)
}

fn order_error(err: UpstreamError) -> ApiError {
    match err {
        UpstreamError::Timeout => ApiError::ServiceUnavailable("Order service timeout".to_string()),
        UpstreamError::Unavailable(_) => {
            ApiError::ServiceUnavailable("Order service unavailable".to_string())
        }
        UpstreamError::Unauthorized => {
            ApiError::Unauthorized("Unauthorized to access order".to_string())
        }
        UpstreamError::Status(_) | UpstreamError::Decode(_) => ApiError::bad_request("Order not found"),
    }
}

/// Checked shipping details, the phone in normalized form.
pub fn validate_shipping(input: &PaymentCreateIn) -> Result<(String, PhoneNumber), ApiError> {
    let address = input.shipping_address.trim();
    if address.is_empty() {
        return Err(ApiError::bad_request("Shipping address is required"));
    }
    let phone = PhoneNumber::parse(&input.phone_number)
        .map_err(|_| ApiError::bad_request("Invalid phone number"))?;
    Ok((address.to_string(), phone))
}

// The path segment is the order id here, GET uses it as the payment id
async fn create_payment(
    State(state): State<PaymentState>,
    user: AuthUser,
    Path(order_id): Path<ModelId>,
    Json(input): Json<PaymentCreateIn>,
) -> Result<Json<PaymentCreateOut>, ApiError> {
    let (shipping_address, phone) = validate_shipping(&input)?;

    if let Some(existing) = state.payments.find_order_payment(order_id, user.user_id).await? {
        if existing.status == PaymentStatus::Success.to_string() {
            return Ok(Json(PaymentCreateOut {
                ok: true,
                payment_id: existing.id,
            }));
        }
        return Err(ApiError::bad_request("Payment already attempted"));
    }

    let order = state
        .orders
        .fetch_order(order_id, &user.token)
        .await
        .map_err(order_error)?;
    if order.status != OrderStatus::Created {
        return Err(ApiError::bad_request(format!(
            "Cannot pay order in status {}",
            order.status
        )));
    }

    let payment = state
        .payments
        .create_payment(NewPayment {
            order_id,
            user_id: user.user_id,
            amount: order.total,
            status: PaymentStatus::Success,
            shipping_address: shipping_address.clone(),
            phone_number: phone.as_str().to_string(),
        })
        .await
        .map_err(|e| ApiError::internal("Failed to create payment", e))?;

    info!(payment_id = payment.id, order_id, user_id = user.user_id, "Payment recorded");
    metrics::counter!("payments_total", "status" => PaymentStatus::Success.to_string()).increment(1);

    let event = PaymentSucceeded {
        email: user.email.clone(),
        order_id,
        total: order.total,
        user_id: Some(user.user_id),
        shipping_address: Some(shipping_address),
        phone_number: Some(phone.into_string()),
    };
    publish_best_effort(state.events.as_ref(), &event).await;

    if let Err(e) = state.orders.mark_paid(order_id, &user.token).await {
        warn!(order_id, error = %e, "Could not mark order paid");
    }

    Ok(Json(PaymentCreateOut {
        ok: true,
        payment_id: payment.id,
    }))
}

async fn get_payment(
    State(state): State<PaymentState>,
    user: AuthUser,
    Path(id): Path<ModelId>,
) -> Result<Json<PaymentOut>, ApiError> {
    let payment = state
        .payments
        .get_user_payment(id, user.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Payment not found"))?;
    Ok(Json(PaymentOut::from(&payment)))
}

async fn list_payments(
    State(state): State<PaymentState>,
    user: AuthUser,
) -> Result<Json<Vec<PaymentOut>>, ApiError> {
    let payments = state.payments.list_user_payments(user.user_id).await?;
    Ok(Json(payments.iter().map(PaymentOut::from).collect()))
}
