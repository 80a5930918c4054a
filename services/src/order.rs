use crate::{
    clients::{ProductCatalog, UpstreamError},
    error::ApiError,
    events::{EventPublisher, OrderPaid, publish_best_effort},
    model::{NewOrder, NewOrderItem},
    security::{AuthUser, JwtKeys},
    storage::OrderStorage,
};
use axum::{
    Json, Router,
    extract::{FromRef, Path, State},
    routing::{get, post},
};
use common::api::{ModelId, OrderCreateIn, OrderItemIn, OrderOut, OrderStatus, PayOrderOut};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Clone)]
pub struct OrderState {
    pub orders: Arc<dyn OrderStorage>,
    pub catalog: Arc<dyn ProductCatalog>,
    pub events: Arc<dyn EventPublisher>,
    pub keys: Arc<JwtKeys>,
}

impl FromRef<OrderState> for Arc<JwtKeys> {
    fn from_ref(state: &OrderState) -> Self {
        state.keys.clone()
    }
}

pub fn router(state: OrderState) -> Router {
    Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/{id}", get(get_order))
        .route("/orders/{id}/pay", post(pay_order))
        .with_state(state)
}

fn invalid_qty() -> ApiError {
    ApiError::bad_request("Invalid qty")
}

/// Validates the requested lines and merges repeated products.
///
/// Quantities of the same product are summed, lines keep the order in which each
/// product first appeared.
pub fn merge_items(items: &[OrderItemIn]) -> Result<Vec<OrderItemIn>, ApiError> {
    if items.is_empty() {
        return Err(ApiError::bad_request("Empty cart"));
    }
    if items.iter().any(|item| item.qty <= 0) {
        return Err(invalid_qty());
    }

    let mut merged: Vec<OrderItemIn> = Vec::with_capacity(items.len());
    for item in items {
        match merged.iter_mut().find(|m| m.product_id == item.product_id) {
            Some(existing) => {
                existing.qty = existing
                    .qty
                    .checked_add(item.qty)
                    .ok_or_else(invalid_qty)?;
            }
            None => merged.push(item.clone()),
        }
    }
    Ok(merged)
}

fn catalog_error(product_id: ModelId, err: UpstreamError) -> ApiError {
    match err {
        UpstreamError::Timeout => ApiError::ServiceUnavailable("Product service timeout".to_string()),
        UpstreamError::Unavailable(_) => {
            ApiError::ServiceUnavailable("Product service unavailable".to_string())
        }
        _ => ApiError::bad_request(format!("Product {} not available", product_id)),
    }
}

async fn create_order(
    State(state): State<OrderState>,
    user: AuthUser,
    Json(input): Json<OrderCreateIn>,
) -> Result<Json<OrderOut>, ApiError> {
    let merged = merge_items(&input.items)?;

    let mut lines = Vec::with_capacity(merged.len());
    let mut total = Decimal::ZERO;
    for item in merged {
        let product = state
            .catalog
            .fetch_product(item.product_id)
            .await
            .map_err(|e| catalog_error(item.product_id, e))?;

        total = product
            .price
            .checked_mul(Decimal::from(item.qty))
            .and_then(|line_total| total.checked_add(line_total))
            .ok_or_else(invalid_qty)?;
        lines.push(NewOrderItem {
            product_id: item.product_id,
            qty: item.qty,
            unit_price: product.price,
        });
    }

    let record = state
        .orders
        .create_order(NewOrder {
            user_id: user.user_id,
            user_email: user.email.clone(),
            total,
            items: lines,
        })
        .await
        .map_err(|e| ApiError::internal("Failed to create order", e))?;

    info!(order_id = record.order.id, user_id = user.user_id, %total, "Order created");
    metrics::counter!("orders_created_total").increment(1);

    Ok(Json(OrderOut::from(&record)))
}

async fn list_orders(
    State(state): State<OrderState>,
    user: AuthUser,
) -> Result<Json<Vec<OrderOut>>, ApiError> {
    let records = state.orders.list_user_orders(user.user_id).await?;
    Ok(Json(records.iter().map(OrderOut::from).collect()))
}

async fn get_order(
    State(state): State<OrderState>,
    user: AuthUser,
    Path(id): Path<ModelId>,
) -> Result<Json<OrderOut>, ApiError> {
    let record = state
        .orders
        .get_user_order(id, user.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Not found"))?;
    Ok(Json(OrderOut::from(&record)))
}

async fn pay_order(
    State(state): State<OrderState>,
    user: AuthUser,
    Path(id): Path<ModelId>,
) -> Result<Json<PayOrderOut>, ApiError> {
    let record = state
        .orders
        .get_user_order(id, user.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Not found"))?;

    match record.status() {
        OrderStatus::Paid => {
            return Ok(Json(PayOrderOut {
                ok: true,
                status: OrderStatus::Paid,
            }));
        }
        OrderStatus::Created => {}
        other => {
            return Err(ApiError::bad_request(format!("Cannot pay in status {}", other)));
        }
    }

    if !state.orders.set_order_status(id, OrderStatus::Paid).await? {
        error!(order_id = id, "Order vanished while marking it paid");
        return Err(ApiError::not_found("Not found"));
    }
    info!(order_id = id, user_id = user.user_id, "Order marked paid");

    let event = OrderPaid {
        email: record.order.user_email.clone(),
        order_id: id,
        total: record.order.total,
    };
    publish_best_effort(state.events.as_ref(), &event).await;

    Ok(Json(PayOrderOut {
        ok: true,
        status: OrderStatus::Paid,
    }))
}
