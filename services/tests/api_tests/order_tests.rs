use super::mocks::*;
use axum::{Router, http::StatusCode};
use common::api::{OrderOut, OrderStatus, PayOrderOut, ProductOut};
use common::test_helpers::test_utils::build_request;
use rust_decimal::Decimal;
use serde_json::json;
use services::clients::{ProductCatalog, UpstreamError};
use services::events::EventPublisher;
use services::order::{OrderState, router};
use std::sync::Arc;

const BUYER: i64 = 7;

fn buyer_token() -> String {
    token_for(BUYER, "buyer@shop.test", false)
}

fn app_with(orders: Arc<MemoryOrders>, catalog: MockCatalog, events: MockPublisher) -> Router {
    let catalog: Arc<dyn ProductCatalog> = Arc::new(catalog);
    let events: Arc<dyn EventPublisher> = Arc::new(events);
    router(OrderState {
        orders,
        catalog,
        events,
        keys: keys(),
    })
}

fn listed(id: i64, price: Decimal) -> ProductOut {
    ProductOut {
        id,
        name: format!("Product {}", id),
        description: String::new(),
        price,
        published: true,
        image_url: None,
    }
}

fn default_catalog() -> MockCatalog {
    catalog_of(vec![listed(1, Decimal::new(1000, 2)), listed(2, Decimal::new(250, 2))])
}

fn order_body(items: serde_json::Value) -> Option<String> {
    Some(json!({ "items": items }).to_string())
}

#[tokio::test]
async fn test_create_order_prices_and_merges_lines() {
    let orders = Arc::new(MemoryOrders::default());
    let app = app_with(orders.clone(), default_catalog(), quiet_publisher());
    let body = order_body(json!([
        {"product_id": 2, "qty": 1},
        {"product_id": 1, "qty": 2},
        {"product_id": 2, "qty": 3}
    ]));

    let response = send(app, build_request("POST", "/orders", body, Some(&buyer_token())).unwrap()).await;

    assert_eq!(response.status(), StatusCode::OK);
    let order: OrderOut = body_json(response).await;
    assert_eq!(order.status, OrderStatus::Created);
    // 4 x 2.50 + 2 x 10.00
    assert_eq!(order.total, Decimal::new(3000, 2));
    let lines: Vec<(i64, i64)> = order.items.iter().map(|i| (i.product_id, i.qty)).collect();
    assert_eq!(lines, vec![(2, 4), (1, 2)]);

    let stored = orders.orders.lock().unwrap();
    assert_eq!(stored[0].order.user_id, BUYER);
    assert_eq!(stored[0].order.user_email, "buyer@shop.test");
}

#[tokio::test]
async fn test_create_order_validation() {
    let cases = [
        (json!([]), "Empty cart"),
        (json!([{"product_id": 1, "qty": 0}]), "Invalid qty"),
        (json!([{"product_id": 1, "qty": 1}, {"product_id": 2, "qty": -1}]), "Invalid qty"),
    ];
    for (items, detail) in cases {
        // the catalogue must never be consulted for invalid carts
        let mut catalog = MockCatalog::new();
        catalog.expect_fetch_product().never();
        let app = app_with(Arc::new(MemoryOrders::default()), catalog, quiet_publisher());

        let response = send(app, build_request("POST", "/orders", order_body(items), Some(&buyer_token())).unwrap()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_detail(response).await, detail);
    }
}

#[tokio::test]
async fn test_create_order_rejects_overflowing_lines() {
    let orders = Arc::new(MemoryOrders::default());
    let mut catalog = MockCatalog::new();
    catalog.expect_fetch_product().never();
    let half = i64::MAX / 2 + 1;
    let body = order_body(json!([
        {"product_id": 1, "qty": half},
        {"product_id": 1, "qty": half}
    ]));

    let response = send(
        app_with(orders.clone(), catalog, quiet_publisher()),
        build_request("POST", "/orders", body, Some(&buyer_token())).unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_detail(response).await, "Invalid qty");
    assert!(orders.orders.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_order_rejects_overflowing_total() {
    let orders = Arc::new(MemoryOrders::default());
    let catalog = catalog_of(vec![listed(1, Decimal::MAX)]);
    let body = order_body(json!([{"product_id": 1, "qty": 2}]));

    let response = send(
        app_with(orders.clone(), catalog, quiet_publisher()),
        build_request("POST", "/orders", body, Some(&buyer_token())).unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_detail(response).await, "Invalid qty");
    assert!(orders.orders.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_order_unknown_product() {
    let app = app_with(Arc::new(MemoryOrders::default()), default_catalog(), quiet_publisher());
    let body = order_body(json!([{"product_id": 99, "qty": 1}]));

    let response = send(app, build_request("POST", "/orders", body, Some(&buyer_token())).unwrap()).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_detail(response).await, "Product 99 not available");
}

#[tokio::test]
async fn test_create_order_product_service_down() {
    let cases = [
        (UpstreamError::Timeout, "Product service timeout"),
        (UpstreamError::Unavailable("connection refused".to_string()), "Product service unavailable"),
    ];
    for (failure, detail) in cases {
        let mut catalog = MockCatalog::new();
        let mut failure = Some(failure);
        catalog
            .expect_fetch_product()
            .times(1)
            .returning(move |_| Err(failure.take().unwrap()));
        let app = app_with(Arc::new(MemoryOrders::default()), catalog, quiet_publisher());

        let body = order_body(json!([{"product_id": 1, "qty": 1}]));
        let response = send(app, build_request("POST", "/orders", body, Some(&buyer_token())).unwrap()).await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(error_detail(response).await, detail);
    }
}

#[tokio::test]
async fn test_create_order_storage_failure() {
    let app = app_with(Arc::new(MemoryOrders::failing()), default_catalog(), quiet_publisher());
    let body = order_body(json!([{"product_id": 1, "qty": 1}]));

    let response = send(app, build_request("POST", "/orders", body, Some(&buyer_token())).unwrap()).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_detail(response).await, "Failed to create order");
}

#[tokio::test]
async fn test_create_order_requires_login() {
    let app = app_with(Arc::new(MemoryOrders::default()), default_catalog(), quiet_publisher());
    let body = order_body(json!([{"product_id": 1, "qty": 1}]));

    let response = send(app, build_request("POST", "/orders", body, None).unwrap()).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_get_order_is_owner_only() {
    let orders = Arc::new(MemoryOrders::default());
    orders.insert(1, BUYER, "CREATED", Decimal::new(500, 2));
    orders.insert(2, 99, "CREATED", Decimal::new(500, 2));

    let response = send(
        app_with(orders.clone(), default_catalog(), quiet_publisher()),
        build_request("GET", "/orders/1", None, Some(&buyer_token())).unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let order: OrderOut = body_json(response).await;
    assert_eq!(order.id, 1);

    let response = send(
        app_with(orders, default_catalog(), quiet_publisher()),
        build_request("GET", "/orders/2", None, Some(&buyer_token())).unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_detail(response).await, "Not found");
}

#[tokio::test]
async fn test_list_orders_newest_first() {
    let orders = Arc::new(MemoryOrders::default());
    orders.insert(1, BUYER, "PAID", Decimal::new(500, 2));
    orders.insert(2, 99, "CREATED", Decimal::new(500, 2));
    orders.insert(3, BUYER, "CREATED", Decimal::new(700, 2));

    let response = send(
        app_with(orders, default_catalog(), quiet_publisher()),
        build_request("GET", "/orders", None, Some(&buyer_token())).unwrap(),
    )
    .await;

    let list: Vec<OrderOut> = body_json(response).await;
    let ids: Vec<i64> = list.iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![3, 1]);
}

#[tokio::test]
async fn test_get_order_keeps_unrecognized_status() {
    let orders = Arc::new(MemoryOrders::default());
    orders.insert(6, BUYER, "SHIPPED", Decimal::new(500, 2));

    let response = send(
        app_with(orders, default_catalog(), quiet_publisher()),
        build_request("GET", "/orders/6", None, Some(&buyer_token())).unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = body_json(response).await;
    assert_eq!(body["status"], "SHIPPED");
}

#[tokio::test]
async fn test_pay_order_flips_status_and_publishes() {
    let orders = Arc::new(MemoryOrders::default());
    orders.insert(4, BUYER, "CREATED", Decimal::new(1999, 2));
    let mut events = MockPublisher::new();
    events
        .expect_publish()
        .withf(|event_type, payload| event_type.to_string() == "order.paid" && payload["order_id"] == 4)
        .times(1)
        .returning(|_, _| Ok(()));

    let response = send(
        app_with(orders.clone(), default_catalog(), events),
        build_request("POST", "/orders/4/pay", None, Some(&buyer_token())).unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let paid: PayOrderOut = body_json(response).await;
    assert!(paid.ok);
    assert_eq!(paid.status, OrderStatus::Paid);
    assert_eq!(orders.status_of(4).as_deref(), Some("PAID"));
}

#[tokio::test]
async fn test_pay_order_is_idempotent_when_paid() {
    let orders = Arc::new(MemoryOrders::default());
    orders.insert(4, BUYER, "PAID", Decimal::new(1999, 2));
    let mut events = MockPublisher::new();
    events.expect_publish().never();

    let response = send(
        app_with(orders, default_catalog(), events),
        build_request("POST", "/orders/4/pay", None, Some(&buyer_token())).unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let paid: PayOrderOut = body_json(response).await;
    assert_eq!(paid.status, OrderStatus::Paid);
}

#[tokio::test]
async fn test_pay_order_rejects_other_status() {
    let orders = Arc::new(MemoryOrders::default());
    orders.insert(4, BUYER, "CANCELLED", Decimal::new(1999, 2));

    let response = send(
        app_with(orders, default_catalog(), quiet_publisher()),
        build_request("POST", "/orders/4/pay", None, Some(&buyer_token())).unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_detail(response).await, "Cannot pay in status CANCELLED");
}
