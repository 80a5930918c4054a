use super::mocks::*;
use axum::{Router, http::StatusCode};
use common::api::{OrderOut, OrderStatus, PaymentCreateOut, PaymentOut, PaymentStatus};
use common::test_helpers::test_utils::build_request;
use rust_decimal::Decimal;
use serde_json::json;
use services::clients::{OrderGateway, UpstreamError};
use services::events::EventPublisher;
use services::payment::{PaymentState, router};
use std::sync::Arc;

const PAYER: i64 = 11;

fn payer_token() -> String {
    token_for(PAYER, "payer@shop.test", false)
}

fn app_with(payments: Arc<MemoryPayments>, orders: MockOrders, events: MockPublisher) -> Router {
    let orders: Arc<dyn OrderGateway> = Arc::new(orders);
    let events: Arc<dyn EventPublisher> = Arc::new(events);
    router(PaymentState {
        payments,
        orders,
        events,
        keys: keys(),
    })
}

fn order(id: i64, status: OrderStatus) -> OrderOut {
    OrderOut {
        id,
        status,
        total: Decimal::new(4250, 2),
        items: vec![],
    }
}

fn gateway_returning(status: OrderStatus) -> MockOrders {
    let mut orders = MockOrders::new();
    orders
        .expect_fetch_order()
        .returning(move |id, _| Ok(order(id, status.clone())));
    orders.expect_mark_paid().returning(|_, _| Ok(()));
    orders
}

fn pay_body(address: &str, phone: &str) -> Option<String> {
    Some(json!({"shipping_address": address, "phone_number": phone}).to_string())
}

#[tokio::test]
async fn test_payment_succeeds_and_notifies() {
    let payments = Arc::new(MemoryPayments::default());
    let mut orders = MockOrders::new();
    let token = payer_token();
    let expected_token = token.clone();
    orders
        .expect_fetch_order()
        .withf(move |id, forwarded| *id == 5 && forwarded.to_string() == expected_token)
        .times(1)
        .returning(|id, _| Ok(order(id, OrderStatus::Created)));
    orders
        .expect_mark_paid()
        .withf(|id, _| *id == 5)
        .times(1)
        .returning(|_, _| Ok(()));

    let mut events = MockPublisher::new();
    events
        .expect_publish()
        .withf(|event_type, payload| {
            event_type.to_string() == "payment.succeeded"
                && payload["email"] == "payer@shop.test"
                && payload["order_id"] == 5
                && payload["user_id"] == PAYER
                && payload["phone_number"] == "0901234567"
                && payload["shipping_address"] == "12 Le Loi"
        })
        .times(1)
        .returning(|_, _| Ok(()));

    let response = send(
        app_with(payments.clone(), orders, events),
        build_request("POST", "/payments/5", pay_body(" 12 Le Loi ", "090-123-4567"), Some(&token)).unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let created: PaymentCreateOut = body_json(response).await;
    assert!(created.ok);

    let stored = payments.payments.lock().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, created.payment_id);
    assert_eq!(stored[0].amount, Decimal::new(4250, 2));
    assert_eq!(stored[0].status, "SUCCESS");
    assert_eq!(stored[0].phone_number, "0901234567");
}

#[tokio::test]
async fn test_payment_validates_shipping_before_calling_orders() {
    let cases = [
        ("", "0901234567", "Shipping address is required"),
        ("12 Le Loi", "12345", "Invalid phone number"),
    ];
    for (address, phone, detail) in cases {
        let mut orders = MockOrders::new();
        orders.expect_fetch_order().never();
        let response = send(
            app_with(Arc::new(MemoryPayments::default()), orders, quiet_publisher()),
            build_request("POST", "/payments/5", pay_body(address, phone), Some(&payer_token())).unwrap(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_detail(response).await, detail);
    }
}

#[tokio::test]
async fn test_existing_successful_payment_is_returned() {
    let payments = Arc::new(MemoryPayments::default());
    payments.insert(8, 5, PAYER, PaymentStatus::Success);
    let mut orders = MockOrders::new();
    orders.expect_fetch_order().never();

    let response = send(
        app_with(payments.clone(), orders, quiet_publisher()),
        build_request("POST", "/payments/5", pay_body("12 Le Loi", "0901234567"), Some(&payer_token())).unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let created: PaymentCreateOut = body_json(response).await;
    assert_eq!(created.payment_id, 8);
    assert_eq!(payments.count(), 1);
}

#[tokio::test]
async fn test_failed_attempt_blocks_retry() {
    let payments = Arc::new(MemoryPayments::default());
    payments.insert(8, 5, PAYER, PaymentStatus::Failed);

    let response = send(
        app_with(payments, gateway_returning(OrderStatus::Created), quiet_publisher()),
        build_request("POST", "/payments/5", pay_body("12 Le Loi", "0901234567"), Some(&payer_token())).unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_detail(response).await, "Payment already attempted");
}

#[tokio::test]
async fn test_order_not_payable() {
    let response = send(
        app_with(Arc::new(MemoryPayments::default()), gateway_returning(OrderStatus::Paid), quiet_publisher()),
        build_request("POST", "/payments/5", pay_body("12 Le Loi", "0901234567"), Some(&payer_token())).unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_detail(response).await, "Cannot pay order in status PAID");
}

#[tokio::test]
async fn test_unrecognized_order_status_is_reported_verbatim() {
    let response = send(
        app_with(
            Arc::new(MemoryPayments::default()),
            gateway_returning(OrderStatus::from("SHIPPED")),
            quiet_publisher(),
        ),
        build_request("POST", "/payments/5", pay_body("12 Le Loi", "0901234567"), Some(&payer_token())).unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_detail(response).await, "Cannot pay order in status SHIPPED");
}

#[tokio::test]
async fn test_order_service_failures() {
    let cases = [
        (UpstreamError::Timeout, StatusCode::SERVICE_UNAVAILABLE, "Order service timeout"),
        (UpstreamError::Unavailable("refused".to_string()), StatusCode::SERVICE_UNAVAILABLE, "Order service unavailable"),
        (UpstreamError::Unauthorized, StatusCode::UNAUTHORIZED, "Unauthorized to access order"),
        (UpstreamError::Status(404), StatusCode::BAD_REQUEST, "Order not found"),
    ];
    for (failure, status, detail) in cases {
        let mut orders = MockOrders::new();
        let mut failure = Some(failure);
        orders
            .expect_fetch_order()
            .times(1)
            .returning(move |_, _| Err(failure.take().unwrap()));
        let payments = Arc::new(MemoryPayments::default());

        let response = send(
            app_with(payments.clone(), orders, quiet_publisher()),
            build_request("POST", "/payments/5", pay_body("12 Le Loi", "0901234567"), Some(&payer_token())).unwrap(),
        )
        .await;

        assert_eq!(response.status(), status);
        assert_eq!(error_detail(response).await, detail);
        assert_eq!(payments.count(), 0);
    }
}

#[tokio::test]
async fn test_mark_paid_failure_is_ignored() {
    let mut orders = MockOrders::new();
    orders
        .expect_fetch_order()
        .returning(|id, _| Ok(order(id, OrderStatus::Created)));
    orders
        .expect_mark_paid()
        .returning(|_, _| Err(UpstreamError::Status(500)));

    let mut events = MockPublisher::new();
    events.expect_publish().returning(|_, _| Err("queue down".into()));

    let response = send(
        app_with(Arc::new(MemoryPayments::default()), orders, events),
        build_request("POST", "/payments/5", pay_body("12 Le Loi", "0901234567"), Some(&payer_token())).unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_get_payment_owner_only() {
    let payments = Arc::new(MemoryPayments::default());
    payments.insert(1, 5, PAYER, PaymentStatus::Success);
    payments.insert(2, 6, 99, PaymentStatus::Success);

    let response = send(
        app_with(payments.clone(), MockOrders::new(), quiet_publisher()),
        build_request("GET", "/payments/1", None, Some(&payer_token())).unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let payment: PaymentOut = body_json(response).await;
    assert_eq!(payment.order_id, 5);
    assert_eq!(payment.status, PaymentStatus::Success);

    let response = send(
        app_with(payments, MockOrders::new(), quiet_publisher()),
        build_request("GET", "/payments/2", None, Some(&payer_token())).unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_detail(response).await, "Payment not found");
}

#[tokio::test]
async fn test_list_payments_newest_first() {
    let payments = Arc::new(MemoryPayments::default());
    payments.insert(1, 5, PAYER, PaymentStatus::Success);
    payments.insert(2, 6, 99, PaymentStatus::Success);
    payments.insert(3, 7, PAYER, PaymentStatus::Failed);

    let response = send(
        app_with(payments, MockOrders::new(), quiet_publisher()),
        build_request("GET", "/payments", None, Some(&payer_token())).unwrap(),
    )
    .await;

    let list: Vec<PaymentOut> = body_json(response).await;
    let ids: Vec<i64> = list.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![3, 1]);
}
