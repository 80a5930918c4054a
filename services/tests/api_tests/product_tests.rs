use super::mocks::*;
use axum::{Router, http::StatusCode};
use common::api::{OkOut, ProductOut};
use common::test_helpers::test_utils::build_request;
use rust_decimal::Decimal;
use serde_json::json;
use services::product::{ProductState, router};
use std::{path::Path, sync::Arc};

fn app_with(products: Arc<MemoryProducts>, upload_dir: &Path) -> Router {
    router(ProductState {
        products,
        keys: keys(),
        upload_dir: upload_dir.to_path_buf(),
    })
}

fn catalogue() -> Arc<MemoryProducts> {
    Arc::new(MemoryProducts::with(vec![
        product(1, "Mug", Decimal::new(1250, 2), true),
        product(2, "Draft lamp", Decimal::new(4000, 2), false),
        product(3, "Poster", Decimal::new(900, 2), true),
    ]))
}

fn admin() -> String {
    token_for(1, "admin@shop.test", true)
}

fn multipart_request(uri: &str, filename: &str, content: &[u8]) -> http::Request<String> {
    let boundary = "microshop-boundary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: application/octet-stream\r\n\r\n{c}\r\n--{b}--\r\n",
        b = boundary,
        f = filename,
        c = String::from_utf8_lossy(content)
    );
    http::Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", format!("multipart/form-data; boundary={}", boundary))
        .header("Authorization", format!("Bearer {}", admin()))
        .body(body)
        .unwrap()
}

#[tokio::test]
async fn test_public_list_shows_published_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let response = send(app_with(catalogue(), dir.path()), build_request("GET", "/products", None, None).unwrap()).await;

    assert_eq!(response.status(), StatusCode::OK);
    let products: Vec<ProductOut> = body_json(response).await;
    let ids: Vec<i64> = products.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![3, 1]);
}

#[tokio::test]
async fn test_unpublished_product_is_hidden() {
    let dir = tempfile::tempdir().unwrap();
    let response = send(app_with(catalogue(), dir.path()), build_request("GET", "/products/2", None, None).unwrap()).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_detail(response).await, "Not found");
}

#[tokio::test]
async fn test_public_product_detail() {
    let dir = tempfile::tempdir().unwrap();
    let response = send(app_with(catalogue(), dir.path()), build_request("GET", "/products/1", None, None).unwrap()).await;

    assert_eq!(response.status(), StatusCode::OK);
    let product: ProductOut = body_json(response).await;
    assert_eq!(product.name, "Mug");
    assert_eq!(product.price, Decimal::new(1250, 2));
}

#[tokio::test]
async fn test_admin_routes_reject_regular_users() {
    let dir = tempfile::tempdir().unwrap();
    let token = token_for(5, "buyer@shop.test", false);
    let response = send(
        app_with(catalogue(), dir.path()),
        build_request("GET", "/admin/products", None, Some(&token)).unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_detail(response).await, "Admin only");
}

#[tokio::test]
async fn test_admin_list_includes_unpublished() {
    let dir = tempfile::tempdir().unwrap();
    let response = send(
        app_with(catalogue(), dir.path()),
        build_request("GET", "/admin/products", None, Some(&admin())).unwrap(),
    )
    .await;

    let products: Vec<ProductOut> = body_json(response).await;
    assert_eq!(products.len(), 3);
}

#[tokio::test]
async fn test_admin_create_applies_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let products = Arc::new(MemoryProducts::default());
    let body = json!({"name": "Tote bag", "price": 15.5}).to_string();
    let response = send(
        app_with(products.clone(), dir.path()),
        build_request("POST", "/admin/products", Some(body), Some(&admin())).unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let created: ProductOut = body_json(response).await;
    assert_eq!(created.description, "");
    assert!(!created.published);
    assert_eq!(created.price, Decimal::new(155, 1));
}

#[tokio::test]
async fn test_admin_patch_changes_only_given_fields() {
    let dir = tempfile::tempdir().unwrap();
    let products = catalogue();
    let body = json!({"published": true}).to_string();
    let response = send(
        app_with(products.clone(), dir.path()),
        build_request("PATCH", "/admin/products/2", Some(body), Some(&admin())).unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let updated: ProductOut = body_json(response).await;
    assert!(updated.published);
    assert_eq!(updated.name, "Draft lamp");
    assert_eq!(updated.price, Decimal::new(4000, 2));
}

#[tokio::test]
async fn test_admin_patch_and_delete_missing_product() {
    let dir = tempfile::tempdir().unwrap();
    for (method, body) in [("PATCH", Some(json!({"name": "x"}).to_string())), ("DELETE", None)] {
        let response = send(
            app_with(catalogue(), dir.path()),
            build_request(method, "/admin/products/404", body, Some(&admin())).unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn test_admin_delete() {
    let dir = tempfile::tempdir().unwrap();
    let products = catalogue();
    let response = send(
        app_with(products.clone(), dir.path()),
        build_request("DELETE", "/admin/products/3", None, Some(&admin())).unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let ok: OkOut = body_json(response).await;
    assert!(ok.ok);
    assert_eq!(products.products.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_image_upload_stores_file_and_sets_url() {
    let dir = tempfile::tempdir().unwrap();
    let products = catalogue();
    let response = send(
        app_with(products.clone(), dir.path()),
        multipart_request("/admin/products/1/image", "Photo.PNG", b"fake-png-bytes"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let updated: ProductOut = body_json(response).await;
    let url = updated.image_url.unwrap();
    assert!(url.starts_with("/static/prod_1_"));
    assert!(url.ends_with(".png"));

    let stored = dir.path().join(url.trim_start_matches("/static/"));
    assert_eq!(std::fs::read(stored).unwrap(), b"fake-png-bytes");
}

#[tokio::test]
async fn test_image_upload_rejections() {
    let cases = [
        ("/admin/products/1/image", "notes.txt", b"text".as_slice(), StatusCode::BAD_REQUEST, "Only .png, .jpg, .jpeg, .webp allowed"),
        ("/admin/products/1/image", "empty.jpg", b"".as_slice(), StatusCode::BAD_REQUEST, "Empty file"),
        ("/admin/products/77/image", "a.jpg", b"x".as_slice(), StatusCode::NOT_FOUND, "Product not found"),
    ];

    for (uri, filename, content, status, detail) in cases {
        let dir = tempfile::tempdir().unwrap();
        let response = send(app_with(catalogue(), dir.path()), multipart_request(uri, filename, content)).await;

        assert_eq!(response.status(), status, "{}", filename);
        assert_eq!(error_detail(response).await, detail);
    }
}

#[tokio::test]
async fn test_static_serves_uploads() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("prod_1_abc.png"), b"img").unwrap();

    let response = send(
        app_with(catalogue(), dir.path()),
        build_request("GET", "/static/prod_1_abc.png", None, None).unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}
