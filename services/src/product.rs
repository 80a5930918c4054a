use crate::{
    error::ApiError,
    security::{AuthUser, JwtKeys},
    storage::ProductStorage,
};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, FromRef, Multipart, Path, State},
    routing::{get, post},
};
use common::api::{ModelId, OkOut, ProductCreate, ProductOut, ProductUpdate};
use std::{path::PathBuf, sync::Arc};
use tower_http::services::ServeDir;
use tracing::info;

pub const ALLOWED_IMAGE_EXTENSIONS: [&str; 4] = [".png", ".jpg", ".jpeg", ".webp"];
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone)]
pub struct ProductState {
    pub products: Arc<dyn ProductStorage>,
    pub keys: Arc<JwtKeys>,
    pub upload_dir: PathBuf,
}

impl FromRef<ProductState> for Arc<JwtKeys> {
    fn from_ref(state: &ProductState) -> Self {
        state.keys.clone()
    }
}

pub fn router(state: ProductState) -> Router {
    let static_files = ServeDir::new(&state.upload_dir);

    Router::new()
        .route("/products", get(list_published))
        .route("/products/{id}", get(get_published))
        .route("/admin/products", get(admin_list).post(admin_create))
        .route(
            "/admin/products/{id}",
            axum::routing::patch(admin_update).delete(admin_delete),
        )
        .route(
            "/admin/products/{id}/image",
            post(admin_upload_image).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .nest_service("/static", static_files)
        .with_state(state)
}

/// Lowercased extension with its dot, if it is an accepted image type.
pub fn image_extension(filename: &str) -> Option<String> {
    let ext = std::path::Path::new(filename)
        .extension()?
        .to_str()?
        .to_lowercase();
    let ext = format!(".{}", ext);
    ALLOWED_IMAGE_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

pub fn image_file_name(product_id: ModelId, ext: &str) -> String {
    format!("prod_{}_{}{}", product_id, uuid::Uuid::new_v4().simple(), ext)
}

fn not_found() -> ApiError {
    ApiError::not_found("Not found")
}

async fn list_published(State(state): State<ProductState>) -> Result<Json<Vec<ProductOut>>, ApiError> {
    let products = state.products.list_products(true).await?;
    Ok(Json(products.into_iter().map(ProductOut::from).collect()))
}

async fn get_published(
    State(state): State<ProductState>,
    Path(id): Path<ModelId>,
) -> Result<Json<ProductOut>, ApiError> {
    let product = state
        .products
        .get_product(id)
        .await?
        .filter(|p| p.published)
        .ok_or_else(not_found)?;
    Ok(Json(product.into()))
}

async fn admin_list(
    State(state): State<ProductState>,
    user: AuthUser,
) -> Result<Json<Vec<ProductOut>>, ApiError> {
    user.require_admin()?;
    let products = state.products.list_products(false).await?;
    Ok(Json(products.into_iter().map(ProductOut::from).collect()))
}

async fn admin_create(
    State(state): State<ProductState>,
    user: AuthUser,
    Json(input): Json<ProductCreate>,
) -> Result<Json<ProductOut>, ApiError> {
    user.require_admin()?;
    let product = state.products.create_product(input).await?;
    info!(product_id = product.id, admin = user.user_id, "Product created");
    Ok(Json(product.into()))
}

async fn admin_update(
    State(state): State<ProductState>,
    user: AuthUser,
    Path(id): Path<ModelId>,
    Json(update): Json<ProductUpdate>,
) -> Result<Json<ProductOut>, ApiError> {
    user.require_admin()?;
    let product = state
        .products
        .update_product(id, update)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(product.into()))
}

async fn admin_delete(
    State(state): State<ProductState>,
    user: AuthUser,
    Path(id): Path<ModelId>,
) -> Result<Json<OkOut>, ApiError> {
    user.require_admin()?;
    if !state.products.delete_product(id).await? {
        return Err(not_found());
    }
    info!(product_id = id, admin = user.user_id, "Product deleted");
    Ok(Json(OkOut { ok: true }))
}

async fn admin_upload_image(
    State(state): State<ProductState>,
    user: AuthUser,
    Path(id): Path<ModelId>,
    mut multipart: Multipart,
) -> Result<Json<ProductOut>, ApiError> {
    user.require_admin()?;
    if state.products.get_product(id).await?.is_none() {
        return Err(ApiError::not_found("Product not found"));
    }

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        upload = Some((filename, bytes));
        break;
    }
    let (filename, bytes) = upload.ok_or_else(|| ApiError::bad_request("Missing file"))?;

    let ext = image_extension(&filename)
        .ok_or_else(|| ApiError::bad_request("Only .png, .jpg, .jpeg, .webp allowed"))?;
    if bytes.is_empty() {
        return Err(ApiError::bad_request("Empty file"));
    }

    let name = image_file_name(id, &ext);
    tokio::fs::create_dir_all(&state.upload_dir)
        .await
        .map_err(|e| ApiError::internal("Failed to store image", e.into()))?;
    tokio::fs::write(state.upload_dir.join(&name), &bytes)
        .await
        .map_err(|e| ApiError::internal("Failed to store image", e.into()))?;

    let update = ProductUpdate {
        image_url: Some(format!("/static/{}", name)),
        ..Default::default()
    };
    let product = state
        .products
        .update_product(id, update)
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;
    info!(product_id = id, file = %name, size = bytes.len(), "Product image stored");

    Ok(Json(product.into()))
}
