pub mod orders;
pub mod payments;
pub mod prod_storage;
pub mod products;
pub mod users;

pub use prod_storage::*;

use crate::error::GenericError;
use crate::model::*;
use async_trait::async_trait;
use common::api::{ModelId, OrderStatus, ProductCreate, ProductUpdate};

#[async_trait]
pub trait UserStorage: Send + Sync {
    async fn insert_user(&self, user: NewUser) -> Result<User, GenericError>;

    async fn find_user(&self, user_id: ModelId) -> Result<Option<User>, GenericError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, GenericError>;

    /// Returns `false` when the user does not exist.
    async fn mark_verified(&self, user_id: ModelId) -> Result<bool, GenericError>;
}

#[async_trait]
pub trait ProductStorage: Send + Sync {
    /// Newest first.
    async fn list_products(&self, published_only: bool) -> Result<Vec<Product>, GenericError>;

    async fn get_product(&self, product_id: ModelId) -> Result<Option<Product>, GenericError>;

    async fn create_product(&self, product: ProductCreate) -> Result<Product, GenericError>;

    async fn update_product(
        &self,
        product_id: ModelId,
        update: ProductUpdate,
    ) -> Result<Option<Product>, GenericError>;

    async fn delete_product(&self, product_id: ModelId) -> Result<bool, GenericError>;
}

#[async_trait]
pub trait OrderStorage: Send + Sync {
    /// Writes the header and all lines atomically.
    async fn create_order(&self, order: NewOrder) -> Result<OrderRecord, GenericError>;

    async fn get_user_order(
        &self,
        order_id: ModelId,
        user_id: ModelId,
    ) -> Result<Option<OrderRecord>, GenericError>;

    async fn list_user_orders(&self, user_id: ModelId) -> Result<Vec<OrderRecord>, GenericError>;

    async fn set_order_status(
        &self,
        order_id: ModelId,
        status: OrderStatus,
    ) -> Result<bool, GenericError>;
}

#[async_trait]
pub trait PaymentStorage: Send + Sync {
    async fn find_order_payment(
        &self,
        order_id: ModelId,
        user_id: ModelId,
    ) -> Result<Option<Payment>, GenericError>;

    async fn create_payment(&self, payment: NewPayment) -> Result<Payment, GenericError>;

    async fn get_user_payment(
        &self,
        payment_id: ModelId,
        user_id: ModelId,
    ) -> Result<Option<Payment>, GenericError>;

    async fn list_user_payments(&self, user_id: ModelId) -> Result<Vec<Payment>, GenericError>;
}
