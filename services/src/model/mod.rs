pub mod entities;

pub use entities::{order, order_item, payment, product, user};

use common::api::{
    MeOut, ModelId, OrderItemOut, OrderOut, OrderStatus, PaymentOut, PaymentStatus, ProductOut,
};
use rust_decimal::Decimal;
use std::str::FromStr;

pub type User = user::Model;
pub type Product = product::Model;
pub type Payment = payment::Model;

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: ModelId,
    pub qty: i64,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: ModelId,
    pub user_email: String,
    pub total: Decimal,
    pub items: Vec<NewOrderItem>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub order_id: ModelId,
    pub user_id: ModelId,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub shipping_address: String,
    pub phone_number: String,
}

/// An order header together with its lines.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRecord {
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
}

impl OrderRecord {
    pub fn status(&self) -> OrderStatus {
        OrderStatus::from(self.order.status.as_str())
    }
}

impl From<&User> for MeOut {
    fn from(user: &User) -> Self {
        MeOut {
            id: user.id,
            email: user.email.clone(),
            is_admin: user.is_admin,
            is_verified: user.is_verified,
        }
    }
}

impl From<Product> for ProductOut {
    fn from(product: Product) -> Self {
        ProductOut {
            id: product.id,
            name: product.name,
            description: product.description,
            price: product.price,
            published: product.published,
            image_url: product.image_url,
        }
    }
}

impl From<&OrderRecord> for OrderOut {
    fn from(record: &OrderRecord) -> Self {
        OrderOut {
            id: record.order.id,
            status: record.status(),
            total: record.order.total,
            items: record
                .items
                .iter()
                .map(|item| OrderItemOut {
                    product_id: item.product_id,
                    qty: item.qty,
                    unit_price: item.unit_price,
                })
                .collect(),
        }
    }
}

impl From<&Payment> for PaymentOut {
    fn from(payment: &Payment) -> Self {
        PaymentOut {
            id: payment.id,
            order_id: payment.order_id,
            user_id: payment.user_id,
            amount: payment.amount,
            status: PaymentStatus::from_str(&payment.status).unwrap_or(PaymentStatus::Failed),
        }
    }
}
