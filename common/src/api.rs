//! Request and response bodies of the MicroShop REST APIs.
//!
//! Money travels as JSON numbers and is held as [`Decimal`] on both sides.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::{Display, EnumString};

pub type ModelId = i64;

/// Body of every non-2xx response produced by the services.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorOut {
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OkOut {
    pub ok: bool,
}

// ---------------------------------------------------------------------------
// auth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterIn {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginIn {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenOut {
    pub access_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeOut {
    pub id: ModelId,
    pub email: String,
    pub is_admin: bool,
    pub is_verified: bool,
}

// ---------------------------------------------------------------------------
// products
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductOut {
    pub id: ModelId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub published: bool,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCreate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub published: Option<bool>,
    pub image_url: Option<String>,
}

// ---------------------------------------------------------------------------
// orders
// ---------------------------------------------------------------------------

/// Order lifecycle status, sent as its upper-case name.
///
/// Statuses this build does not know about are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    Created,
    Paid,
    Other(String),
}

impl OrderStatus {
    pub fn as_str(&self) -> &str {
        match self {
            OrderStatus::Created => "CREATED",
            OrderStatus::Paid => "PAID",
            OrderStatus::Other(raw) => raw,
        }
    }

    pub fn is_payable(&self) -> bool {
        matches!(self, OrderStatus::Created)
    }
}

impl From<&str> for OrderStatus {
    fn from(raw: &str) -> Self {
        match raw {
            "CREATED" => OrderStatus::Created,
            "PAID" => OrderStatus::Paid,
            other => OrderStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for OrderStatus {
    fn from(raw: String) -> Self {
        OrderStatus::from(raw.as_str())
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        match status {
            OrderStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItemIn {
    pub product_id: ModelId,
    pub qty: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderCreateIn {
    pub items: Vec<OrderItemIn>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItemOut {
    pub product_id: ModelId,
    pub qty: i64,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderOut {
    pub id: ModelId,
    pub status: OrderStatus,
    pub total: Decimal,
    pub items: Vec<OrderItemOut>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PayOrderOut {
    pub ok: bool,
    pub status: OrderStatus,
}

// ---------------------------------------------------------------------------
// payments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentCreateIn {
    pub shipping_address: String,
    pub phone_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentCreateOut {
    pub ok: bool,
    pub payment_id: ModelId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentOut {
    pub id: ModelId,
    pub order_id: ModelId,
    pub user_id: ModelId,
    pub amount: Decimal,
    pub status: PaymentStatus,
}
