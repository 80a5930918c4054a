use common::api::{ModelId, OrderCreateIn, OrderItemIn, ProductOut};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ModelId,
    pub qty: i64,
}

/// Client-side cart, one line per product. Quantities are always at least 1.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartItem>,
}

/// Parses a typed quantity, falling back to 1 for anything that isn't a positive integer.
pub fn parse_quantity(raw: &str) -> i64 {
    raw.trim().parse::<i64>().map(|qty| qty.max(1)).unwrap_or(1)
}

impl Cart {
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn quantity_of(&self, product_id: ModelId) -> Option<i64> {
        self.items.iter().find(|i| i.product_id == product_id).map(|i| i.qty)
    }

    /// Adds `qty` of a product, incrementing the existing line if there is one.
    pub fn add(&mut self, product_id: ModelId, qty: i64) {
        let qty = qty.max(1);
        match self.items.iter_mut().find(|i| i.product_id == product_id) {
            Some(item) => item.qty = item.qty.saturating_add(qty),
            None => self.items.push(CartItem { product_id, qty }),
        }
    }

    /// Sets a line's quantity from user input. Returns false if the product isn't in the cart.
    pub fn set_quantity(&mut self, product_id: ModelId, raw: &str) -> bool {
        match self.items.iter_mut().find(|i| i.product_id == product_id) {
            Some(item) => {
                item.qty = parse_quantity(raw);
                true
            }
            None => false,
        }
    }

    /// Restores the cart invariants on data read from outside: quantities below 1
    /// become 1 and repeated products are merged into their first line.
    pub fn normalize(&mut self) {
        let mut merged: Vec<CartItem> = Vec::with_capacity(self.items.len());
        for item in self.items.drain(..) {
            let qty = item.qty.max(1);
            match merged.iter_mut().find(|m| m.product_id == item.product_id) {
                Some(existing) => existing.qty = existing.qty.saturating_add(qty),
                None => merged.push(CartItem {
                    product_id: item.product_id,
                    qty,
                }),
            }
        }
        self.items = merged;
    }

    pub fn remove(&mut self, product_id: ModelId) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn to_order_request(&self) -> OrderCreateIn {
        OrderCreateIn {
            items: self
                .items
                .iter()
                .map(|i| OrderItemIn {
                    product_id: i.product_id,
                    qty: i.qty,
                })
                .collect(),
        }
    }

    /// Prices the cart against the current product list.
    pub fn enrich(&self, products: &[ProductOut]) -> CartView {
        let lines: Vec<CartLine> = self
            .items
            .iter()
            .map(|item| {
                let product = products.iter().find(|p| p.id == item.product_id && p.published);
                let unit_price = product.map(|p| p.price);
                CartLine {
                    product_id: item.product_id,
                    qty: item.qty,
                    name: product.map(|p| p.name.clone()),
                    unit_price,
                    line_total: unit_price.and_then(|price| price.checked_mul(Decimal::from(item.qty))),
                }
            })
            .collect();
        let total = lines
            .iter()
            .filter_map(|l| l.line_total)
            .fold(Decimal::ZERO, |sum, line_total| sum.saturating_add(line_total));

        CartView { lines, total }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub product_id: ModelId,
    pub qty: i64,
    /// `None` once the product is gone from the published catalogue.
    pub name: Option<String>,
    pub unit_price: Option<Decimal>,
    pub line_total: Option<Decimal>,
}

impl CartLine {
    pub fn is_available(&self) -> bool {
        self.unit_price.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CartView {
    pub lines: Vec<CartLine>,
    pub total: Decimal,
}
