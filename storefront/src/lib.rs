//! Command-line storefront for MicroShop.
//!
//! Keeps the browser-side state of the shop (token, cart, checkout draft) in a
//! JSON session file and drives the backend services over REST.
pub mod cart;
pub mod client;
pub mod error;
pub mod flow;
pub mod session;

pub use client::{ServiceUrls, ShopClient};
pub use error::ClientError;
pub use flow::{OrderAction, Storefront, order_actions};
pub use session::SessionStore;
