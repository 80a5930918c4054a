pub mod auth;
pub mod clients;
pub mod error;
pub mod events;
pub mod executable_utils;
pub mod model;
pub mod notification;
pub mod order;
pub mod payment;
pub mod product;
pub mod security;
pub mod storage;
