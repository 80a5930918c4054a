pub mod api;
pub mod config;
pub mod phone;
pub mod yaml_include;

/// Common pieces shared across the MicroShop workspace
///
/// This crate holds everything both the backend services and the storefront
/// client need to agree on:
///
/// - Configuration loading (YAML with `!include` support)
/// - Wire types exchanged over the REST APIs
/// - Phone number normalization used on both sides of the payment form
/// - Shared test utilities (behind the `test-helpers` feature)

// Test helpers module - available for both development and test builds
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

#[cfg(any(test, feature = "test-helpers"))]
pub use test_helpers::{generate_unique_email, generate_unique_id, get_test_database_url};
