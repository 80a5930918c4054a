
mod order_tests;
mod payment_tests;
mod product_tests;
