//! Pure storefront rules, free of any database or HTTP concerns.

pub mod address;
pub mod auth_email;
pub mod cart;
pub mod order_status;
pub mod pricing;
pub mod promotion;
