//! HTTP route handlers.

pub mod accounts;
pub mod exchanges;
pub mod health;
pub mod metrics;
pub mod saga;
