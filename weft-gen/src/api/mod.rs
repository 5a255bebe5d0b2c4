//! HTTP API handlers for weft-gen

pub mod generate;
pub mod health;
pub mod validate;

pub use generate::generate_routes;
pub use health::health_routes;
pub use validate::validate_routes;
