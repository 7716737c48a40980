//! Middleware for the HTTP interface.

pub mod cors;
pub mod request_limit;

pub use cors::create_cors_layer;
pub use request_limit::limit_request_size;
