//! HTTP API handlers for arms-ri

pub mod health;
pub mod upload;

pub use arms_common::api::ApiResponse;
pub use health::health_routes;
pub use upload::upload_routes;
