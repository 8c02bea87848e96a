//! HTTP types shared by the ARMS services

pub mod envelope;

pub use envelope::{ApiError, ApiResponse, ApiResult};
