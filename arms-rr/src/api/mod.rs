//! HTTP API handlers for arms-rr

pub mod health;
pub mod programme;
pub mod students;

pub use health::health_routes;
pub use programme::get_programme_result;
pub use students::{get_student, search_by_name};
