//! # ARMS Common Library
//!
//! Shared code for the ARMS (Academic Records Management System) services:
//! - Persisted record model (Student → Semester → Subject)
//! - SQLite schema initialization and record store queries
//! - Configuration loading and root folder resolution
//! - Common error type and HTTP response envelopes

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod records;

pub use error::{Error, Result};
pub use records::{Semester, Student, Subject};
