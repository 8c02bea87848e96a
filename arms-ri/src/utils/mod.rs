//! Shared utilities for arms-ri

pub mod pool_monitor;

pub use pool_monitor::{begin_monitored, MonitoredTransaction};
