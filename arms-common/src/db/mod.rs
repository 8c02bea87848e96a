//! Record store schema and queries

pub mod init;
pub mod students;

pub use init::*;
pub use students::*;
