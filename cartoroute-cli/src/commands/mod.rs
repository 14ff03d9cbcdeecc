//! CLI command implementations.

pub mod config;
pub mod init;
pub mod render;
pub mod route;
pub mod worker;
