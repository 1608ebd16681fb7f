//! Application layer - use cases and configuration

pub mod bucket;
pub mod config;
pub mod registry;
