//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Client IP resolution from proxy headers
//! - Clock abstraction (controllable in tests)
//! - Environment-driven configuration helpers

pub mod client;
pub mod clock;
pub mod config;
