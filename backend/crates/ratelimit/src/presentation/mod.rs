//! Presentation layer - HTTP middleware adapters

pub mod dto;
pub mod middleware;
