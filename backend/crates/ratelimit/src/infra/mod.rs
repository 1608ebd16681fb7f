//! Infrastructure layer - store implementations

pub mod memory;
pub mod postgres;
