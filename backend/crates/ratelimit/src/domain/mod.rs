//! Domain layer - bucket state and store contract

pub mod entities;
pub mod repository;
pub mod value_objects;
