//! Domain layer - value objects and domain errors

pub mod config;
pub mod device;
pub mod error;
