//! Device discovery infrastructure

mod mdns;

pub use mdns::browse;
