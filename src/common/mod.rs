//! Common module - errors, unified types, channel helpers

pub mod channels;
pub mod errors;
pub mod types;
