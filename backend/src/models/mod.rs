//! Database models for the Inventory Management Platform
//!
//! Re-exports models from the shared crate

pub use shared::models::*;
