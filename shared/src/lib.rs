//! Shared types and models for the Inventory Management Platform
//!
//! This crate contains domain models, common types, and validation helpers
//! shared between the backend server and its supporting tools.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
