//! Domain models for the Inventory Management Platform

pub mod ai_report;
pub mod notification;
pub mod product;
pub mod stock;
pub mod user;

pub use ai_report::*;
pub use notification::*;
pub use product::*;
pub use stock::*;
pub use user::*;
