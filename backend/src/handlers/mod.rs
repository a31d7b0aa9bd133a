//! HTTP handlers for the Inventory Management Platform

pub mod ai;
pub mod auth;
pub mod health;
pub mod notification;
pub mod product;
pub mod report;
pub mod sale;
pub mod user;

pub use ai::*;
pub use auth::*;
pub use health::*;
pub use notification::*;
pub use product::*;
pub use report::*;
pub use sale::*;
pub use user::*;
