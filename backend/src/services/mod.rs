//! Business logic services for the Inventory Management Platform

pub mod ai_report;
pub mod auth;
pub mod notification;
pub mod product;
pub mod report;
pub mod sale;
pub mod user;

pub use ai_report::AiReportService;
pub use auth::AuthService;
pub use notification::NotificationService;
pub use product::ProductService;
pub use report::ReportService;
pub use sale::SaleService;
pub use user::UserService;
