//! Clients for external services

pub mod email;
pub mod google;
pub mod ollama;

pub use email::EmailSender;
pub use google::{GoogleAuthClient, GoogleIdentity};
pub use ollama::OllamaClient;
