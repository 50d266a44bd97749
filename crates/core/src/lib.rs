//! Docgraph Core Library
//!
//! Foundational utilities for the docgraph pipeline:
//! - Error handling (`AppError`, `AppResult`)
//! - Configuration management (`AppConfig`)
//! - Logging infrastructure

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult};
