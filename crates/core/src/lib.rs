//! docquery Core Library
//!
//! This crate provides the foundational utilities for the docquery engine:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AppConfig, ChunkingConfig};
pub use error::{AppError, AppResult};
