//! Core types and shared functionality for url2md.
//!
//! This crate provides:
//! - Unified error types
//! - Configuration structures with layered loading
//! - Slug derivation for output filenames

pub mod config;
pub mod error;
pub mod slug;

pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use slug::slugify;
