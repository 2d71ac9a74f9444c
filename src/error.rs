//! # Error Types
//!
//! This module defines error types used throughout the cartel library.

use thiserror::Error;

/// Main error type for cartel operations
#[derive(Debug, Error)]
pub enum CartelError {
    /// Template document could not be parsed or is structurally invalid
    #[error("Template error: {0}")]
    Template(String),

    /// Configuration file could not be read or parsed
    #[error("Config error: {0}")]
    Config(String),

    /// Image decoding or encoding error
    #[error("Image error: {0}")]
    Image(String),

    /// Remote image download failed
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Image reference is neither a data URI, a static path, nor an http(s) URL
    #[error("Unsupported image reference: {0}")]
    UnsupportedReference(String),

    /// Canvas could not be allocated
    #[error("Canvas error: {0}")]
    Canvas(String),

    /// Neither the render nor the fallback image could be written
    #[error("Render failed: {0}")]
    Render(String),

    /// Font file could not be loaded
    #[error("Font error: {0}")]
    Font(String),

    /// JSON error wrapper
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, CartelError>;
