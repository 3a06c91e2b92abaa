//! Error types for host services.

use std::io;
use std::path::PathBuf;

/// Errors raised by host-side services.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// A directory the caller expected does not exist.
    #[error("Directory not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The targeted settings layer does not accept writes.
    #[error("Settings layer is read-only: {0}")]
    ReadOnly(String),

    #[error("Invalid settings document: {0}")]
    InvalidDocument(String),
}
