//! Error types and handling.

use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// State file or QR payload (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV reader failure
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Excel export error
    #[error("Export error: {0}")]
    Export(#[from] rust_xlsxwriter::XlsxError),

    /// Acting user's role does not allow the operation
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Scanned QR payload is malformed or does not match an active session
    #[error("Invalid QR code: {0}")]
    InvalidQr(String),

    /// Scanned QR payload is older than the configured window
    #[error("QR code expired {age_secs}s after issue (limit {ttl_secs}s)")]
    QrExpired { age_secs: i64, ttl_secs: u64 },

    /// Background task panicked or was cancelled
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

/// Result type alias for AppError
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Create a permission error with message
    pub fn denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    /// Create a validation error with message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error with message
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid QR error with message
    pub fn invalid_qr(msg: impl Into<String>) -> Self {
        Self::InvalidQr(msg.into())
    }
}
