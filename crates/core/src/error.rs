// crates/core/src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when loading an inventory document.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("Inventory file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Permission denied reading inventory: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("IO error reading inventory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed inventory document: {message}")]
    Malformed { message: String },
}

impl InventoryError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { path, source },
        }
    }
}

/// Errors raised by a translator for a single object.
#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("Translator not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Serving endpoint error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    ParseFailed(String),

    #[error("Model returned no SQL")]
    EmptyResponse,
}

/// Errors raised by a SQL executor for a single statement.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Executor not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Statement API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Statement {state}: {message}")]
    StatementFailed { state: String, message: String },

    #[error("Failed to parse response: {0}")]
    ParseFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inventory_io_maps_not_found() {
        let err = InventoryError::io(
            "/tmp/missing.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "nope"),
        );
        assert!(matches!(err, InventoryError::NotFound { .. }));
        assert_eq!(err.to_string(), "Inventory file not found: /tmp/missing.json");
    }

    #[test]
    fn test_inventory_io_maps_permission_denied() {
        let err = InventoryError::io(
            "/secret.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, InventoryError::PermissionDenied { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = TranslationError::Api {
            status: 429,
            message: "rate limited".to_string(),
        };
        assert_eq!(err.to_string(), "Serving endpoint error (429): rate limited");

        let err = ExecutionError::StatementFailed {
            state: "FAILED".to_string(),
            message: "TABLE_OR_VIEW_NOT_FOUND".to_string(),
        };
        assert_eq!(err.to_string(), "Statement FAILED: TABLE_OR_VIEW_NOT_FOUND");
    }
}
