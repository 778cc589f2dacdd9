//! Error handling for the bookstore engine.
//!
//! One central error type covers the local store, the remote mirror and input
//! validation; conversions log diagnostic detail so callers can surface a
//! generic notice without losing the cause.

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// Local store init/read/write failure
    Persistence(String),
    /// Remote mirror network/HTTP failure
    Remote(String),
    /// Invalid input caught before any store is touched
    Validation(String),
}

impl AppError {
    /// Get the error kind as a stable label.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Persistence(_) => "PERSISTENCE",
            AppError::Remote(_) => "REMOTE",
            AppError::Validation(_) => "VALIDATION",
        }
    }

    /// Get the error message.
    pub fn message(&self) -> &str {
        match self {
            AppError::Persistence(msg) => msg,
            AppError::Remote(msg) => msg,
            AppError::Validation(msg) => msg,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        AppError::Persistence(format!("Database error: {}", err))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        tracing::error!("Remote store error: {:?}", err);
        AppError::Remote(format!("Remote store error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        AppError::Persistence(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_includes_kind_and_message() {
        let err = AppError::Validation("Title is required".to_string());
        assert_eq!(err.to_string(), "VALIDATION: Title is required");

        let err = AppError::Remote("connection refused".to_string());
        assert_eq!(err.kind(), "REMOTE");
        assert_eq!(err.message(), "connection refused");
    }
}
