//! Central error types for the timeline engine.
//!
//! Nothing in the playback path is fatal: backend failures are logged and
//! degraded around. These errors surface from the edges only (configuration,
//! trace loading, backend adapters reporting a failed call).
//! All errors implement `Serialize` so the browser binding can hand them to JS.

use serde::Serialize;
use thiserror::Error;

use crate::timeline::types::BackendKind;

/// Main error type for timeline operations.
#[derive(Error, Debug)]
pub enum TimelineError {
    /// A playback backend rejected a call (seek, destroy, ...)
    #[error("{backend} backend error: {message}")]
    Backend {
        backend: BackendKind,
        message: String,
    },

    /// Third-party player widget could not be constructed
    #[error("Widget initialization failed: {0}")]
    WidgetInit(String),

    /// Chapter text track could not be published or revoked
    #[error("Chapter track error: {0}")]
    ChapterTrack(String),

    /// Configuration could not be loaded
    #[error("Config error: {0}")]
    Config(String),

    /// Replay trace is malformed
    #[error("Trace error: {0}")]
    Trace(String),

    /// Filesystem read failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl TimelineError {
    /// Shorthand for a backend failure.
    pub fn backend(backend: BackendKind, message: impl Into<String>) -> Self {
        TimelineError::Backend {
            backend,
            message: message.into(),
        }
    }
}

/// Serialize as the error message string so JS callers get readable errors.
impl Serialize for TimelineError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Extension trait for adding context to Results.
///
/// # Example
/// ```ignore
/// use crate::error::{ResultExt, TimelineResult};
///
/// fn read_trace(path: &Path) -> TimelineResult<String> {
///     std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
/// }
/// ```
pub trait ResultExt<T> {
    /// Add context lazily (only evaluated on error), converting the error
    /// to TimelineError::Other.
    fn with_context<F: FnOnce() -> String>(self, f: F) -> TimelineResult<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn with_context<F: FnOnce() -> String>(self, f: F) -> TimelineResult<T> {
        self.map_err(|e| TimelineError::Other(format!("{}: {}", f(), e)))
    }
}

/// Type alias for Results using TimelineError.
pub type TimelineResult<T> = Result<T, TimelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TimelineError::WidgetInit("plyr missing".to_string());
        assert_eq!(err.to_string(), "Widget initialization failed: plyr missing");
    }

    #[test]
    fn test_backend_error_names_backend() {
        let err = TimelineError::backend(BackendKind::Widget, "seek rejected");
        assert_eq!(err.to_string(), "widget backend error: seek rejected");

        let err = TimelineError::backend(BackendKind::Native, "not seekable");
        assert!(err.to_string().starts_with("native"));
    }

    #[test]
    fn test_error_serialization() {
        let err = TimelineError::Config("pollIntervalMs must be a number".to_string());
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("Config error"));
        assert!(json.starts_with('"'));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: TimelineError = io_err.into();
        assert!(matches!(err, TimelineError::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: TimelineError = json_err.into();
        assert!(matches!(err, TimelineError::Json(_)));
    }

    #[test]
    fn test_result_ext_with_context() {
        let result: Result<(), &str> = Err("inner");
        let with_context = result.with_context(|| format!("step-{}", 3));

        let msg = with_context.unwrap_err().to_string();
        assert!(msg.contains("step-3"));
        assert!(msg.contains("inner"));
    }

    #[test]
    fn test_result_ext_ok_passthrough() {
        let result: Result<i32, &str> = Ok(42);
        assert_eq!(result.with_context(|| "should not appear".to_string()).unwrap(), 42);
    }

    #[test]
    fn test_missing_file_context() {
        let result = std::fs::read_to_string("/nonexistent/trace.json")
            .with_context(|| "failed to read trace /nonexistent/trace.json".to_string());
        let err = result.unwrap_err();
        assert!(matches!(err, TimelineError::Other(_)));
        assert!(err.to_string().starts_with("failed to read trace"));
    }
}
