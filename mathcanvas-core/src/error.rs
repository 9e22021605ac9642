//! Error types for drawing engine operations.

use thiserror::Error;

/// Result type for canvas operations.
pub type CanvasResult<T> = Result<T, CanvasError>;

/// Errors that can occur in canvas operations.
#[derive(Debug, Error)]
pub enum CanvasError {
    /// A gesture was started while another one was still being captured.
    #[error("Invalid gesture state: {0}")]
    InvalidGestureState(&'static str),

    /// A pointer sample carried non-finite coordinates.
    #[error("Invalid point: ({x}, {y})")]
    InvalidPoint {
        /// X coordinate as received.
        x: f64,
        /// Y coordinate as received.
        y: f64,
    },

    /// The document was written by a newer schema than this build understands.
    #[error("Unsupported document version {found} (supported up to {supported})")]
    SchemaVersion {
        /// Version found in the document.
        found: u64,
        /// Highest version this build can read.
        supported: u32,
    },

    /// Required top-level document fields are absent or mistyped.
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// Failure reported by the persistence collaborator.
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stroke failed structural validation (no points, bad width, non-finite samples).
    #[error("Invalid stroke: {0}")]
    InvalidStroke(String),

    /// Stroke not found on the canvas.
    #[error("Stroke not found: {0}")]
    StrokeNotFound(String),

    /// A stroke with the same id is already on the canvas.
    #[error("Duplicate stroke id: {0}")]
    DuplicateStroke(String),

    /// A colour string was not of the form `#RRGGBB` or `#RRGGBBAA`.
    #[error("Invalid color: {0}")]
    InvalidColor(String),

    /// The background theme name is not known.
    #[error("Unknown background theme: {0}")]
    UnknownTheme(String),

    /// A session setting is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Errors raised by a [`DocumentRepository`](crate::repository::DocumentRepository).
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The backing store refused the request.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    /// No document is stored under the requested id.
    #[error("Document not found: {0}")]
    NotFound(String),
    /// An I/O error occurred while reading or writing.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The stored bytes could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}
