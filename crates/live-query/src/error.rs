use std::fmt;
use thiserror::Error;

// ---------------------------------------------------------------------------
// ValidationError / ValidationErrors
// ---------------------------------------------------------------------------

/// A single field-level validation failure.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub path: String,
    pub expected: String,
    pub received: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            r#"Validation failed at "{}": expected {}, received {}"#,
            self.path, self.expected, self.received
        )
    }
}

impl std::error::Error for ValidationError {}

/// A collection of one or more `ValidationError`s.
#[derive(Debug, Clone)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation failed:")?;
        for e in &self.0 {
            write!(
                f,
                "\n  - {}: expected {}, received {}",
                e.path, e.expected, e.received
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

/// Errors raised by a [`DocumentStore`](crate::store::DocumentStore)
/// implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Resource \"{0}\" is not known to this store")]
    UnknownResource(String),

    #[error("Document not found: {resource}/{id}")]
    NotFound { resource: String, id: String },

    #[error("Connection failed for \"{target}\": {message}")]
    Connection { target: String, message: String },

    #[error("Store is closed")]
    Closed,
}

// ---------------------------------------------------------------------------
// NormalizeError
// ---------------------------------------------------------------------------

/// Errors raised at the normalization boundary (raw store response →
/// cached snapshot shape).
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("Document \"{0}\" has an empty identifier")]
    EmptyId(String),
}

// ---------------------------------------------------------------------------
// SubscribeError
// ---------------------------------------------------------------------------

/// Errors surfaced to a `subscribe`/`fetch` caller while waiting for the
/// first snapshot of a live connection.
#[derive(Debug, Error)]
pub enum SubscribeError {
    /// The connection was replaced by a newer subscribe for the same key
    /// before it delivered its first snapshot.
    #[error("Subscription for \"{0}\" was superseded before its first snapshot")]
    Superseded(String),

    /// The last consumer for the key went away before the first snapshot.
    #[error("Subscription for \"{0}\" was closed before its first snapshot")]
    Closed(String),

    /// The first observation failed.
    #[error("First snapshot for \"{key}\" failed: {message}")]
    InitialSnapshot { key: String, message: String },
}

// ---------------------------------------------------------------------------
// StagingError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("No staged answers to commit")]
    NothingStaged,
}

// ---------------------------------------------------------------------------
// LiveQueryError — top-level rollup
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LiveQueryError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Subscribe(#[from] SubscribeError),

    #[error(transparent)]
    Staging(#[from] StagingError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ValidationErrors> for LiveQueryError {
    fn from(errors: ValidationErrors) -> Self {
        LiveQueryError::Normalize(NormalizeError::Validation(errors))
    }
}

/// Convenience alias — the default error type is `LiveQueryError`.
pub type Result<T, E = LiveQueryError> = std::result::Result<T, E>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
