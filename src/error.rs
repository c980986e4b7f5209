//! Error types for reactive models.
//!
//! Errors are strongly typed using thiserror so callers can match on the
//! exact condition. Three families exist: validation failures surfaced to the
//! writer, registration failures surfaced at subscribe time, and subscriber
//! failures that are isolated and only ever reach the diagnostic sink.

use thiserror::Error;

/// A candidate value was rejected, or the write addressed something that
/// does not exist on the model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Field '{field}' rejected value: {detail}")]
    Rejected {
        field: String,
        detail: String,
    },

    #[error("Field '{field}' expects {expected}, got {actual}")]
    TypeMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Field '{field}' is out of range: {detail}")]
    OutOfRange {
        field: String,
        detail: String,
    },

    #[error("Field '{field}' has length {actual}, allowed {detail}")]
    InvalidLength {
        field: String,
        actual: usize,
        detail: String,
    },

    #[error("Required field '{field}' is missing")]
    MissingField {
        field: String,
    },

    #[error("Model '{model_type}' has no field '{field}'")]
    UnknownField {
        model_type: String,
        field: String,
    },
}

impl ValidationError {
    /// The field the failure refers to.
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::Rejected { field, .. }
            | Self::TypeMismatch { field, .. }
            | Self::OutOfRange { field, .. }
            | Self::InvalidLength { field, .. }
            | Self::MissingField { field }
            | Self::UnknownField { field, .. } => field,
        }
    }
}

/// Addressing a model type or field that was never declared.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("Model type '{model_type}' is not registered")]
    UnknownModelType {
        model_type: String,
    },

    #[error("Model type '{model_type}' has no field '{field}'")]
    UnknownField {
        model_type: String,
        field: String,
    },

    #[error("Model type '{model_type}' is already registered with a different schema")]
    SchemaMismatch {
        model_type: String,
    },

    #[error("Invalid schema for '{model_type}': {reason}")]
    InvalidSchema {
        model_type: String,
        reason: String,
    },
}

/// An observer failed while an event was being delivered to it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscriberError {
    #[error("Subscriber returned an error: {message}")]
    Failed {
        message: String,
    },

    #[error("Subscriber panicked: {message}")]
    Panicked {
        message: String,
    },
}

impl SubscriberError {
    /// Creates a failure from any displayable error.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// Receiving from a listener failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    #[error("Receive timed out after {duration_ms}ms")]
    Timeout {
        duration_ms: u64,
    },

    #[error("Stream disconnected: {path}")]
    Disconnected {
        path: String,
    },
}

/// Top-level error type.
#[derive(Debug, Error)]
pub enum ReactiveError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Registration error: {0}")]
    Registration(#[from] RegistrationError),

    #[error("Subscriber error: {0}")]
    Subscriber(#[from] SubscriberError),

    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl ReactiveError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a registration error.
    #[must_use]
    pub const fn is_registration(&self) -> bool {
        matches!(self, Self::Registration(_))
    }

    /// Returns true if this is a subscriber error.
    #[must_use]
    pub const fn is_subscriber(&self) -> bool {
        matches!(self, Self::Subscriber(_))
    }

    /// Returns true if this is a stream receive error.
    #[must_use]
    pub const fn is_stream(&self) -> bool {
        matches!(self, Self::Stream(_))
    }

    /// Returns true if a receive timed out; retrying may succeed.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Stream(StreamError::Timeout { .. }))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// The validation failure, if this is one.
    #[must_use]
    pub const fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type alias for reactive model operations.
pub type ReactiveResult<T> = Result<T, ReactiveError>;
