//! Failure taxonomy for remote calls.
//!
//! Every facade and aggregation operation fails with [`RemoteError`]. The
//! variants separate failures a client caused (`NotFound`, `Validation`,
//! `UnknownAction`) from failures of the messaging path (`Timeout`,
//! `Transport`) so callers can decide whether a retry makes sense.

use kennel_core::ErrorKind;

/// Failure of a remote owner/pet operation.
///
/// `Display` renders the responder's `errorMessage` verbatim for the
/// client-side kinds.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("{message}")]
    NotFound { message: String },
    #[error("{message}")]
    Validation { message: String },
    #[error("no reply within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("transport failure: {message}")]
    Transport { message: String },
    #[error("{message}")]
    UnknownAction { message: String },
    #[error("{message}")]
    Internal { message: String },
}

impl RemoteError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Builds the error for a reply with `success = false`.
    ///
    /// An explicit `errorKind` wins; otherwise the kind is inferred from the
    /// message text.
    #[must_use]
    pub fn from_reply(kind: Option<ErrorKind>, message: Option<String>) -> Self {
        let message = message.unwrap_or_else(|| "remote operation failed".to_string());
        match kind.unwrap_or_else(|| classify_message(&message)) {
            ErrorKind::NotFound => Self::NotFound { message },
            ErrorKind::Validation => Self::Validation { message },
            ErrorKind::UnknownAction => Self::UnknownAction { message },
            ErrorKind::Internal => Self::Internal { message },
        }
    }

    /// Stable tag for logs and HTTP error bodies.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Validation { .. } => "VALIDATION",
            Self::Timeout { .. } => "TIMEOUT",
            Self::Transport { .. } => "TRANSPORT",
            Self::UnknownAction { .. } => "UNKNOWN_ACTION",
            Self::Internal { .. } => "INTERNAL",
        }
    }

    /// `true` for failures of the messaging path rather than of the request.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Transport { .. })
    }
}

/// Infers a failure kind from a bare `errorMessage`.
///
/// Replies from responders that predate `errorKind` surface every failure
/// other than not-found and unknown-action as a rejected request.
#[must_use]
pub fn classify_message(message: &str) -> ErrorKind {
    if message.to_ascii_lowercase().contains("not found") {
        ErrorKind::NotFound
    } else if message.starts_with("Unknown action") {
        ErrorKind::UnknownAction
    } else {
        ErrorKind::Validation
    }
}
