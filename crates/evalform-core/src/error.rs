//! Error types and result aliases for evalform.
//!
//! Errors follow the evaluation workflow: fetching a form, submitting a
//! review, and the service-level failures a client can report underneath
//! both. None of them is fatal; every path is recoverable by retrying.

use crate::id::FormKey;

/// The result type used throughout evalform.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading or submitting an evaluation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Loading or refreshing a form failed.
    #[error("failed to fetch {key}: {source}")]
    Fetch {
        /// The form that was being fetched.
        key: FormKey,
        /// The underlying service failure.
        #[source]
        source: Box<Error>,
    },

    /// At least one request of a submission failed.
    ///
    /// Carries the message of the first failing request in plan order.
    #[error("submission failed ({failed} of {total} requests): {message}")]
    Submission {
        /// Message of the first failing request.
        message: String,
        /// Number of requests that failed.
        failed: usize,
        /// Number of requests issued.
        total: usize,
    },

    /// A precondition for the operation was not met.
    #[error("precondition failed: {message}")]
    PreconditionFailed {
        /// Description of the failed precondition.
        message: String,
    },

    /// The service returned a form that breaks a structural invariant.
    #[error("invalid form snapshot: {message}")]
    InvalidSnapshot {
        /// Description of the problem.
        message: String,
    },

    /// The request never produced a response.
    #[error("transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The service answered with a non-success status.
    #[error("API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// A payload could not be encoded or decoded.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure.
        message: String,
    },

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An internal error occurred that should not happen in normal operation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl Error {
    /// Wraps a service failure as a fetch error for `key`.
    #[must_use]
    pub fn fetch(key: &FormKey, source: Error) -> Self {
        Self::Fetch {
            key: key.clone(),
            source: Box::new(source),
        }
    }

    /// Creates a precondition error with the given message.
    #[must_use]
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::PreconditionFailed {
            message: message.into(),
        }
    }

    /// Creates a transport error without a source.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a transport error with a source cause.
    #[must_use]
    pub fn transport_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns true if this is a fetch failure.
    #[must_use]
    pub fn is_fetch(&self) -> bool {
        matches!(self, Self::Fetch { .. })
    }

    /// Returns true if this is a submission failure.
    #[must_use]
    pub fn is_submission(&self) -> bool {
        matches!(self, Self::Submission { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}
