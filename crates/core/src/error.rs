//! Error types for dochost
//!
//! Every operation reports failure through [`Error`]. The transport layer
//! only needs to know which outcome class an error belongs to, so each
//! variant maps onto an [`OutcomeClass`] via [`Error::outcome`].
//!
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use crate::contract::Version;
use crate::link::DocumentLink;
use thiserror::Error;

/// Result type alias for dochost operations
pub type Result<T> = std::result::Result<T, Error>;

/// Outcome class reported to the transport collaborator
///
/// Success is the `Ok` path of a [`Result`]; errors fall into one of two
/// classes. The transport owns the mapping onto status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeClass {
    /// The request was malformed or addressed something that does not exist
    ClientError,
    /// The runtime failed while handling a well-formed request
    ServerError,
}

/// Error types for the document runtime
#[derive(Debug, Error)]
pub enum Error {
    /// Request body violates a schema invariant
    ///
    /// Displays as the bare reason so callers can surface it verbatim.
    #[error("{0}")]
    Validation(String),

    /// No live service instance for the link
    #[error("Document not found: {0}")]
    NotFound(DocumentLink),

    /// A write raced incompatibly with another writer
    ///
    /// Per-link writes are strictly serialized, so the runtime never
    /// produces this itself. Kept so callers can match exhaustively.
    #[error("Version conflict on {link}: expected {expected}, found {actual}")]
    Conflict {
        /// Document link
        link: DocumentLink,
        /// Version the caller expected
        expected: Version,
        /// Version actually found
        actual: Version,
    },

    /// Bounded wait on a service instance elapsed
    #[error("Timed out after {waited_ms}ms waiting for {link}")]
    Timeout {
        /// Document link
        link: DocumentLink,
        /// How long the caller waited
        waited_ms: u64,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Unexpected failure, with enough context to diagnose
    #[error("Internal error ({context}): {message}")]
    Internal {
        /// Where it happened: link, field name, or component
        context: String,
        /// What went wrong
        message: String,
    },
}

impl Error {
    /// Create a validation error
    pub fn validation(reason: impl Into<String>) -> Self {
        Error::Validation(reason.into())
    }

    /// Create an internal error
    pub fn internal(context: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Internal {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Outcome class for the transport
    pub fn outcome(&self) -> OutcomeClass {
        match self {
            Error::Validation(_) | Error::NotFound(_) | Error::Conflict { .. } => {
                OutcomeClass::ClientError
            }
            Error::Timeout { .. } | Error::Serialization(_) | Error::Internal { .. } => {
                OutcomeClass::ServerError
            }
        }
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    /// Check if this is a not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
