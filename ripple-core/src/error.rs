//! Error types for reactive operations.

use crate::reactive::{SourceId, SubscriberId};

/// Errors surfaced by writes, effect creation and the typed accessors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactiveError {
    /// An argument was rejected before any tracking context was entered.
    InvalidArgument(String),

    /// An effect re-entered itself, directly or through other effects,
    /// more often than the runtime allows within one logical write.
    RecursionLimitExceeded { effect: SubscriberId, limit: usize },

    /// A source was written while a borrow of its value was still held,
    /// e.g. from inside [`Ref::with`](crate::Ref::with).
    Borrowed { source: SourceId },

    /// A value could not be converted to or from its JSON representation.
    Conversion(String),
}

// Display is written by hand because thiserror treats a field named `source`
// as the underlying error, which `SourceId` is not.
impl std::fmt::Display for ReactiveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
            Self::RecursionLimitExceeded { effect, limit } => write!(
                f,
                "{effect} re-entered itself more than {limit} times within one write"
            ),
            Self::Borrowed { source } => {
                write!(f, "{source} cannot be written while its value is borrowed")
            }
            Self::Conversion(message) => write!(f, "conversion failed: {message}"),
        }
    }
}

impl std::error::Error for ReactiveError {}

impl ReactiveError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

impl From<serde_json::Error> for ReactiveError {
    fn from(err: serde_json::Error) -> Self {
        Self::Conversion(err.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = ReactiveError> = std::result::Result<T, E>;
