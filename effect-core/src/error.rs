//! Error types for routed event streams.

use std::fmt;
use thiserror::Error;

/// Boxed error raised by a handler's event stream.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Terminal failure of a routed event stream.
///
/// A routed stream yields at most one of these, as its last item.
/// None of them are retryable at the routing layer: retries belong to
/// the handler that failed.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum RouterError<F: fmt::Debug> {
    /// No registration claims this effect's type. This is a configuration
    /// defect, not a transient failure.
    #[error("unknown effect: {0:?}")]
    UnknownEffect(F),

    /// A handler's event stream failed. The handler's error is carried
    /// unchanged.
    #[error("handler failed: {0}")]
    Handler(#[source] BoxError),

    /// A handler panicked while producing events.
    #[error("branch `{branch}` panicked: {message}")]
    Panicked {
        /// Name of the branch whose handler panicked.
        branch: String,
        /// The panic payload, if it was a string.
        message: String,
    },
}

impl<F: fmt::Debug> RouterError<F> {
    /// The unclaimed effect, if this is [`RouterError::UnknownEffect`].
    pub fn unknown_effect(&self) -> Option<&F> {
        match self {
            Self::UnknownEffect(effect) => Some(effect),
            _ => None,
        }
    }

    /// Whether this is [`RouterError::UnknownEffect`].
    pub fn is_unknown_effect(&self) -> bool {
        matches!(self, Self::UnknownEffect(_))
    }

    /// Take the handler's own error out, if this is [`RouterError::Handler`].
    pub fn into_handler_error(self) -> Option<BoxError> {
        match self {
            Self::Handler(err) => Some(err),
            _ => None,
        }
    }
}
