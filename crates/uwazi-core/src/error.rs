//! Error types for `uwazi-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::user::Role;

#[derive(Debug, Error)]
pub enum Error {
  /// A submission or response is missing required content.
  #[error("validation failed: {0}")]
  Validation(String),

  #[error("issue not found: {0}")]
  IssueNotFound(Uuid),

  #[error("{role} {user_id:?} may not {action}")]
  Unauthorized {
    user_id: String,
    role:    Role,
    action:  &'static str,
  },

  /// Raised by classifiers; always absorbed by [`crate::classify::assess`].
  #[error("classifier unavailable: {0}")]
  ClassifierUnavailable(String),

  #[error("unknown {kind} label: {value:?}")]
  UnknownLabel { kind: &'static str, value: String },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Implemented by backend error types so that callers can recover the
/// domain failure (validation, not-found, authorization) hidden inside a
/// backend-specific error.
pub trait DomainError:
  std::error::Error + From<Error> + Send + Sync + 'static
{
  /// The wrapped domain error, if this is one. Infrastructure failures
  /// return `None`.
  fn domain(&self) -> Option<&Error>;
}

impl DomainError for Error {
  fn domain(&self) -> Option<&Error> { Some(self) }
}
