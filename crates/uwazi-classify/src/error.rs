//! Error type for `uwazi-classify`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("no Gemini API key configured")]
  MissingCredentials,

  #[error("classifier request failed: {0}")]
  Http(reqwest::Error),

  #[error("classifier returned {status}: {body}")]
  Status {
    status: reqwest::StatusCode,
    body:   String,
  },

  #[error("malformed classifier reply: {0}")]
  Malformed(String),

  #[error("unrecognised category label {0:?}")]
  UnrecognizedLabel(String),
}

impl From<reqwest::Error> for Error {
  /// Strips the request URL so endpoint details never reach the logs.
  fn from(err: reqwest::Error) -> Self { Self::Http(err.without_url()) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
