//! Gemini-backed [`Classifier`](uwazi_core::classify::Classifier) for Uwazi.
//!
//! Sends a submission's title and description to the Gemini
//! `generateContent` endpoint and reads back a category and severity. Every
//! failure is reported as an [`Error`]; turning failures into fallback
//! labels is the caller's job (see [`uwazi_core::classify::assess`]).

mod error;
mod gemini;
mod reply;

pub use error::{Error, Result};
pub use gemini::{GeminiClassifier, GeminiConfig};
pub use reply::{match_category, match_severity, parse_reply};
