//! Interpreting the model's free-text reply.
//!
//! The model is asked for `{"category": "...", "severity": "..."}` but does
//! not always comply: replies arrive wrapped in Markdown fences, as a bare
//! label, or with labels in the wrong case. A JSON verdict or a single-word
//! reply naming a known category is accepted; prose is not.

use serde::Deserialize;
use strum::IntoEnumIterator as _;
use uwazi_core::{
  classify::Classification,
  issue::{Category, Severity},
};

use crate::{Error, Result};

#[derive(Deserialize)]
struct Verdict {
  category: String,
  #[serde(default)]
  severity: Option<String>,
}

/// Parse the model's reply into a [`Classification`].
///
/// An unrecognised severity is dropped (the caller falls back to keyword
/// rules); an unrecognised category is an error.
pub fn parse_reply(text: &str) -> Result<Classification> {
  let body = strip_fences(text);
  if body.is_empty() {
    return Err(Error::Malformed("empty reply".into()));
  }

  let (category, severity) = match serde_json::from_str::<Verdict>(body) {
    Ok(verdict) => (verdict.category, verdict.severity),
    Err(_) if is_bare_label(body) => (body.to_owned(), None),
    Err(_) => return Err(Error::UnrecognizedLabel(body.to_owned())),
  };

  let category =
    match_category(&category).ok_or_else(|| Error::UnrecognizedLabel(category.clone()))?;
  let severity = severity.as_deref().and_then(match_severity);

  Ok(Classification { category, severity })
}

/// Find the category named in `label`, ignoring case, punctuation and
/// surrounding words.
pub fn match_category(label: &str) -> Option<Category> {
  let normalized = normalize(label);
  Category::iter().find(|c| normalized.contains(AsRef::<str>::as_ref(c)))
}

pub fn match_severity(label: &str) -> Option<Severity> {
  let normalized = normalize(label);
  Severity::iter().find(|s| normalized.contains(AsRef::<str>::as_ref(s)))
}

/// One word, give or take trailing punctuation.
fn is_bare_label(body: &str) -> bool {
  const MAX_LABEL_CHARS: usize = 32;
  body.chars().count() <= MAX_LABEL_CHARS && body.split_whitespace().count() == 1
}

/// Lowercase ASCII letters only.
fn normalize(label: &str) -> String {
  label
    .chars()
    .filter(char::is_ascii_alphabetic)
    .map(|c| c.to_ascii_lowercase())
    .collect()
}

fn strip_fences(text: &str) -> &str {
  let text = text.trim();
  let Some(rest) = text.strip_prefix("```") else {
    return text;
  };
  // Drop the info string (e.g. "json") on the opening fence line.
  let rest = rest.split_once('\n').map_or("", |(_, body)| body);
  rest.trim_end().trim_end_matches("```").trim()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn plain_json() {
    let c = parse_reply(r#"{"category": "water", "severity": "high"}"#).unwrap();
    assert_eq!(c.category, Category::Water);
    assert_eq!(c.severity, Some(Severity::High));
  }

  #[test]
  fn fenced_json_with_capitalised_labels() {
    let reply = "```json\n{\n  \"category\": \"Health\",\n  \"severity\": \"Critical\"\n}\n```";
    let c = parse_reply(reply).unwrap();
    assert_eq!(c.category, Category::Health);
    assert_eq!(c.severity, Some(Severity::Critical));
  }

  #[test]
  fn bare_label() {
    let c = parse_reply("Roads.\n").unwrap();
    assert_eq!(c.category, Category::Roads);
    assert_eq!(c.severity, None);
  }

  #[test]
  fn prose_is_not_a_label() {
    let err = parse_reply("unclear, not about roads").unwrap_err();
    assert!(matches!(err, Error::UnrecognizedLabel(ref label) if label.contains("unclear")));
    assert!(parse_reply("I think this is about water.").is_err());
    assert_eq!(parse_reply("**Water**").unwrap().category, Category::Water);
  }

  #[test]
  fn missing_or_unknown_severity_is_dropped() {
    let c = parse_reply(r#"{"category": "security"}"#).unwrap();
    assert_eq!(c.severity, None);
    let c = parse_reply(r#"{"category": "security", "severity": "meh"}"#).unwrap();
    assert_eq!(c.severity, None);
  }

  #[test]
  fn unknown_category_is_an_error() {
    let err = parse_reply(r#"{"category": "Electricity", "severity": "Low"}"#).unwrap_err();
    assert!(matches!(err, Error::UnrecognizedLabel(label) if label == "Electricity"));
  }

  #[test]
  fn empty_reply_is_malformed() {
    assert!(matches!(parse_reply("  "), Err(Error::Malformed(_))));
    assert!(matches!(parse_reply("```\n```"), Err(Error::Malformed(_))));
  }

  #[test]
  fn labels_are_matched_by_containment() {
    assert_eq!(match_category("Category: ENVIRONMENT!"), Some(Category::Environment));
    assert_eq!(match_category("Public-Housing"), Some(Category::Housing));
    assert_eq!(match_severity("very high"), Some(Severity::High));
    assert_eq!(match_category("electricity"), None);
  }
}
