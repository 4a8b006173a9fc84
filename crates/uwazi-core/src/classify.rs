//! The classifier contract and its deterministic keyword fallback.
//!
//! A classifier assigns a category (and optionally a severity) to a new
//! submission. Classifiers are remote and unreliable; [`assess`] turns any
//! failure into a local decision so that a submission never fails because
//! classification did.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{
  Error,
  issue::{Category, Severity},
};

/// Category used when the classifier cannot decide.
pub const DEFAULT_CATEGORY: Category = Category::Roads;

const CRISIS_WORDS: &[&str] =
  &["emergency", "critical", "collapse", "attack", "dead", "injured"];
const URGENCY_WORDS: &[&str] = &["urgent", "severe", "danger", "unsafe", "accident"];
const MINIMIZING_WORDS: &[&str] = &["minor", "small issue", "slight"];

/// A classifier's verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
  pub category: Category,
  pub severity: Option<Severity>,
}

/// An external service that labels submissions.
pub trait Classifier: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Make a single attempt at labelling a submission.
  fn classify<'a>(
    &'a self,
    title: &'a str,
    description: &'a str,
  ) -> impl Future<Output = Result<Classification, Self::Error>> + Send + 'a;
}

/// A classifier that is never available; every submission takes the
/// fallback path.
#[derive(Debug, Clone, Copy, Default)]
pub struct Offline;

impl Classifier for Offline {
  type Error = Error;

  async fn classify(&self, _title: &str, _description: &str) -> Result<Classification, Error> {
    Err(Error::ClassifierUnavailable("no classifier configured".into()))
  }
}

// ─── Fallback ────────────────────────────────────────────────────────────────

/// Keyword-rule severity. Total: always returns a value.
///
/// Rules are checked in order (crisis, urgency, minimizing) against the
/// lowercased text; the first rule with any matching substring wins.
pub fn fallback_severity(text: &str) -> Severity {
  let text = text.to_lowercase();
  let any = |words: &[&str]| words.iter().any(|w| text.contains(w));

  if any(CRISIS_WORDS) {
    Severity::Critical
  } else if any(URGENCY_WORDS) {
    Severity::High
  } else if any(MINIMIZING_WORDS) {
    Severity::Low
  } else {
    Severity::Medium
  }
}

// ─── Assessment ──────────────────────────────────────────────────────────────

/// Where each label of an [`Assessment`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelSource {
  Classifier,
  Fallback,
}

/// The resolved labels for a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
  pub category:        Category,
  pub severity:        Severity,
  pub category_source: LabelSource,
  pub severity_source: LabelSource,
}

impl Assessment {
  /// Combine a classifier outcome with the keyword fallback.
  pub fn resolve<E>(
    outcome: Result<Classification, E>,
    title: &str,
    description: &str,
  ) -> Self {
    let keywords = || fallback_severity(&format!("{title} {description}"));

    match outcome {
      Ok(Classification {
        category,
        severity: Some(severity),
      }) => Self {
        category,
        severity,
        category_source: LabelSource::Classifier,
        severity_source: LabelSource::Classifier,
      },
      Ok(Classification {
        category,
        severity: None,
      }) => Self {
        category,
        severity: keywords(),
        category_source: LabelSource::Classifier,
        severity_source: LabelSource::Fallback,
      },
      Err(_) => Self {
        category:        DEFAULT_CATEGORY,
        severity:        keywords(),
        category_source: LabelSource::Fallback,
        severity_source: LabelSource::Fallback,
      },
    }
  }
}

/// Ask `classifier` once, falling back to local rules on any failure.
pub async fn assess<C: Classifier>(
  classifier: &C,
  title: &str,
  description: &str,
) -> Assessment {
  let outcome = classifier.classify(title, description).await;
  if let Err(e) = &outcome {
    tracing::warn!(error = %e, "classifier failed; using keyword fallback");
  }
  Assessment::resolve(outcome, title, description)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn crisis_words_are_critical() {
    assert_eq!(
      fallback_severity("There was a critical accident, someone is dead"),
      Severity::Critical
    );
    assert_eq!(fallback_severity("Bridge COLLAPSE on the highway"), Severity::Critical);
  }

  #[test]
  fn crisis_beats_urgency() {
    assert_eq!(fallback_severity("urgent: two people injured"), Severity::Critical);
  }

  #[test]
  fn urgency_words_are_high() {
    assert_eq!(fallback_severity("The footbridge is unsafe"), Severity::High);
    assert_eq!(fallback_severity("Severe flooding in the estate"), Severity::High);
  }

  #[test]
  fn minimizing_words_are_low() {
    assert_eq!(fallback_severity("Just a small issue with signage"), Severity::Low);
    assert_eq!(fallback_severity("slight crack in the pavement"), Severity::Low);
  }

  #[test]
  fn urgency_beats_minimizing() {
    assert_eq!(fallback_severity("minor accident at the junction"), Severity::High);
  }

  #[test]
  fn everything_else_is_medium() {
    assert_eq!(fallback_severity("Water leaking for 3 days"), Severity::Medium);
    assert_eq!(fallback_severity(""), Severity::Medium);
  }

  #[test]
  fn failure_falls_back_to_default_category() {
    let a = Assessment::resolve::<Error>(
      Err(Error::ClassifierUnavailable("timeout".into())),
      "Pothole",
      "someone was injured",
    );
    assert_eq!(a.category, DEFAULT_CATEGORY);
    assert_eq!(a.severity, Severity::Critical);
    assert_eq!(a.category_source, LabelSource::Fallback);
  }

  #[test]
  fn missing_severity_uses_keywords_but_keeps_category() {
    let a = Assessment::resolve::<Error>(
      Ok(Classification {
        category: Category::Water,
        severity: None,
      }),
      "Urgent",
      "burst pipe",
    );
    assert_eq!(a.category, Category::Water);
    assert_eq!(a.severity, Severity::High);
    assert_eq!(a.category_source, LabelSource::Classifier);
    assert_eq!(a.severity_source, LabelSource::Fallback);
  }

  #[test]
  fn full_classification_is_taken_verbatim() {
    let a = Assessment::resolve::<Error>(
      Ok(Classification {
        category: Category::Health,
        severity: Some(Severity::Low),
      }),
      "Emergency",
      "dead",
    );
    assert_eq!((a.category, a.severity), (Category::Health, Severity::Low));
  }

  #[tokio::test]
  async fn offline_classifier_always_falls_back() {
    let a = assess(&Offline, "Broken pipe", "Water leaking for 3 days").await;
    assert_eq!(a.category, Category::Roads);
    assert_eq!(a.severity, Severity::Medium);
  }
}
