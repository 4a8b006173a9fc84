//! Filtering and free-text search over an issue collection.
//!
//! Everything here is a pure function of its inputs. [`apply`] preserves the
//! input order; [`sort`] is the only way to reorder.

use std::{cmp::Ordering, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::issue::{Category, Issue, Severity, Status};

// ─── Facet ───────────────────────────────────────────────────────────────────

/// A facet selection: either everything, or exactly one value.
///
/// Serialised as the literal string `"all"` or the value's own label.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Facet<T> {
  #[default]
  All,
  Only(T),
}

impl<T: PartialEq> Facet<T> {
  pub fn matches(&self, value: &T) -> bool {
    match self {
      Self::All => true,
      Self::Only(wanted) => wanted == value,
    }
  }
}

impl<T> From<Option<T>> for Facet<T> {
  fn from(value: Option<T>) -> Self { value.map_or(Self::All, Self::Only) }
}

impl<T: FromStr> FromStr for Facet<T> {
  type Err = T::Err;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let s = s.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("all") {
      Ok(Self::All)
    } else {
      s.parse().map(Self::Only)
    }
  }
}

impl<T: fmt::Display> fmt::Display for Facet<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::All => f.write_str("all"),
      Self::Only(v) => v.fmt(f),
    }
  }
}

impl<T: fmt::Display> Serialize for Facet<T> {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de, T> Deserialize<'de> for Facet<T>
where
  T: FromStr,
  T::Err: fmt::Display,
{
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
  }
}

// ─── Query ───────────────────────────────────────────────────────────────────

/// Criteria for [`apply`]. All criteria combine with logical AND; the default
/// query matches every issue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueQuery {
  /// Case-insensitive substring matched against title, description, ward,
  /// county and constituency. Blank matches everything.
  pub search:           Option<String>,
  pub status:           Facet<Status>,
  pub category:         Facet<Category>,
  pub severity:         Facet<Severity>,
  /// Exact county name, or `all`.
  pub county:           Facet<String>,
  /// Case-insensitive substring of the constituency.
  pub constituency:     Option<String>,
  /// Case-insensitive substring of the ward.
  pub ward:             Option<String>,
  /// `true` for anonymous submissions only, `false` for named ones.
  pub anonymous:        Facet<bool>,
  /// Restrict to issues submitted by this user ("my issues").
  pub submitted_by:     Option<String>,
  /// Inclusive lower bound on `date_submitted`.
  pub submitted_after:  Option<DateTime<Utc>>,
  /// Inclusive upper bound on `date_submitted`.
  pub submitted_before: Option<DateTime<Utc>>,
}

impl IssueQuery {
  /// Whether `issue` satisfies every criterion.
  pub fn matches(&self, issue: &Issue) -> bool {
    self.matches_search(issue)
      && self.status.matches(&issue.status)
      && self.category.matches(&issue.category)
      && self.severity.matches(&issue.severity)
      && self.county.matches(&issue.county)
      && matches_part(self.constituency.as_deref(), &issue.constituency)
      && matches_part(self.ward.as_deref(), &issue.ward)
      && self.anonymous.matches(&issue.anonymous)
      && self
        .submitted_by
        .as_deref()
        .is_none_or(|who| issue.is_submitted_by(who))
      && self.submitted_after.is_none_or(|t| issue.date_submitted >= t)
      && self.submitted_before.is_none_or(|t| issue.date_submitted <= t)
  }

  fn matches_search(&self, issue: &Issue) -> bool {
    let Some(needle) = self
      .search
      .as_deref()
      .map(str::trim)
      .filter(|s| !s.is_empty())
    else {
      return true;
    };
    let needle = needle.to_lowercase();

    [
      &issue.title,
      &issue.description,
      &issue.ward,
      &issue.county,
      &issue.constituency,
    ]
    .into_iter()
    .any(|field| field.to_lowercase().contains(&needle))
  }
}

/// Whether `haystack` contains `needle`, ignoring case and the needle's
/// surrounding whitespace.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
  haystack.to_lowercase().contains(&needle.trim().to_lowercase())
}

fn matches_part(needle: Option<&str>, haystack: &str) -> bool {
  needle.is_none_or(|n| contains_ignore_case(haystack, n))
}

// ─── Ordering ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
  Submitted,
  Updated,
  Upvotes,
  Severity,
}

/// An explicit list order, written `field` for ascending or `-field` for
/// descending, with `field` one of `created_at`, `updated_at`, `upvotes` or
/// `severity`. Severity sorts by urgency, not alphabetically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssueOrder {
  pub key:        SortKey,
  pub descending: bool,
}

impl IssueOrder {
  fn compare(&self, a: &Issue, b: &Issue) -> Ordering {
    let ord = match self.key {
      SortKey::Submitted => a.date_submitted.cmp(&b.date_submitted),
      SortKey::Updated => a.last_updated.cmp(&b.last_updated),
      SortKey::Upvotes => a.upvotes.cmp(&b.upvotes),
      SortKey::Severity => a.severity.cmp(&b.severity),
    };
    if self.descending { ord.reverse() } else { ord }
  }
}

impl FromStr for IssueOrder {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let s = s.trim();
    let (descending, field) = match s.strip_prefix('-') {
      Some(field) => (true, field),
      None => (false, s),
    };
    let key = match field {
      "created_at" => SortKey::Submitted,
      "updated_at" => SortKey::Updated,
      "upvotes" => SortKey::Upvotes,
      "severity" => SortKey::Severity,
      other => return Err(format!("cannot order by {other:?}")),
    };
    Ok(Self { key, descending })
  }
}

impl fmt::Display for IssueOrder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let field = match self.key {
      SortKey::Submitted => "created_at",
      SortKey::Updated => "updated_at",
      SortKey::Upvotes => "upvotes",
      SortKey::Severity => "severity",
    };
    if self.descending {
      f.write_str("-")?;
    }
    f.write_str(field)
  }
}

impl Serialize for IssueOrder {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for IssueOrder {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
  }
}

/// Stable sort: issues that compare equal keep their relative order.
pub fn sort(issues: &mut [Issue], order: IssueOrder) {
  issues.sort_by(|a, b| order.compare(a, b));
}

/// The issues in `issues` that match `query`, in their original order.
pub fn apply(issues: &[Issue], query: &IssueQuery) -> Vec<Issue> {
  issues.iter().filter(|i| query.matches(i)).cloned().collect()
}
