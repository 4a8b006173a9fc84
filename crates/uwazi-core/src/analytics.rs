//! Summary statistics over an issue collection.
//!
//! Every report is recomputed from the snapshot it is given; nothing is cached.

use std::collections::BTreeMap;

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator as _;
use uuid::Uuid;

use crate::issue::{Category, Issue, Severity, Status};

// ─── Summary ─────────────────────────────────────────────────────────────────

/// Headline numbers for a dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
  pub total:           usize,
  /// Always contains every status, zero-filled.
  pub by_status:       BTreeMap<Status, usize>,
  /// Only categories actually present.
  pub by_category:     BTreeMap<Category, usize>,
  /// Only severities actually present.
  pub by_severity:     BTreeMap<Severity, usize>,
  /// Only counties actually present.
  pub by_county:       BTreeMap<String, usize>,
  /// Resolved issues as a whole percentage of all issues; 0 when empty.
  pub resolution_rate: u32,
}

pub fn summarize(issues: &[Issue]) -> Summary {
  let mut by_status: BTreeMap<Status, usize> = Status::iter().map(|s| (s, 0)).collect();
  let mut by_category = BTreeMap::new();
  let mut by_severity = BTreeMap::new();
  let mut by_county = BTreeMap::new();

  for issue in issues {
    *by_status.entry(issue.status).or_default() += 1;
    *by_category.entry(issue.category).or_default() += 1;
    *by_severity.entry(issue.severity).or_default() += 1;
    *by_county.entry(issue.county.clone()).or_default() += 1;
  }

  let resolved = by_status[&Status::Resolved];
  Summary {
    total: issues.len(),
    resolution_rate: percentage(resolved, issues.len()),
    by_status,
    by_category,
    by_severity,
    by_county,
  }
}

/// `round(part / whole × 100)` with halves rounding up; 0 when `whole` is 0.
pub fn percentage(part: usize, whole: usize) -> u32 {
  if whole == 0 {
    return 0;
  }
  let scaled = (part as u64 * 200 + whole as u64) / (whole as u64 * 2);
  scaled as u32
}

// ─── Breakdowns ──────────────────────────────────────────────────────────────

/// Per-status counts shared by the county and category breakdowns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
  pub total:           usize,
  pub open:            usize,
  pub pending:         usize,
  pub resolved:        usize,
  pub closed:          usize,
  /// Resolved as a whole percentage of `total`.
  pub resolution_rate: u32,
}

impl StatusCounts {
  fn record(&mut self, status: Status) {
    self.total += 1;
    match status {
      Status::Open => self.open += 1,
      Status::Pending => self.pending += 1,
      Status::Resolved => self.resolved += 1,
      Status::Closed => self.closed += 1,
    }
    self.resolution_rate = percentage(self.resolved, self.total);
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountyStats {
  pub county: String,
  #[serde(flatten)]
  pub counts: StatusCounts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStats {
  pub category: Category,
  #[serde(flatten)]
  pub counts:   StatusCounts,
  pub critical: usize,
  pub high:     usize,
}

/// One row per county present, busiest first (ties by name).
pub fn county_stats(issues: &[Issue]) -> Vec<CountyStats> {
  let mut acc: BTreeMap<&str, StatusCounts> = BTreeMap::new();
  for issue in issues {
    acc.entry(issue.county.as_str()).or_default().record(issue.status);
  }

  let mut rows: Vec<CountyStats> = acc
    .into_iter()
    .map(|(county, counts)| CountyStats {
      county: county.to_owned(),
      counts,
    })
    .collect();
  // BTreeMap iteration is name-ordered and the sort is stable.
  rows.sort_by(|a, b| b.counts.total.cmp(&a.counts.total));
  rows
}

/// One row per category present, busiest first (ties by category order).
pub fn category_stats(issues: &[Issue]) -> Vec<CategoryStats> {
  let mut acc: BTreeMap<Category, CategoryStats> = BTreeMap::new();
  for issue in issues {
    let row = acc.entry(issue.category).or_insert_with(|| CategoryStats {
      category: issue.category,
      counts:   StatusCounts::default(),
      critical: 0,
      high:     0,
    });
    row.counts.record(issue.status);
    match issue.severity {
      Severity::Critical => row.critical += 1,
      Severity::High => row.high += 1,
      Severity::Low | Severity::Medium => {}
    }
  }

  let mut rows: Vec<CategoryStats> = acc.into_values().collect();
  rows.sort_by(|a, b| b.counts.total.cmp(&a.counts.total));
  rows
}

// ─── Trends ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTrend {
  pub date:     NaiveDate,
  /// Issues submitted on this day.
  pub issues:   usize,
  /// Issues currently resolved whose last update fell on this day.
  pub resolved: usize,
}

/// Daily counts for every day from `end - days` through `end`, oldest first.
/// A window reaching past the earliest representable date starts there.
pub fn daily_trends(issues: &[Issue], end: NaiveDate, days: u32) -> Vec<DailyTrend> {
  let start = end
    .checked_sub_days(Days::new(days.into()))
    .unwrap_or(NaiveDate::MIN);

  let mut rows: BTreeMap<NaiveDate, DailyTrend> = start
    .iter_days()
    .take_while(|d| *d <= end)
    .map(|date| {
      (date, DailyTrend {
        date,
        issues: 0,
        resolved: 0,
      })
    })
    .collect();

  for issue in issues {
    if let Some(row) = rows.get_mut(&issue.date_submitted.date_naive()) {
      row.issues += 1;
    }
    if issue.status == Status::Resolved
      && let Some(row) = rows.get_mut(&issue.last_updated.date_naive())
    {
      row.resolved += 1;
    }
  }

  rows.into_values().collect()
}

// ─── Recent activity ─────────────────────────────────────────────────────────

/// A compact line for an activity feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
  pub issue_id:     Uuid,
  pub title:        String,
  pub status:       Status,
  pub category:     Category,
  pub county:       String,
  pub ward:         String,
  pub last_updated: DateTime<Utc>,
}

/// The `limit` most recently updated issues, newest first.
pub fn recent_activity(issues: &[Issue], limit: usize) -> Vec<ActivityEntry> {
  let mut sorted: Vec<&Issue> = issues.iter().collect();
  sorted.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
  sorted
    .into_iter()
    .take(limit)
    .map(|i| ActivityEntry {
      issue_id:     i.issue_id,
      title:        i.title.clone(),
      status:       i.status,
      category:     i.category,
      county:       i.county.clone(),
      ward:         i.ward.clone(),
      last_updated: i.last_updated,
    })
    .collect()
}
