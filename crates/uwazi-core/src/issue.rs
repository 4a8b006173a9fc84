//! Issue types: the citizen reports at the heart of Uwazi.
//!
//! An issue is created by a submission, then mutated only by vote events and
//! by staff status/response/note/update events. Issues are never deleted.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::{Error, Result, user::Actor};

// ─── Labels ──────────────────────────────────────────────────────────────────

/// The fixed set of problem areas an issue can be filed under.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  AsRefStr,
  EnumString,
  EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Category {
  Roads,
  Water,
  Health,
  Security,
  Corruption,
  Education,
  Environment,
  Housing,
}

/// How urgently an issue needs attention.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  AsRefStr,
  EnumString,
  EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
  Low,
  #[default]
  Medium,
  High,
  Critical,
}

/// Workflow stage. Any status may follow any other.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  AsRefStr,
  EnumString,
  EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Status {
  #[default]
  Open,
  Pending,
  Resolved,
  Closed,
}

// ─── Attachments ─────────────────────────────────────────────────────────────

/// A WGS84 point where the problem was observed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
  pub lat: f64,
  pub lng: f64,
}

/// The official, citizen-facing reply to an issue. An issue carries at most
/// one; a new response replaces the previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminResponse {
  pub response_id:  Uuid,
  pub message:      String,
  pub responded_by: String,
  pub responded_at: DateTime<Utc>,
  pub is_public:    bool,
}

/// A staff-only annotation. Never shown to citizens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InternalNote {
  pub note_id:  Uuid,
  pub note:     String,
  pub added_by: String,
  pub added_at: DateTime<Utc>,
}

/// An entry on an issue's progress timeline, e.g. "Contractor on site".
/// Non-public entries are visible to staff only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueUpdate {
  pub update_id:   Uuid,
  pub title:       String,
  pub description: String,
  pub updated_by:  String,
  pub posted_at:   DateTime<Utc>,
  pub is_public:   bool,
}

// ─── Issue ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
  pub issue_id:       Uuid,
  pub title:          String,
  pub description:    String,
  pub category:       Category,
  pub severity:       Severity,
  pub status:         Status,
  pub county:         String,
  pub constituency:   String,
  pub ward:           String,
  /// Free-text landmark, e.g. "Kahawa West Shopping Center".
  pub location:       Option<String>,
  pub coordinates:    Option<Coordinates>,
  /// `None` only in views redacted for a viewer who may not see it.
  pub submitted_by:   Option<String>,
  pub anonymous:      bool,
  pub date_submitted: DateTime<Utc>,
  /// Advances on every content or workflow change; votes leave it alone.
  pub last_updated:   DateTime<Utc>,
  pub upvotes:        u64,
  pub downvotes:      u64,
  pub admin_response: Option<AdminResponse>,
  /// Newest first.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub internal_notes: Vec<InternalNote>,
  /// Progress timeline, newest first.
  #[serde(default)]
  pub updates:        Vec<IssueUpdate>,
  pub tags:           BTreeSet<String>,
}

impl Issue {
  pub fn vote_score(&self) -> i64 {
    self.upvotes as i64 - self.downvotes as i64
  }

  pub fn is_submitted_by(&self, user_id: &str) -> bool {
    self.submitted_by.as_deref() == Some(user_id)
  }

  /// The view of this issue that `viewer` is allowed to see.
  ///
  /// Staff see everything. Others lose internal notes, non-public responses
  /// and non-public timeline updates, and the submitter of an anonymous issue is hidden from
  /// everyone but the submitter.
  pub fn redacted_for(mut self, viewer: Option<&Actor>) -> Self {
    if viewer.is_some_and(Actor::is_staff) {
      return self;
    }

    self.internal_notes.clear();
    self.updates.retain(|u| u.is_public);
    if self.admin_response.as_ref().is_some_and(|r| !r.is_public) {
      self.admin_response = None;
    }
    let is_owner = viewer.is_some_and(|v| self.is_submitted_by(&v.user_id));
    if self.anonymous && !is_owner {
      self.submitted_by = None;
    }
    self
  }
}

// ─── NewIssue ────────────────────────────────────────────────────────────────

/// Input to [`crate::store::IssueStore::submit`].
///
/// `category` and `severity` are provisional: the intake flow replaces them
/// with the classifier's verdict before committing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewIssue {
  pub title:        String,
  pub description:  String,
  pub category:     Category,
  #[serde(default)]
  pub severity:     Severity,
  pub county:       String,
  pub constituency: String,
  pub ward:         String,
  #[serde(default)]
  pub location:     Option<String>,
  #[serde(default)]
  pub coordinates:  Option<Coordinates>,
  #[serde(default)]
  pub anonymous:    bool,
  #[serde(default)]
  pub tags:         BTreeSet<String>,
}

impl NewIssue {
  /// Convenience constructor with the optional fields left empty.
  pub fn new(
    title: impl Into<String>,
    description: impl Into<String>,
    county: impl Into<String>,
    constituency: impl Into<String>,
    ward: impl Into<String>,
  ) -> Self {
    Self {
      title:        title.into(),
      description:  description.into(),
      category:     Category::Roads,
      severity:     Severity::default(),
      county:       county.into(),
      constituency: constituency.into(),
      ward:         ward.into(),
      location:     None,
      coordinates:  None,
      anonymous:    false,
      tags:         BTreeSet::new(),
    }
  }

  /// Reject drafts with blank required fields, naming every one that is
  /// missing.
  pub fn validate(&self) -> Result<()> {
    let missing: Vec<&str> = [
      ("title", &self.title),
      ("description", &self.description),
      ("county", &self.county),
      ("constituency", &self.constituency),
      ("ward", &self.ward),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(name, _)| name)
    .collect();

    if missing.is_empty() {
      Ok(())
    } else {
      Err(Error::Validation(format!(
        "missing required field(s): {}",
        missing.join(", ")
      )))
    }
  }

  /// Build the committed issue. `id` and `now` are supplied by the store.
  pub fn into_issue(self, id: Uuid, submitted_by: &Actor, now: DateTime<Utc>) -> Issue {
    Issue {
      issue_id:       id,
      title:          self.title.trim().to_owned(),
      description:    self.description.trim().to_owned(),
      category:       self.category,
      severity:       self.severity,
      status:         Status::Open,
      county:         self.county.trim().to_owned(),
      constituency:   self.constituency.trim().to_owned(),
      ward:           self.ward.trim().to_owned(),
      location:       self
        .location
        .map(|l| l.trim().to_owned())
        .filter(|l| !l.is_empty()),
      coordinates:    self.coordinates,
      submitted_by:   Some(submitted_by.user_id.clone()),
      anonymous:      self.anonymous,
      date_submitted: now,
      last_updated:   now,
      upvotes:        0,
      downvotes:      0,
      admin_response: None,
      internal_notes: Vec::new(),
      updates:        Vec::new(),
      tags:           self.tags,
    }
  }
}

/// Which counter a vote increments.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum VoteDirection {
  Up,
  Down,
}

/// Require `text` to be non-blank, returning it trimmed.
pub fn required_text(field: &str, text: &str) -> Result<String> {
  let trimmed = text.trim();
  if trimmed.is_empty() {
    Err(Error::Validation(format!("{field} must not be empty")))
  } else {
    Ok(trimmed.to_owned())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::user::Role;

  fn draft() -> NewIssue {
    NewIssue::new(
      "Broken pipe",
      "Water leaking for 3 days",
      "Kiambu",
      "Ruiru",
      "Kahawa West",
    )
  }

  #[test]
  fn valid_draft_passes() { assert!(draft().validate().is_ok()); }

  #[test]
  fn blank_fields_are_all_reported() {
    let mut d = draft();
    d.title = "   ".into();
    d.ward = String::new();
    let err = d.validate().unwrap_err();
    let Error::Validation(msg) = err else { panic!("expected validation") };
    assert!(msg.contains("title"), "{msg}");
    assert!(msg.contains("ward"), "{msg}");
    assert!(!msg.contains("county"), "{msg}");
  }

  #[test]
  fn into_issue_starts_open_with_no_votes() {
    let now = Utc::now();
    let actor = Actor::new("u1", Role::Citizen);
    let issue = draft().into_issue(Uuid::new_v4(), &actor, now);
    assert_eq!(issue.status, Status::Open);
    assert_eq!((issue.upvotes, issue.downvotes), (0, 0));
    assert_eq!(issue.date_submitted, issue.last_updated);
    assert_eq!(issue.submitted_by.as_deref(), Some("u1"));
  }

  #[test]
  fn labels_round_trip_through_strings() {
    assert_eq!(Category::Environment.to_string(), "environment");
    assert_eq!("critical".parse::<Severity>().unwrap(), Severity::Critical);
    assert!("urgent".parse::<Status>().is_err());
  }

  fn issue_with_extras(anonymous: bool) -> Issue {
    let mut issue = draft().into_issue(
      Uuid::new_v4(),
      &Actor::new("owner", Role::Citizen),
      Utc::now(),
    );
    issue.anonymous = anonymous;
    issue.admin_response = Some(AdminResponse {
      response_id:  Uuid::new_v4(),
      message:      "Looking into it".into(),
      responded_by: "admin".into(),
      responded_at: Utc::now(),
      is_public:    false,
    });
    issue.internal_notes.push(InternalNote {
      note_id:  Uuid::new_v4(),
      note:     "Contractor already paid".into(),
      added_by: "admin".into(),
      added_at: Utc::now(),
    });
    for (title, is_public) in [("Crew dispatched", true), ("Budget query", false)] {
      issue.updates.push(IssueUpdate {
        update_id: Uuid::new_v4(),
        title: title.into(),
        description: "details".into(),
        updated_by: "admin".into(),
        posted_at: Utc::now(),
        is_public,
      });
    }
    issue
  }

  #[test]
  fn staff_see_everything() {
    let staff = Actor::new("admin", Role::Admin);
    let view = issue_with_extras(true).redacted_for(Some(&staff));
    assert_eq!(view.submitted_by.as_deref(), Some("owner"));
    assert!(view.admin_response.is_some());
    assert_eq!(view.internal_notes.len(), 1);
    assert_eq!(view.updates.len(), 2);
  }

  #[test]
  fn anonymous_submitter_hidden_from_strangers() {
    let stranger = Actor::new("someone", Role::Citizen);
    let view = issue_with_extras(true).redacted_for(Some(&stranger));
    assert!(view.submitted_by.is_none());
    assert!(view.admin_response.is_none());
    assert!(view.internal_notes.is_empty());
    let titles: Vec<&str> = view.updates.iter().map(|u| u.title.as_str()).collect();
    assert_eq!(titles, ["Crew dispatched"]);

    let public = issue_with_extras(true).redacted_for(None);
    assert!(public.submitted_by.is_none());
  }

  #[test]
  fn owner_still_sees_own_anonymous_issue() {
    let owner = Actor::new("owner", Role::Citizen);
    let view = issue_with_extras(true).redacted_for(Some(&owner));
    assert_eq!(view.submitted_by.as_deref(), Some("owner"));
    assert!(view.internal_notes.is_empty());
  }

  #[test]
  fn named_issue_keeps_submitter() {
    let view = issue_with_extras(false).redacted_for(None);
    assert_eq!(view.submitted_by.as_deref(), Some("owner"));
  }
}
