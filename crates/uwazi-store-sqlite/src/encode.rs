//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Labels (category, severity,
//! status) are stored as their lowercase names. Tags are stored as a compact
//! JSON array. UUIDs are stored as hyphenated lowercase strings.

use std::{collections::BTreeSet, str::FromStr};

use chrono::{DateTime, Utc};
use uuid::Uuid;
use uwazi_core::issue::{AdminResponse, Coordinates, InternalNote, Issue, IssueUpdate};

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("bad timestamp {s:?}: {e}")))
}

// ─── Labels ───────────────────────────────────────────────────────────────────

pub fn encode_label<T: AsRef<str>>(label: T) -> String { label.as_ref().to_owned() }

pub fn decode_label<T: FromStr>(kind: &str, s: &str) -> Result<T> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown {kind}: {s:?}")))
}

// ─── Tags ────────────────────────────────────────────────────────────────────

pub fn encode_tags(tags: &BTreeSet<String>) -> Result<String> {
  Ok(serde_json::to_string(tags)?)
}

pub fn decode_tags(s: &str) -> Result<BTreeSet<String>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawIssue::from_row`]; `i` aliases `issues`, `r`
/// aliases the left-joined `admin_responses`.
pub const ISSUE_COLUMNS: &str = "
  i.issue_id, i.title, i.description, i.category, i.severity, i.status,
  i.county, i.constituency, i.ward, i.location, i.latitude, i.longitude,
  i.submitted_by, i.anonymous, i.date_submitted, i.last_updated,
  i.upvotes, i.downvotes, i.tags,
  r.response_id, r.message, r.responded_by, r.responded_at, r.is_public";

/// Raw values read directly from an `issues` row joined with its response.
pub struct RawIssue {
  pub issue_id:       String,
  pub title:          String,
  pub description:    String,
  pub category:       String,
  pub severity:       String,
  pub status:         String,
  pub county:         String,
  pub constituency:   String,
  pub ward:           String,
  pub location:       Option<String>,
  pub latitude:       Option<f64>,
  pub longitude:      Option<f64>,
  pub submitted_by:   String,
  pub anonymous:      bool,
  pub date_submitted: String,
  pub last_updated:   String,
  pub upvotes:        i64,
  pub downvotes:      i64,
  pub tags:           String,
  // admin_responses join
  pub response_id:    Option<String>,
  pub message:        Option<String>,
  pub responded_by:   Option<String>,
  pub responded_at:   Option<String>,
  pub is_public:      Option<bool>,
}

impl RawIssue {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      issue_id:       row.get(0)?,
      title:          row.get(1)?,
      description:    row.get(2)?,
      category:       row.get(3)?,
      severity:       row.get(4)?,
      status:         row.get(5)?,
      county:         row.get(6)?,
      constituency:   row.get(7)?,
      ward:           row.get(8)?,
      location:       row.get(9)?,
      latitude:       row.get(10)?,
      longitude:      row.get(11)?,
      submitted_by:   row.get(12)?,
      anonymous:      row.get(13)?,
      date_submitted: row.get(14)?,
      last_updated:   row.get(15)?,
      upvotes:        row.get(16)?,
      downvotes:      row.get(17)?,
      tags:           row.get(18)?,
      response_id:    row.get(19)?,
      message:        row.get(20)?,
      responded_by:   row.get(21)?,
      responded_at:   row.get(22)?,
      is_public:      row.get(23)?,
    })
  }

  pub fn into_issue(
    self,
    internal_notes: Vec<InternalNote>,
    updates: Vec<IssueUpdate>,
  ) -> Result<Issue> {
    let coordinates = match (self.latitude, self.longitude) {
      (Some(lat), Some(lng)) => Some(Coordinates { lat, lng }),
      _ => None,
    };

    let admin_response = match (
      self.response_id,
      self.message,
      self.responded_by,
      self.responded_at,
    ) {
      (Some(id), Some(message), Some(responded_by), Some(at)) => Some(AdminResponse {
        response_id: decode_uuid(&id)?,
        message,
        responded_by,
        responded_at: decode_dt(&at)?,
        is_public: self.is_public.unwrap_or(true),
      }),
      _ => None,
    };

    Ok(Issue {
      issue_id: decode_uuid(&self.issue_id)?,
      title: self.title,
      description: self.description,
      category: decode_label("category", &self.category)?,
      severity: decode_label("severity", &self.severity)?,
      status: decode_label("status", &self.status)?,
      county: self.county,
      constituency: self.constituency,
      ward: self.ward,
      location: self.location,
      coordinates,
      submitted_by: Some(self.submitted_by),
      anonymous: self.anonymous,
      date_submitted: decode_dt(&self.date_submitted)?,
      last_updated: decode_dt(&self.last_updated)?,
      upvotes: decode_count(self.upvotes)?,
      downvotes: decode_count(self.downvotes)?,
      admin_response,
      internal_notes,
      updates,
      tags: decode_tags(&self.tags)?,
    })
  }
}

fn decode_count(n: i64) -> Result<u64> {
  u64::try_from(n).map_err(|_| Error::Decode(format!("negative vote count {n}")))
}

/// Raw strings read directly from an `internal_notes` row.
pub struct RawNote {
  pub note_id:  String,
  pub issue_id: String,
  pub note:     String,
  pub added_by: String,
  pub added_at: String,
}

impl RawNote {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      note_id:  row.get(0)?,
      issue_id: row.get(1)?,
      note:     row.get(2)?,
      added_by: row.get(3)?,
      added_at: row.get(4)?,
    })
  }

  pub fn into_note(self) -> Result<InternalNote> {
    Ok(InternalNote {
      note_id:  decode_uuid(&self.note_id)?,
      note:     self.note,
      added_by: self.added_by,
      added_at: decode_dt(&self.added_at)?,
    })
  }
}

/// Raw values read directly from an `issue_updates` row.
pub struct RawUpdate {
  pub update_id:   String,
  pub issue_id:    String,
  pub title:       String,
  pub description: String,
  pub updated_by:  String,
  pub posted_at:   String,
  pub is_public:   bool,
}

impl RawUpdate {
  pub const COLUMNS: &str =
    "update_id, issue_id, title, description, updated_by, posted_at, is_public";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      update_id:   row.get(0)?,
      issue_id:    row.get(1)?,
      title:       row.get(2)?,
      description: row.get(3)?,
      updated_by:  row.get(4)?,
      posted_at:   row.get(5)?,
      is_public:   row.get(6)?,
    })
  }

  pub fn into_update(self) -> Result<IssueUpdate> {
    Ok(IssueUpdate {
      update_id:   decode_uuid(&self.update_id)?,
      title:       self.title,
      description: self.description,
      updated_by:  self.updated_by,
      posted_at:   decode_dt(&self.posted_at)?,
      is_public:   self.is_public,
    })
  }
}
