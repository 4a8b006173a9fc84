//! [`SqliteStore`]: the SQLite implementation of [`IssueStore`].

use std::{collections::HashMap, path::Path};

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension as _};
use tokio::sync::broadcast;
use uuid::Uuid;

use uwazi_core::{
  event::{EVENT_CHANNEL_CAPACITY, IssueEvent},
  issue::{
    InternalNote, Issue, IssueUpdate, NewIssue, Status, VoteDirection, required_text,
  },
  store::IssueStore,
  user::Actor,
};

use crate::{
  Error, Result,
  encode::{
    ISSUE_COLUMNS, RawIssue, RawNote, RawUpdate, decode_label, encode_dt,
    encode_label, encode_tags, encode_uuid,
  },
  schema::SCHEMA,
};

/// An issue row together with its notes and timeline, as read inside a
/// connection call.
struct Loaded {
  issue:   RawIssue,
  notes:   Vec<RawNote>,
  updates: Vec<RawUpdate>,
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// An Uwazi issue store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection and event channel are
/// reference-counted, and clones share both.
#[derive(Clone)]
pub struct SqliteStore {
  conn:   tokio_rusqlite::Connection,
  events: broadcast::Sender<IssueEvent>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::with_connection(conn).await
  }

  /// Open an in-memory store, for tests and throwaway servers.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::with_connection(conn).await
  }

  async fn with_connection(conn: tokio_rusqlite::Connection) -> Result<Self> {
    let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    let store = Self { conn, events };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Publish an event for a committed mutation. Having no subscribers is
  /// not an error.
  fn emit(&self, event: IssueEvent) {
    tracing::trace!(?event, "emitting issue event");
    let _ = self.events.send(event);
  }

  async fn vote(&self, actor: &Actor, id: Uuid, direction: VoteDirection) -> Result<Issue> {
    let column = match direction {
      VoteDirection::Up => "upvotes",
      VoteDirection::Down => "downvotes",
    };
    let id_str = encode_uuid(id);

    let loaded = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(
          &format!("UPDATE issues SET {column} = {column} + 1 WHERE issue_id = ?1"),
          rusqlite::params![id_str],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        let loaded = load_issue(&tx, &id_str)?;
        tx.commit()?;
        Ok(loaded)
      })
      .await?;

    let issue = found(id, loaded)?;
    tracing::debug!(%id, user = %actor.user_id, %direction, "vote recorded");
    self.emit(IssueEvent::Voted {
      issue_id: id,
      direction,
    });
    Ok(issue)
  }
}

// ─── Row helpers ─────────────────────────────────────────────────────────────
//
// These run on the connection thread, inside `call` closures.

fn load_issue(conn: &Connection, id: &str) -> rusqlite::Result<Option<Loaded>> {
  let raw = conn
    .query_row(
      &format!(
        "SELECT {ISSUE_COLUMNS}
         FROM issues i
         LEFT JOIN admin_responses r ON r.issue_id = i.issue_id
         WHERE i.issue_id = ?1"
      ),
      rusqlite::params![id],
      RawIssue::from_row,
    )
    .optional()?;

  let Some(raw) = raw else {
    return Ok(None);
  };

  let mut stmt = conn.prepare(
    "SELECT note_id, issue_id, note, added_by, added_at
     FROM internal_notes
     WHERE issue_id = ?1
     ORDER BY rowid DESC",
  )?;
  let notes = stmt
    .query_map(rusqlite::params![id], RawNote::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let mut stmt = conn.prepare(&format!(
    "SELECT {}
     FROM issue_updates
     WHERE issue_id = ?1
     ORDER BY rowid DESC",
    RawUpdate::COLUMNS
  ))?;
  let updates = stmt
    .query_map(rusqlite::params![id], RawUpdate::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  Ok(Some(Loaded {
    issue: raw,
    notes,
    updates,
  }))
}

struct ResponseRow {
  response_id:  String,
  message:      String,
  responded_by: String,
  responded_at: String,
  is_public:    bool,
}

impl ResponseRow {
  fn new(actor: &Actor, message: String, is_public: bool, at: &str) -> Self {
    Self {
      response_id: encode_uuid(Uuid::new_v4()),
      message,
      responded_by: actor.user_id.clone(),
      responded_at: at.to_owned(),
      is_public,
    }
  }

  fn upsert(&self, conn: &Connection, issue_id: &str) -> rusqlite::Result<()> {
    conn.execute(
      "INSERT INTO admin_responses (
         issue_id, response_id, message, responded_by, responded_at, is_public
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
       ON CONFLICT(issue_id) DO UPDATE SET
         response_id  = excluded.response_id,
         message      = excluded.message,
         responded_by = excluded.responded_by,
         responded_at = excluded.responded_at,
         is_public    = excluded.is_public",
      rusqlite::params![
        issue_id,
        self.response_id,
        self.message,
        self.responded_by,
        self.responded_at,
        self.is_public,
      ],
    )?;
    Ok(())
  }
}

fn touch(conn: &Connection, id: &str, at: &str) -> rusqlite::Result<usize> {
  conn.execute(
    "UPDATE issues SET last_updated = ?2 WHERE issue_id = ?1",
    rusqlite::params![id, at],
  )
}

// ─── Decoding ────────────────────────────────────────────────────────────────

fn decode(loaded: Loaded) -> Result<Issue> {
  let notes = loaded
    .notes
    .into_iter()
    .map(RawNote::into_note)
    .collect::<Result<Vec<_>>>()?;
  let updates = loaded
    .updates
    .into_iter()
    .map(RawUpdate::into_update)
    .collect::<Result<Vec<_>>>()?;
  loaded.issue.into_issue(notes, updates)
}

/// Decode a mutated row, or report the issue as missing.
fn found(id: Uuid, loaded: Option<Loaded>) -> Result<Issue> {
  loaded
    .map(decode)
    .transpose()?
    .ok_or(Error::Core(uwazi_core::Error::IssueNotFound(id)))
}

// ─── IssueStore impl ─────────────────────────────────────────────────────────

impl IssueStore for SqliteStore {
  type Error = Error;

  // ── Submissions ───────────────────────────────────────────────────────────

  async fn submit(&self, actor: &Actor, draft: NewIssue) -> Result<Issue> {
    draft.validate()?;
    let issue = draft.into_issue(Uuid::new_v4(), actor, Utc::now());

    let id_str           = encode_uuid(issue.issue_id);
    let category_str     = encode_label(issue.category);
    let severity_str     = encode_label(issue.severity);
    let status_str       = encode_label(issue.status);
    let submitted_at_str = encode_dt(issue.date_submitted);
    let tags_str         = encode_tags(&issue.tags)?;
    let (lat, lng)       = issue
      .coordinates
      .map(|c| (Some(c.lat), Some(c.lng)))
      .unwrap_or((None, None));

    let row = issue.clone();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO issues (
             issue_id, title, description, category, severity, status,
             county, constituency, ward, location, latitude, longitude,
             submitted_by, anonymous, date_submitted, last_updated,
             upvotes, downvotes, tags
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                     ?13, ?14, ?15, ?15, 0, 0, ?16)",
          rusqlite::params![
            id_str,
            row.title,
            row.description,
            category_str,
            severity_str,
            status_str,
            row.county,
            row.constituency,
            row.ward,
            row.location,
            lat,
            lng,
            row.submitted_by,
            row.anonymous,
            submitted_at_str,
            tags_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    tracing::info!(
      id = %issue.issue_id,
      category = %issue.category,
      severity = %issue.severity,
      county = %issue.county,
      "issue submitted"
    );
    self.emit(IssueEvent::Submitted {
      issue_id: issue.issue_id,
    });
    Ok(issue)
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get(&self, id: Uuid) -> Result<Option<Issue>> {
    let id_str = encode_uuid(id);
    let loaded = self
      .conn
      .call(move |conn| Ok(load_issue(conn, &id_str)?))
      .await?;
    loaded.map(decode).transpose()
  }

  async fn list(&self) -> Result<Vec<Issue>> {
    let (raws, raw_notes, raw_updates): (Vec<RawIssue>, Vec<RawNote>, Vec<RawUpdate>) = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ISSUE_COLUMNS}
           FROM issues i
           LEFT JOIN admin_responses r ON r.issue_id = i.issue_id
           ORDER BY i.seq DESC"
        ))?;
        let issues = stmt
          .query_map([], RawIssue::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(
          "SELECT note_id, issue_id, note, added_by, added_at
           FROM internal_notes
           ORDER BY rowid DESC",
        )?;
        let notes = stmt
          .query_map([], RawNote::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM issue_updates ORDER BY rowid DESC",
          RawUpdate::COLUMNS
        ))?;
        let updates = stmt
          .query_map([], RawUpdate::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((issues, notes, updates))
      })
      .await?;

    let mut notes_by_issue: HashMap<String, Vec<RawNote>> = HashMap::new();
    for note in raw_notes {
      notes_by_issue.entry(note.issue_id.clone()).or_default().push(note);
    }
    let mut updates_by_issue: HashMap<String, Vec<RawUpdate>> = HashMap::new();
    for update in raw_updates {
      updates_by_issue.entry(update.issue_id.clone()).or_default().push(update);
    }

    raws
      .into_iter()
      .map(|raw| {
        let notes = notes_by_issue.remove(&raw.issue_id).unwrap_or_default();
        let updates = updates_by_issue.remove(&raw.issue_id).unwrap_or_default();
        decode(Loaded {
          issue: raw,
          notes,
          updates,
        })
      })
      .collect()
  }

  // ── Engagement ────────────────────────────────────────────────────────────

  async fn upvote(&self, actor: &Actor, id: Uuid) -> Result<Issue> {
    self.vote(actor, id, VoteDirection::Up).await
  }

  async fn downvote(&self, actor: &Actor, id: Uuid) -> Result<Issue> {
    self.vote(actor, id, VoteDirection::Down).await
  }

  // ── Staff workflow ────────────────────────────────────────────────────────

  async fn set_status(
    &self,
    actor:    &Actor,
    id:       Uuid,
    status:   Status,
    response: Option<String>,
  ) -> Result<Issue> {
    actor.require_staff("change status")?;

    let id_str     = encode_uuid(id);
    let status_str = encode_label(status);
    let now_str    = encode_dt(Utc::now());
    let response   = response
      .as_deref()
      .map(str::trim)
      .filter(|text| !text.is_empty())
      .map(|text| ResponseRow::new(actor, text.to_owned(), true, &now_str));

    let outcome: Option<(String, Loaded)> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let from: Option<String> = tx
          .query_row(
            "SELECT status FROM issues WHERE issue_id = ?1",
            rusqlite::params![id_str],
            |r| r.get(0),
          )
          .optional()?;
        let Some(from) = from else {
          return Ok(None);
        };

        tx.execute(
          "UPDATE issues SET status = ?2, last_updated = ?3 WHERE issue_id = ?1",
          rusqlite::params![id_str, status_str, now_str],
        )?;
        if let Some(response) = response {
          response.upsert(&tx, &id_str)?;
        }

        let loaded = load_issue(&tx, &id_str)?;
        tx.commit()?;
        Ok(loaded.map(|l| (from, l)))
      })
      .await?;

    let Some((from, loaded)) = outcome else {
      return Err(uwazi_core::Error::IssueNotFound(id).into());
    };
    let from: Status = decode_label("status", &from)?;
    let issue = decode(loaded)?;

    tracing::info!(%id, %from, to = %status, by = %actor.user_id, "status changed");
    self.emit(IssueEvent::StatusChanged {
      issue_id: id,
      from,
      to: status,
    });
    Ok(issue)
  }

  async fn add_admin_response(
    &self,
    actor:     &Actor,
    id:        Uuid,
    message:   String,
    is_public: bool,
  ) -> Result<Issue> {
    actor.require_staff("respond to issues")?;
    let message = required_text("message", &message)?;

    let id_str   = encode_uuid(id);
    let now_str  = encode_dt(Utc::now());
    let response = ResponseRow::new(actor, message, is_public, &now_str);

    let loaded = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if touch(&tx, &id_str, &now_str)? == 0 {
          return Ok(None);
        }
        response.upsert(&tx, &id_str)?;
        let loaded = load_issue(&tx, &id_str)?;
        tx.commit()?;
        Ok(loaded)
      })
      .await?;

    let issue = found(id, loaded)?;
    tracing::info!(%id, by = %actor.user_id, is_public, "admin response recorded");
    self.emit(IssueEvent::Responded { issue_id: id });
    Ok(issue)
  }

  async fn add_internal_note(
    &self,
    actor: &Actor,
    id:    Uuid,
    note:  String,
  ) -> Result<InternalNote> {
    actor.require_staff("add internal notes")?;

    let note = InternalNote {
      note_id:  Uuid::new_v4(),
      note:     required_text("note", &note)?,
      added_by: actor.user_id.clone(),
      added_at: Utc::now(),
    };

    let id_str       = encode_uuid(id);
    let note_id_str  = encode_uuid(note.note_id);
    let at_str       = encode_dt(note.added_at);
    let text         = note.note.clone();
    let added_by     = note.added_by.clone();

    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if touch(&tx, &id_str, &at_str)? == 0 {
          return Ok(false);
        }
        tx.execute(
          "INSERT INTO internal_notes (note_id, issue_id, note, added_by, added_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![note_id_str, id_str, text, added_by, at_str],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !inserted {
      return Err(uwazi_core::Error::IssueNotFound(id).into());
    }
    tracing::debug!(%id, by = %actor.user_id, "internal note added");
    self.emit(IssueEvent::NoteAdded { issue_id: id });
    Ok(note)
  }

  async fn add_update(
    &self,
    actor:       &Actor,
    id:          Uuid,
    title:       String,
    description: String,
    is_public:   bool,
  ) -> Result<IssueUpdate> {
    actor.require_staff("post progress updates")?;

    let update = IssueUpdate {
      update_id: Uuid::new_v4(),
      title: required_text("title", &title)?,
      description: required_text("description", &description)?,
      updated_by: actor.user_id.clone(),
      posted_at: Utc::now(),
      is_public,
    };

    let row = RawUpdate {
      update_id:   encode_uuid(update.update_id),
      issue_id:    encode_uuid(id),
      title:       update.title.clone(),
      description: update.description.clone(),
      updated_by:  update.updated_by.clone(),
      posted_at:   encode_dt(update.posted_at),
      is_public,
    };

    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if touch(&tx, &row.issue_id, &row.posted_at)? == 0 {
          return Ok(false);
        }
        tx.execute(
          &format!(
            "INSERT INTO issue_updates ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            RawUpdate::COLUMNS
          ),
          rusqlite::params![
            row.update_id,
            row.issue_id,
            row.title,
            row.description,
            row.updated_by,
            row.posted_at,
            row.is_public,
          ],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !inserted {
      return Err(uwazi_core::Error::IssueNotFound(id).into());
    }
    tracing::info!(%id, by = %actor.user_id, is_public, "progress update posted");
    self.emit(IssueEvent::UpdatePosted {
      issue_id: id,
      is_public,
    });
    Ok(update)
  }

  // ── Change notification ───────────────────────────────────────────────────

  fn subscribe(&self) -> broadcast::Receiver<IssueEvent> { self.events.subscribe() }
}
