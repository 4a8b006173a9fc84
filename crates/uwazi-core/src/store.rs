//! The `IssueStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `uwazi-store-sqlite`).
//! Higher layers (`uwazi-api`, `uwazi-server`) depend on this abstraction, not
//! on any concrete backend.

use std::future::Future;

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{
  DomainError,
  event::IssueEvent,
  issue::{Issue, InternalNote, IssueUpdate, NewIssue, Status},
  user::Actor,
};

/// Abstraction over an Uwazi issue store backend.
///
/// Every write takes the [`Actor`] performing it. Staff-only operations fail
/// with [`crate::Error::Unauthorized`] before the target issue is looked up,
/// and leave the store untouched. Each successful write is atomic and is
/// followed by exactly one [`IssueEvent`] on the [`subscribe`] channel.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
///
/// [`subscribe`]: IssueStore::subscribe
pub trait IssueStore: Send + Sync {
  type Error: DomainError;

  // ── Submissions ───────────────────────────────────────────────────────

  /// Validate and persist a new issue submitted by `actor`.
  ///
  /// The store assigns the id and timestamps; the issue starts `Open` with
  /// no votes. Fails with [`crate::Error::Validation`] if a required field
  /// is blank.
  fn submit<'a>(
    &'a self,
    actor: &'a Actor,
    draft: NewIssue,
  ) -> impl Future<Output = Result<Issue, Self::Error>> + Send + 'a;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Retrieve an issue by id. Returns `None` if not found.
  fn get(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Issue>, Self::Error>> + Send + '_;

  /// Snapshot of every issue, most recent submission first.
  fn list(
    &self,
  ) -> impl Future<Output = Result<Vec<Issue>, Self::Error>> + Send + '_;

  // ── Engagement ────────────────────────────────────────────────────────

  /// Add one upvote. `last_updated` is not touched.
  fn upvote<'a>(
    &'a self,
    actor: &'a Actor,
    id: Uuid,
  ) -> impl Future<Output = Result<Issue, Self::Error>> + Send + 'a;

  /// Add one downvote. `last_updated` is not touched.
  fn downvote<'a>(
    &'a self,
    actor: &'a Actor,
    id: Uuid,
  ) -> impl Future<Output = Result<Issue, Self::Error>> + Send + 'a;

  // ── Staff workflow ────────────────────────────────────────────────────

  /// Move an issue to `status`. A non-blank `response` also attaches a
  /// public admin response from `actor`, replacing any existing one.
  fn set_status<'a>(
    &'a self,
    actor: &'a Actor,
    id: Uuid,
    status: Status,
    response: Option<String>,
  ) -> impl Future<Output = Result<Issue, Self::Error>> + Send + 'a;

  /// Attach (or replace) the admin response. The status is left unchanged.
  fn add_admin_response<'a>(
    &'a self,
    actor: &'a Actor,
    id: Uuid,
    message: String,
    is_public: bool,
  ) -> impl Future<Output = Result<Issue, Self::Error>> + Send + 'a;

  /// Append a staff-only note to an issue.
  fn add_internal_note<'a>(
    &'a self,
    actor: &'a Actor,
    id: Uuid,
    note: String,
  ) -> impl Future<Output = Result<InternalNote, Self::Error>> + Send + 'a;

  /// Post an entry to the issue's progress timeline. `title` and
  /// `description` must be non-blank; the status is left unchanged.
  fn add_update<'a>(
    &'a self,
    actor: &'a Actor,
    id: Uuid,
    title: String,
    description: String,
    is_public: bool,
  ) -> impl Future<Output = Result<IssueUpdate, Self::Error>> + Send + 'a;

  // ── Change notification ───────────────────────────────────────────────

  /// Subscribe to events for every mutation committed after this call.
  fn subscribe(&self) -> broadcast::Receiver<IssueEvent>;
}
