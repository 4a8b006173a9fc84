//! Integration tests for `SqliteStore` against an in-memory database.

use std::collections::HashSet;

use tokio::sync::broadcast::error::TryRecvError;
use uuid::Uuid;
use uwazi_core::{
  DomainError as _,
  classify::{Classification, Classifier, Offline},
  event::IssueEvent,
  filter::{self, Facet, IssueQuery},
  intake,
  issue::{Category, Coordinates, NewIssue, Severity, Status, VoteDirection},
  store::IssueStore,
  user::{Actor, Role},
};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn citizen() -> Actor { Actor::new("wanjiku", Role::Citizen) }

fn admin() -> Actor { Actor::new("admin", Role::Admin) }

fn moderator() -> Actor { Actor::new("mod", Role::Moderator) }

fn broken_pipe() -> NewIssue {
  NewIssue::new(
    "Broken pipe",
    "Water leaking for 3 days",
    "Kiambu",
    "Ruiru",
    "Kahawa West",
  )
}

fn core_error(err: &Error) -> &uwazi_core::Error {
  err.domain().expect("expected a domain error")
}

// ─── Submissions ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn submit_and_get() {
  let s = store().await;

  let mut draft = broken_pipe();
  draft.location = Some("  Kahawa West Shopping Center ".into());
  draft.coordinates = Some(Coordinates {
    lat: -1.1833,
    lng: 36.9167,
  });
  draft.tags.insert("water".into());

  let issue = s.submit(&citizen(), draft).await.unwrap();
  assert_eq!(issue.status, Status::Open);
  assert_eq!((issue.upvotes, issue.downvotes), (0, 0));
  assert_eq!(issue.date_submitted, issue.last_updated);
  assert_eq!(issue.location.as_deref(), Some("Kahawa West Shopping Center"));

  let fetched = s.get(issue.issue_id).await.unwrap().unwrap();
  assert_eq!(fetched, issue);
}

#[tokio::test]
async fn get_missing_returns_none() {
  let s = store().await;
  assert!(s.get(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn submit_rejects_blank_fields_and_commits_nothing() {
  let s = store().await;
  let mut events = s.subscribe();

  let mut draft = broken_pipe();
  draft.constituency = "  ".into();
  let err = s.submit(&citizen(), draft).await.unwrap_err();

  assert!(matches!(core_error(&err), uwazi_core::Error::Validation(_)));
  assert!(s.list().await.unwrap().is_empty());
  assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test]
async fn list_is_most_recent_first() {
  let s = store().await;
  let first = s.submit(&citizen(), broken_pipe()).await.unwrap();
  let second = s
    .submit(
      &citizen(),
      NewIssue::new("Pothole", "Deep pothole", "Nairobi", "Westlands", "Parklands"),
    )
    .await
    .unwrap();

  let ids: Vec<_> = s.list().await.unwrap().iter().map(|i| i.issue_id).collect();
  assert_eq!(ids, vec![second.issue_id, first.issue_id]);
}

#[tokio::test]
async fn submitted_ids_are_distinct() {
  let s = store().await;
  let mut ids = HashSet::new();
  for _ in 0..25 {
    ids.insert(s.submit(&citizen(), broken_pipe()).await.unwrap().issue_id);
  }
  assert_eq!(ids.len(), 25);

  let listed: HashSet<_> = s.list().await.unwrap().iter().map(|i| i.issue_id).collect();
  assert_eq!(listed, ids);
}

// ─── Votes ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upvote_increments_by_one_and_keeps_last_updated() {
  let s = store().await;
  let issue = s.submit(&citizen(), broken_pipe()).await.unwrap();

  let voted = s.upvote(&citizen(), issue.issue_id).await.unwrap();
  assert_eq!(voted.upvotes, issue.upvotes + 1);
  assert_eq!(voted.downvotes, issue.downvotes);
  assert_eq!(voted.last_updated, issue.last_updated);
}

#[tokio::test]
async fn downvote_increments_downvotes_only() {
  let s = store().await;
  let issue = s.submit(&citizen(), broken_pipe()).await.unwrap();

  s.downvote(&citizen(), issue.issue_id).await.unwrap();
  let voted = s.downvote(&admin(), issue.issue_id).await.unwrap();
  assert_eq!((voted.upvotes, voted.downvotes), (0, 2));
  assert_eq!(voted.vote_score(), -2);
}

#[tokio::test]
async fn votes_commute() {
  let s = store().await;
  let a = s.submit(&citizen(), broken_pipe()).await.unwrap().issue_id;
  let b = s.submit(&citizen(), broken_pipe()).await.unwrap().issue_id;

  s.upvote(&citizen(), a).await.unwrap();
  let a = s.downvote(&citizen(), a).await.unwrap();
  s.downvote(&citizen(), b).await.unwrap();
  let b = s.upvote(&citizen(), b).await.unwrap();

  assert_eq!((a.upvotes, a.downvotes), (1, 1));
  assert_eq!((b.upvotes, b.downvotes), (1, 1));
}

#[tokio::test]
async fn vote_on_missing_issue_is_not_found() {
  let s = store().await;
  let id = Uuid::new_v4();
  let err = s.upvote(&citizen(), id).await.unwrap_err();
  assert!(matches!(
    core_error(&err),
    uwazi_core::Error::IssueNotFound(missing) if *missing == id
  ));
}

// ─── Staff workflow ──────────────────────────────────────────────────────────

#[tokio::test]
async fn citizen_cannot_change_status() {
  let s = store().await;
  let issue = s.submit(&citizen(), broken_pipe()).await.unwrap();
  let mut events = s.subscribe();

  let err = s
    .set_status(&citizen(), issue.issue_id, Status::Resolved, Some("done".into()))
    .await
    .unwrap_err();
  assert!(matches!(core_error(&err), uwazi_core::Error::Unauthorized { .. }));

  let unchanged = s.get(issue.issue_id).await.unwrap().unwrap();
  assert_eq!(unchanged, issue);
  assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test]
async fn authorization_is_checked_before_existence() {
  let s = store().await;
  let err = s
    .set_status(&citizen(), Uuid::new_v4(), Status::Closed, None)
    .await
    .unwrap_err();
  assert!(matches!(core_error(&err), uwazi_core::Error::Unauthorized { .. }));
}

#[tokio::test]
async fn set_status_with_response_attaches_public_response() {
  let s = store().await;
  let issue = s.submit(&citizen(), broken_pipe()).await.unwrap();

  let updated = s
    .set_status(&admin(), issue.issue_id, Status::Resolved, Some("Fixed the pipe".into()))
    .await
    .unwrap();

  assert_eq!(updated.status, Status::Resolved);
  assert!(updated.last_updated >= issue.last_updated);
  let response = updated.admin_response.expect("response attached");
  assert_eq!(response.message, "Fixed the pipe");
  assert_eq!(response.responded_by, "admin");
  assert!(response.is_public);
}

#[tokio::test]
async fn set_status_with_blank_response_attaches_nothing() {
  let s = store().await;
  let issue = s.submit(&citizen(), broken_pipe()).await.unwrap();

  let updated = s
    .set_status(&moderator(), issue.issue_id, Status::Pending, Some("   ".into()))
    .await
    .unwrap();
  assert_eq!(updated.status, Status::Pending);
  assert!(updated.admin_response.is_none());
}

#[tokio::test]
async fn any_status_may_follow_any_other() {
  let s = store().await;
  let issue = s.submit(&citizen(), broken_pipe()).await.unwrap();

  for status in [Status::Closed, Status::Open, Status::Resolved, Status::Pending] {
    let updated = s
      .set_status(&admin(), issue.issue_id, status, None)
      .await
      .unwrap();
    assert_eq!(updated.status, status);
  }
}

#[tokio::test]
async fn set_status_on_missing_issue_is_not_found() {
  let s = store().await;
  let err = s
    .set_status(&admin(), Uuid::new_v4(), Status::Closed, None)
    .await
    .unwrap_err();
  assert!(matches!(core_error(&err), uwazi_core::Error::IssueNotFound(_)));
}

#[tokio::test]
async fn admin_response_replaces_previous_and_keeps_status() {
  let s = store().await;
  let issue = s.submit(&citizen(), broken_pipe()).await.unwrap();

  s.add_admin_response(&admin(), issue.issue_id, "Team dispatched".into(), true)
    .await
    .unwrap();
  let updated = s
    .add_admin_response(&moderator(), issue.issue_id, "Awaiting parts".into(), false)
    .await
    .unwrap();

  assert_eq!(updated.status, Status::Open);
  let response = updated.admin_response.unwrap();
  assert_eq!(response.message, "Awaiting parts");
  assert_eq!(response.responded_by, "mod");
  assert!(!response.is_public);
}

#[tokio::test]
async fn blank_admin_response_is_rejected() {
  let s = store().await;
  let issue = s.submit(&citizen(), broken_pipe()).await.unwrap();

  let err = s
    .add_admin_response(&admin(), issue.issue_id, " \n".into(), true)
    .await
    .unwrap_err();
  assert!(matches!(core_error(&err), uwazi_core::Error::Validation(_)));
  assert!(s.get(issue.issue_id).await.unwrap().unwrap().admin_response.is_none());
}

#[tokio::test]
async fn internal_notes_are_staff_only_and_newest_first() {
  let s = store().await;
  let issue = s.submit(&citizen(), broken_pipe()).await.unwrap();

  let err = s
    .add_internal_note(&citizen(), issue.issue_id, "sneaky".into())
    .await
    .unwrap_err();
  assert!(matches!(core_error(&err), uwazi_core::Error::Unauthorized { .. }));

  let first = s
    .add_internal_note(&admin(), issue.issue_id, "Called the water company".into())
    .await
    .unwrap();
  let second = s
    .add_internal_note(&moderator(), issue.issue_id, "Contractor on site".into())
    .await
    .unwrap();

  let fetched = s.get(issue.issue_id).await.unwrap().unwrap();
  let ids: Vec<_> = fetched.internal_notes.iter().map(|n| n.note_id).collect();
  assert_eq!(ids, vec![second.note_id, first.note_id]);
  assert!(fetched.last_updated >= issue.last_updated);

  let listed = s.list().await.unwrap();
  assert_eq!(listed[0].internal_notes.len(), 2);
}

#[tokio::test]
async fn note_on_missing_issue_is_not_found() {
  let s = store().await;
  let err = s
    .add_internal_note(&admin(), Uuid::new_v4(), "lost".into())
    .await
    .unwrap_err();
  assert!(matches!(core_error(&err), uwazi_core::Error::IssueNotFound(_)));
}

// ─── Progress updates ────────────────────────────────────────────────────────

#[tokio::test]
async fn updates_are_staff_only_and_newest_first() {
  let s = store().await;
  let issue = s.submit(&citizen(), broken_pipe()).await.unwrap();
  let mut events = s.subscribe();

  let err = s
    .add_update(&citizen(), issue.issue_id, "Fixed".into(), "Trust me".into(), true)
    .await
    .unwrap_err();
  assert!(matches!(core_error(&err), uwazi_core::Error::Unauthorized { .. }));
  assert_eq!(events.try_recv(), Err(TryRecvError::Empty));

  let first = s
    .add_update(
      &admin(),
      issue.issue_id,
      "Crew dispatched".into(),
      "Water company notified".into(),
      true,
    )
    .await
    .unwrap();
  let second = s
    .add_update(
      &moderator(),
      issue.issue_id,
      " Budget query ".into(),
      "Awaiting treasury".into(),
      false,
    )
    .await
    .unwrap();
  assert_eq!(second.title, "Budget query");
  assert_eq!(second.updated_by, "mod");

  let fetched = s.get(issue.issue_id).await.unwrap().unwrap();
  let ids: Vec<_> = fetched.updates.iter().map(|u| u.update_id).collect();
  assert_eq!(ids, vec![second.update_id, first.update_id]);
  assert_eq!(fetched.status, Status::Open);
  assert!(fetched.last_updated >= issue.last_updated);
  assert_eq!(s.list().await.unwrap()[0].updates, fetched.updates);

  let public = fetched.redacted_for(Some(&citizen()));
  assert_eq!(public.updates, vec![first]);

  assert_eq!(events.try_recv().unwrap(), IssueEvent::UpdatePosted {
    issue_id:  issue.issue_id,
    is_public: true,
  });
}

#[tokio::test]
async fn blank_update_is_rejected() {
  let s = store().await;
  let issue = s.submit(&citizen(), broken_pipe()).await.unwrap();
  let err = s
    .add_update(&admin(), issue.issue_id, "Progress".into(), "   ".into(), true)
    .await
    .unwrap_err();
  assert!(matches!(core_error(&err), uwazi_core::Error::Validation(_)));
  assert!(s.get(issue.issue_id).await.unwrap().unwrap().updates.is_empty());
}

#[tokio::test]
async fn update_on_missing_issue_is_not_found() {
  let s = store().await;
  let err = s
    .add_update(&admin(), Uuid::new_v4(), "t".into(), "d".into(), true)
    .await
    .unwrap_err();
  assert!(matches!(core_error(&err), uwazi_core::Error::IssueNotFound(_)));
}

// ─── Events ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn every_mutation_emits_one_event() {
  let s = store().await;
  let mut events = s.subscribe();

  let issue = s.submit(&citizen(), broken_pipe()).await.unwrap();
  let id = issue.issue_id;
  s.upvote(&citizen(), id).await.unwrap();
  s.set_status(&admin(), id, Status::Pending, Some("On it".into()))
    .await
    .unwrap();
  s.add_admin_response(&admin(), id, "Crew booked".into(), true)
    .await
    .unwrap();
  s.add_internal_note(&admin(), id, "Budget approved".into())
    .await
    .unwrap();
  s.add_update(&admin(), id, "Works started".into(), "Crew on site".into(), false)
    .await
    .unwrap();

  let expected = [
    IssueEvent::Submitted { issue_id: id },
    IssueEvent::Voted {
      issue_id:  id,
      direction: VoteDirection::Up,
    },
    IssueEvent::StatusChanged {
      issue_id: id,
      from:     Status::Open,
      to:       Status::Pending,
    },
    IssueEvent::Responded { issue_id: id },
    IssueEvent::NoteAdded { issue_id: id },
    IssueEvent::UpdatePosted {
      issue_id:  id,
      is_public: false,
    },
  ];
  for event in expected {
    assert_eq!(events.try_recv().unwrap(), event);
  }
  assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
}

// ─── End to end ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn report_vote_and_resolve() {
  let s = store().await;
  let issue = s.submit(&citizen(), broken_pipe()).await.unwrap();

  for _ in 0..3 {
    s.upvote(&citizen(), issue.issue_id).await.unwrap();
  }
  s.set_status(&admin(), issue.issue_id, Status::Resolved, Some("Fixed the pipe".into()))
    .await
    .unwrap();

  let resolved = s.get(issue.issue_id).await.unwrap().unwrap();
  assert_eq!(resolved.status, Status::Resolved);
  assert_eq!(resolved.upvotes, 3);
  assert_eq!(resolved.vote_score(), 3);
  assert_eq!(
    resolved.admin_response.map(|r| r.message).as_deref(),
    Some("Fixed the pipe")
  );

  let query = IssueQuery {
    status: Facet::Only(Status::Resolved),
    county: Facet::Only("Kiambu".into()),
    ..IssueQuery::default()
  };
  let matches = filter::apply(&s.list().await.unwrap(), &query);
  assert_eq!(matches.len(), 1);
  assert_eq!(matches[0].issue_id, issue.issue_id);
}

// ─── Intake ──────────────────────────────────────────────────────────────────

struct Fixed(Classification);

impl Classifier for Fixed {
  type Error = uwazi_core::Error;

  async fn classify(&self, _: &str, _: &str) -> Result<Classification, Self::Error> {
    Ok(self.0)
  }
}

#[tokio::test]
async fn intake_uses_classifier_labels() {
  let s = store().await;
  let classifier = Fixed(Classification {
    category: Category::Water,
    severity: Some(Severity::High),
  });

  let issue = intake::submit_classified(&s, &classifier, &citizen(), broken_pipe())
    .await
    .unwrap();
  assert_eq!((issue.category, issue.severity), (Category::Water, Severity::High));
}

#[tokio::test]
async fn intake_falls_back_when_classifier_is_offline() {
  let s = store().await;
  let draft = NewIssue::new(
    "Bridge",
    "There was a critical accident, someone is dead",
    "Nairobi",
    "Langata",
    "Karen",
  );

  let issue = intake::submit_classified(&s, &Offline, &citizen(), draft)
    .await
    .unwrap();
  assert_eq!(issue.category, Category::Roads);
  assert_eq!(issue.severity, Severity::Critical);
}

#[tokio::test]
async fn intake_rejects_invalid_draft() {
  let s = store().await;
  let mut draft = broken_pipe();
  draft.title.clear();

  let err = intake::submit_classified(&s, &Offline, &citizen(), draft)
    .await
    .unwrap_err();
  assert!(matches!(core_error(&err), uwazi_core::Error::Validation(_)));
  assert!(s.list().await.unwrap().is_empty());
}

// ─── Persistence ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn state_survives_reopening_the_file() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("uwazi.db");

  let id = {
    let s = SqliteStore::open(&path).await.unwrap();
    let issue = s.submit(&citizen(), broken_pipe()).await.unwrap();
    s.upvote(&citizen(), issue.issue_id).await.unwrap();
    s.add_internal_note(&admin(), issue.issue_id, "Logged with utility".into())
      .await
      .unwrap();
    s.add_update(&admin(), issue.issue_id, "Logged".into(), "Ticket 42".into(), true)
      .await
      .unwrap();
    issue.issue_id
  };

  let reopened = SqliteStore::open(&path).await.unwrap();
  let issue = reopened.get(id).await.unwrap().unwrap();
  assert_eq!(issue.upvotes, 1);
  assert_eq!(issue.internal_notes.len(), 1);
  assert_eq!(issue.updates[0].title, "Logged");
}
