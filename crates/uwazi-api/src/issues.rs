//! Handlers for `/issues` and `/me/issues`.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `GET`   | `/issues` | Query: [`IssueQuery`] fields, plus `ordering` |
//! | `POST`  | `/issues` | Body: [`NewIssueBody`]; classified, returns 201 |
//! | `GET`   | `/issues/{id}` | Single issue |
//! | `POST`  | `/issues/{id}/upvote` | Any signed-in user |
//! | `POST`  | `/issues/{id}/downvote` | Any signed-in user |
//! | `PATCH` | `/issues/{id}/status` | Staff. Body: `{"status": "...", "response": "..."}` |
//! | `POST`  | `/issues/{id}/response` | Staff. Body: `{"message": "...", "is_public": true}` |
//! | `POST`  | `/issues/{id}/notes` | Staff. Body: `{"note": "..."}`; returns 201 |
//! | `POST`  | `/issues/{id}/updates` | Staff. Body: `{"title": "...", "description": "...", "is_public": true}`; returns 201 |
//! | `GET`   | `/me/issues` | The caller's own submissions |
//!
//! Every issue in a response is redacted for the caller.

use std::{collections::BTreeSet, sync::Arc};

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use uuid::Uuid;
use uwazi_core::{
  classify::Classifier,
  filter::{self, IssueOrder, IssueQuery},
  intake,
  issue::{Coordinates, InternalNote, Issue, IssueUpdate, NewIssue, Status},
  store::IssueStore,
  user::Actor,
};

use crate::{
  ApiState,
  error::ApiError,
  extract::{ApiJson, ApiPath, ApiQuery, RequireActor, Viewer},
};

/// Redact `issues` for `viewer`, then apply `query`.
///
/// Redacting first means `submitted_by` can only match submitters the viewer
/// is allowed to see.
pub(crate) fn visible(issues: Vec<Issue>, viewer: Option<&Actor>, query: &IssueQuery) -> Vec<Issue> {
  let redacted: Vec<Issue> = issues.into_iter().map(|i| i.redacted_for(viewer)).collect();
  filter::apply(&redacted, query)
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `?ordering=-upvotes`. Without it, listings stay newest submission first.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OrderParams {
  pub ordering: Option<IssueOrder>,
}

impl OrderParams {
  fn apply(&self, issues: &mut [Issue]) {
    if let Some(order) = self.ordering {
      filter::sort(issues, order);
    }
  }
}

/// `GET /issues[?search=...][&status=...][&county=...][&ward=...][&ordering=...]`
pub async fn list<S: IssueStore>(
  State(store): State<Arc<S>>,
  viewer: Viewer,
  ApiQuery(query): ApiQuery<IssueQuery>,
  ApiQuery(order): ApiQuery<OrderParams>,
) -> Result<Json<Vec<Issue>>, ApiError> {
  let issues = store.list().await.map_err(ApiError::from_store)?;
  let mut issues = visible(issues, viewer.actor(), &query);
  order.apply(&mut issues);
  Ok(Json(issues))
}

/// `GET /me/issues`: the caller's own submissions, anonymous ones included.
pub async fn mine<S: IssueStore>(
  State(store): State<Arc<S>>,
  RequireActor(actor): RequireActor,
  ApiQuery(mut query): ApiQuery<IssueQuery>,
  ApiQuery(order): ApiQuery<OrderParams>,
) -> Result<Json<Vec<Issue>>, ApiError> {
  query.submitted_by = Some(actor.user_id.clone());
  let issues = store.list().await.map_err(ApiError::from_store)?;
  let mut issues = visible(issues, Some(&actor), &query);
  order.apply(&mut issues);
  Ok(Json(issues))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /issues/{id}`
pub async fn get_one<S: IssueStore>(
  State(store): State<Arc<S>>,
  viewer: Viewer,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Issue>, ApiError> {
  let issue = store
    .get(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("issue {id} not found")))?;
  Ok(Json(issue.redacted_for(viewer.actor())))
}

// ─── Submit ───────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /issues`.
///
/// Category and severity are not accepted from the client; they are decided
/// by the classifier. Missing text fields are reported as validation errors.
#[derive(Debug, Deserialize)]
pub struct NewIssueBody {
  #[serde(default)]
  pub title:        String,
  #[serde(default)]
  pub description:  String,
  #[serde(default)]
  pub county:       String,
  #[serde(default)]
  pub constituency: String,
  #[serde(default)]
  pub ward:         String,
  pub location:     Option<String>,
  pub coordinates:  Option<Coordinates>,
  #[serde(default)]
  pub anonymous:    bool,
  #[serde(default)]
  pub tags:         BTreeSet<String>,
}

impl From<NewIssueBody> for NewIssue {
  fn from(b: NewIssueBody) -> Self {
    let mut draft = NewIssue::new(b.title, b.description, b.county, b.constituency, b.ward);
    draft.location = b.location;
    draft.coordinates = b.coordinates;
    draft.anonymous = b.anonymous;
    draft.tags = b.tags;
    draft
  }
}

/// `POST /issues`: returns 201 + the stored issue.
pub async fn create<S, C>(
  State(state): State<ApiState<S, C>>,
  RequireActor(actor): RequireActor,
  ApiJson(body): ApiJson<NewIssueBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: IssueStore,
  C: Classifier,
{
  let issue = intake::submit_classified(&*state.store, &*state.classifier, &actor, body.into())
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(issue.redacted_for(Some(&actor)))))
}

// ─── Votes ────────────────────────────────────────────────────────────────────

/// `POST /issues/{id}/upvote`
pub async fn upvote<S: IssueStore>(
  State(store): State<Arc<S>>,
  RequireActor(actor): RequireActor,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Issue>, ApiError> {
  let issue = store.upvote(&actor, id).await.map_err(ApiError::from_store)?;
  Ok(Json(issue.redacted_for(Some(&actor))))
}

/// `POST /issues/{id}/downvote`
pub async fn downvote<S: IssueStore>(
  State(store): State<Arc<S>>,
  RequireActor(actor): RequireActor,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Issue>, ApiError> {
  let issue = store.downvote(&actor, id).await.map_err(ApiError::from_store)?;
  Ok(Json(issue.redacted_for(Some(&actor))))
}

// ─── Staff workflow ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status:   Status,
  /// Optional public reply attached alongside the status change.
  pub response: Option<String>,
}

/// `PATCH /issues/{id}/status`
pub async fn set_status<S: IssueStore>(
  State(store): State<Arc<S>>,
  RequireActor(actor): RequireActor,
  ApiPath(id): ApiPath<Uuid>,
  ApiJson(body): ApiJson<StatusBody>,
) -> Result<Json<Issue>, ApiError> {
  let issue = store
    .set_status(&actor, id, body.status, body.response)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(issue))
}

fn public_by_default() -> bool { true }

#[derive(Debug, Deserialize)]
pub struct ResponseBody {
  #[serde(default)]
  pub message:   String,
  #[serde(default = "public_by_default")]
  pub is_public: bool,
}

/// `POST /issues/{id}/response`
pub async fn respond<S: IssueStore>(
  State(store): State<Arc<S>>,
  RequireActor(actor): RequireActor,
  ApiPath(id): ApiPath<Uuid>,
  ApiJson(body): ApiJson<ResponseBody>,
) -> Result<Json<Issue>, ApiError> {
  let issue = store
    .add_admin_response(&actor, id, body.message, body.is_public)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(issue))
}

#[derive(Debug, Deserialize)]
pub struct NoteBody {
  #[serde(default)]
  pub note: String,
}

/// `POST /issues/{id}/notes`: returns 201 + the stored note.
pub async fn add_note<S: IssueStore>(
  State(store): State<Arc<S>>,
  RequireActor(actor): RequireActor,
  ApiPath(id): ApiPath<Uuid>,
  ApiJson(body): ApiJson<NoteBody>,
) -> Result<(StatusCode, Json<InternalNote>), ApiError> {
  let note = store
    .add_internal_note(&actor, id, body.note)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(note)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
  #[serde(default)]
  pub title:       String,
  #[serde(default)]
  pub description: String,
  #[serde(default = "public_by_default")]
  pub is_public:   bool,
}

/// `POST /issues/{id}/updates`: returns 201 + the stored timeline entry.
pub async fn add_update<S: IssueStore>(
  State(store): State<Arc<S>>,
  RequireActor(actor): RequireActor,
  ApiPath(id): ApiPath<Uuid>,
  ApiJson(body): ApiJson<UpdateBody>,
) -> Result<(StatusCode, Json<IssueUpdate>), ApiError> {
  let update = store
    .add_update(&actor, id, body.title, body.description, body.is_public)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(update)))
}
