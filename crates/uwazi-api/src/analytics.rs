//! Handlers for `/analytics` endpoints. All are public and recomputed from
//! the current snapshot on every request.

use std::sync::Arc;

use axum::{Json, extract::State};
use chrono::Utc;
use serde::Deserialize;
use uwazi_core::{
  analytics::{self, ActivityEntry, CategoryStats, CountyStats, DailyTrend, Summary},
  filter::{self, Facet, IssueQuery},
  issue::Category,
  store::IssueStore,
};

use crate::{
  error::ApiError,
  extract::{ApiQuery, Viewer},
  issues::visible,
};

const DEFAULT_TREND_DAYS: u32 = 30;
const MAX_TREND_DAYS: u32 = 366;
const DEFAULT_RECENT_LIMIT: usize = 10;
const MAX_RECENT_LIMIT: usize = 100;

/// `GET /analytics/summary`: accepts the same filters as `GET /issues`.
pub async fn summary<S: IssueStore>(
  State(store): State<Arc<S>>,
  viewer: Viewer,
  ApiQuery(query): ApiQuery<IssueQuery>,
) -> Result<Json<Summary>, ApiError> {
  let issues = store.list().await.map_err(ApiError::from_store)?;
  Ok(Json(analytics::summarize(&visible(issues, viewer.actor(), &query))))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CountyParams {
  /// Case-insensitive substring of the county name.
  pub county: Option<String>,
}

/// `GET /analytics/counties[?county=...]`
pub async fn counties<S: IssueStore>(
  State(store): State<Arc<S>>,
  ApiQuery(params): ApiQuery<CountyParams>,
) -> Result<Json<Vec<CountyStats>>, ApiError> {
  let mut issues = store.list().await.map_err(ApiError::from_store)?;
  if let Some(county) = params.county.as_deref() {
    issues.retain(|i| filter::contains_ignore_case(&i.county, county));
  }
  Ok(Json(analytics::county_stats(&issues)))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CategoryParams {
  pub category: Facet<Category>,
}

/// `GET /analytics/categories[?category=...]`
pub async fn categories<S: IssueStore>(
  State(store): State<Arc<S>>,
  ApiQuery(params): ApiQuery<CategoryParams>,
) -> Result<Json<Vec<CategoryStats>>, ApiError> {
  let mut issues = store.list().await.map_err(ApiError::from_store)?;
  issues.retain(|i| params.category.matches(&i.category));
  Ok(Json(analytics::category_stats(&issues)))
}

#[derive(Debug, Deserialize)]
pub struct TrendParams {
  pub days: Option<u32>,
}

/// `GET /analytics/trends[?days=30]`: one entry per day, ending today (UTC).
pub async fn trends<S: IssueStore>(
  State(store): State<Arc<S>>,
  ApiQuery(params): ApiQuery<TrendParams>,
) -> Result<Json<Vec<DailyTrend>>, ApiError> {
  let days = params.days.unwrap_or(DEFAULT_TREND_DAYS).min(MAX_TREND_DAYS);
  let issues = store.list().await.map_err(ApiError::from_store)?;
  let today = Utc::now().date_naive();
  Ok(Json(analytics::daily_trends(&issues, today, days)))
}

#[derive(Debug, Deserialize)]
pub struct RecentParams {
  pub limit: Option<usize>,
}

/// `GET /analytics/recent[?limit=10]`
pub async fn recent<S: IssueStore>(
  State(store): State<Arc<S>>,
  ApiQuery(params): ApiQuery<RecentParams>,
) -> Result<Json<Vec<ActivityEntry>>, ApiError> {
  let limit = params
    .limit
    .unwrap_or(DEFAULT_RECENT_LIMIT)
    .min(MAX_RECENT_LIMIT);
  let issues = store.list().await.map_err(ApiError::from_store)?;
  Ok(Json(analytics::recent_activity(&issues, limit)))
}
