//! # cl-api Handlers
//!
//! This module coordinates the flow between HTTP requests and the core services.
//! Extractor rejections are taken as `Result` so that every failure, including
//! malformed JSON, leaves through [`ApiError`].

use crate::error::ApiError;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use cl_core::models::{PendingSubmission, RatingSummary, RecipeDraft, SubmissionStatus, UserProfile};
use cl_core::services::{BreadCard, ComposedBreadView, Registration, Services};
use cl_core::{AppError, CatalogFilter};
use serde::Deserialize;
use serde_json::{json, Number, Value};
use std::sync::Arc;
use uuid::Uuid;

/// State shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<Services>,
}

impl AppState {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRecipe {
    pub bread_id: String,
    pub recipe: RecipeDraft,
    pub submitter_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub reviewer_id: Uuid,
    /// Read by reject only.
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateRequest {
    pub user_id: Uuid,
    /// Raw number so that 4.5 is a validation failure rather than a decode failure.
    pub value: Number,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubmissionQuery {
    /// `pending` (default), `approved`, `rejected` or `all`.
    pub status: Option<String>,
    pub submitter: Option<Uuid>,
}

impl SubmissionQuery {
    fn status_filter(&self) -> Result<Option<SubmissionStatus>, AppError> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") => Ok(Some(SubmissionStatus::Pending)),
            Some("all") => Ok(None),
            Some(other) => other.parse().map(Some).map_err(AppError::Validation),
        }
    }
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "breads": state.services.catalog.len(),
    }))
}

/// Browse cards, optionally filtered by `category`, `difficulty` and `bestFor`.
pub async fn list_breads(
    State(state): State<AppState>,
    filter: Result<Query<CatalogFilter>, QueryRejection>,
) -> ApiResult<Json<Vec<BreadCard>>> {
    let Query(filter) = filter?;
    Ok(Json(state.services.composer.cards(&filter).await?))
}

/// Shelf of breads flagged as new.
pub async fn new_breads(State(state): State<AppState>) -> ApiResult<Json<Vec<BreadCard>>> {
    Ok(Json(state.services.composer.new_additions().await?))
}

/// Filter options for the browse page.
pub async fn catalog_meta(State(state): State<AppState>) -> Json<Value> {
    let catalog = &state.services.catalog;
    Json(json!({
        "categories": catalog.categories(),
        "bestFor": catalog.best_for_options(),
    }))
}

/// Bread of the day (UTC).
pub async fn featured_bread(State(state): State<AppState>) -> ApiResult<Json<ComposedBreadView>> {
    let today = Utc::now().date_naive();
    let view = state
        .services
        .composer
        .featured(today)
        .await?
        .ok_or_else(|| AppError::not_found("Bread", "featured"))?;
    Ok(Json(view))
}

pub async fn view_bread(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ComposedBreadView>> {
    Ok(Json(state.services.composer.view_for(&id).await?))
}

pub async fn rate_bread(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<RateRequest>, JsonRejection>,
) -> ApiResult<Json<RatingSummary>> {
    let Json(body) = payload?;
    let value = body
        .value
        .as_i64()
        .ok_or_else(|| AppError::validation("rating must be a whole number between 1 and 5"))?;
    state.services.ratings.rate(&id, body.user_id, value).await?;
    Ok(Json(state.services.ratings.summary_for(&id).await?))
}

pub async fn user_rating(
    State(state): State<AppState>,
    path: Result<Path<(String, Uuid)>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path((bread_id, user_id)) = path?;
    let value = state.services.ratings.user_rating_for(&bread_id, user_id).await?;
    Ok(Json(json!({ "value": value })))
}

pub async fn submit_recipe(
    State(state): State<AppState>,
    payload: Result<Json<SubmitRecipe>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<PendingSubmission>)> {
    let Json(body) = payload?;
    let submission = state
        .services
        .submissions
        .submit(&body.bread_id, body.recipe, body.submitter_id)
        .await?;
    Ok((StatusCode::CREATED, Json(submission)))
}

/// Oldest first. A `submitter` narrows to one user's submissions.
pub async fn list_submissions(
    State(state): State<AppState>,
    query: Result<Query<SubmissionQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<PendingSubmission>>> {
    let Query(query) = query?;
    let status = query.status_filter()?;
    let queue = &state.services.submissions;

    let items = match query.submitter {
        Some(user) => queue
            .list_for_submitter(user)
            .await?
            .into_iter()
            .filter(|s| status.map_or(true, |st| s.status == st))
            .collect(),
        None => queue.list(status).await?,
    };
    Ok(Json(items))
}

pub async fn get_submission(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<PendingSubmission>> {
    let Path(id) = path?;
    Ok(Json(state.services.submissions.get(id).await?))
}

pub async fn approve_submission(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ReviewRequest>, JsonRejection>,
) -> ApiResult<Json<PendingSubmission>> {
    let Path(id) = path?;
    let Json(body) = payload?;
    Ok(Json(state.services.submissions.approve(id, body.reviewer_id).await?))
}

pub async fn reject_submission(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ReviewRequest>, JsonRejection>,
) -> ApiResult<Json<PendingSubmission>> {
    let Path(id) = path?;
    let Json(body) = payload?;
    Ok(Json(
        state
            .services
            .submissions
            .reject(id, body.reviewer_id, body.reason)
            .await?,
    ))
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<Registration>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<UserProfile>)> {
    let Json(form) = payload?;
    let profile = state.services.identity.register(form).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// Credential check only; no session token is issued.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<UserProfile>> {
    let Json(body) = payload?;
    match state.services.identity.authenticate(&body.email, &body.password).await {
        Ok(profile) => Ok(Json(profile)),
        Err(AppError::Unauthorized(msg)) => Err(ApiError::BadCredentials(msg)),
        Err(other) => Err(other.into()),
    }
}

pub async fn get_user(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<UserProfile>> {
    let Path(id) = path?;
    Ok(Json(state.services.identity.profile(id).await?))
}

pub async fn add_favorite(
    State(state): State<AppState>,
    path: Result<Path<(Uuid, String)>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path((user_id, bread_id)) = path?;
    state.services.identity.favorite(user_id, &bread_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_favorite(
    State(state): State<AppState>,
    path: Result<Path<(Uuid, String)>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path((user_id, bread_id)) = path?;
    state.services.identity.unfavorite(user_id, &bread_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
