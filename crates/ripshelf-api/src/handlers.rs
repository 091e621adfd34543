use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use ripshelf_domain::{
    active_mode_enabled, ContentType, Identification, Job, JobId, JobStatus, NewWantedItem,
    ACTIVE_MODE_KEY, YEAR_MAX, YEAR_MIN,
};
use ripshelf_pipeline::{consistency_check, fix_stuck_encoding_jobs};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::error::ApiError;
use crate::state::AppState;

// ── Helpers ───────────────────────────────────────────────────────────────────

fn job_response(job: &Job) -> Json<Value> {
    Json(json!({ "success": true, "job_id": job.id, "status": job.status }))
}

async fn fetch_job(state: &AppState, id: i64) -> Result<Job, ApiError> {
    state
        .store
        .get_job(JobId::new(id))
        .await?
        .ok_or_else(|| ApiError::not_found(format!("job {} not found", id)))
}

fn require_status(job: &Job, wanted: JobStatus) -> Result<(), ApiError> {
    if job.status != wanted {
        return Err(ApiError::bad_request(format!(
            "job {} is {}, expected {}",
            job.id, job.status, wanted
        )));
    }
    Ok(())
}

fn validate_year(year: Option<i32>) -> Result<(), ApiError> {
    if let Some(year) = year {
        if !(YEAR_MIN..=YEAR_MAX).contains(&year) {
            return Err(ApiError::bad_request(format!(
                "year {} outside {}..={}",
                year, YEAR_MIN, YEAR_MAX
            )));
        }
    }
    Ok(())
}

/// Best-effort catalog lookup backing manual identification: the first
/// match supplies the poster and catalog id, and nothing fails without it.
async fn poster_lookup(
    state: &AppState,
    title: &str,
    year: Option<i32>,
) -> (Option<i64>, Option<String>) {
    let Some(catalog) = &state.catalog else {
        return (None, None);
    };
    match catalog.search_movie(title, year).await {
        Ok(candidates) => match candidates.into_iter().next() {
            Some(c) => (Some(c.catalog_id), c.poster_ref),
            None => (None, None),
        },
        Err(e) => {
            warn!(title, error = %e, "poster lookup failed");
            (None, None)
        }
    }
}

// ── Health ────────────────────────────────────────────────────────────────────

pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ── Jobs ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct JobsQuery {
    pub limit: Option<usize>,
    pub include_archived: Option<bool>,
}

pub async fn list_jobs(
    State(state): State<AppState>,
    Query(q): Query<JobsQuery>,
) -> Result<Json<Value>, ApiError> {
    let jobs = state
        .store
        .recent_jobs(q.limit.unwrap_or(50), q.include_archived.unwrap_or(false))
        .await?;
    Ok(Json(json!(jobs)))
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let job = fetch_job(&state, id).await?;
    Ok(Json(json!(job)))
}

// ── Review actions ────────────────────────────────────────────────────────────

pub async fn approve(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let job = fetch_job(&state, id).await?;
    require_status(&job, JobStatus::Review)?;
    let job = state
        .store
        .update_job_status(job.id, JobStatus::Moving, None)
        .await?;
    Ok(job_response(&job))
}

#[derive(Debug, Deserialize)]
pub struct IdentifyBody {
    pub title: String,
    pub year: Option<i32>,
}

pub async fn identify(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<IdentifyBody>,
) -> Result<Json<Value>, ApiError> {
    let job = fetch_job(&state, id).await?;
    require_status(&job, JobStatus::Review)?;
    validate_year(body.year)?;

    let (catalog_id, poster_ref) = poster_lookup(&state, &body.title, body.year).await;
    let ident = Identification::human(
        ContentType::Movie,
        body.title,
        body.year,
        catalog_id,
        poster_ref,
    );
    state.store.update_job_identification(job.id, &ident).await?;
    let job = state
        .store
        .update_job_status(job.id, JobStatus::Moving, None)
        .await?;
    Ok(job_response(&job))
}

pub async fn skip(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let job = fetch_job(&state, id).await?;
    require_status(&job, JobStatus::Review)?;
    let job = state
        .store
        .update_job_status(job.id, JobStatus::Failed, Some("skipped by user"))
        .await?;
    Ok(job_response(&job))
}

// ── Pre-identification ────────────────────────────────────────────────────────

/// Statuses during which a human may identify a disc ahead of the
/// identifier. Review has its own path; terminal jobs are settled.
const PRE_IDENTIFY_STATUSES: &[JobStatus] = &[
    JobStatus::Pending,
    JobStatus::Ripping,
    JobStatus::Ripped,
    JobStatus::Encoding,
    JobStatus::Encoded,
    JobStatus::Identifying,
];

pub async fn pre_identify(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<IdentifyBody>,
) -> Result<Json<Value>, ApiError> {
    let job = fetch_job(&state, id).await?;
    if !PRE_IDENTIFY_STATUSES.contains(&job.status) {
        return Err(ApiError::bad_request(format!(
            "job {} is {}, too late to pre-identify",
            job.id, job.status
        )));
    }
    validate_year(body.year)?;

    let (catalog_id, poster_ref) = poster_lookup(&state, &body.title, body.year).await;
    let ident = Identification::human(
        ContentType::Movie,
        body.title,
        body.year,
        catalog_id,
        poster_ref,
    );
    let job = state.store.update_job_identification(job.id, &ident).await?;
    Ok(job_response(&job))
}

// ── Archive ───────────────────────────────────────────────────────────────────

pub async fn archive(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let job = fetch_job(&state, id).await?;
    if !matches!(job.status, JobStatus::Complete | JobStatus::Failed) {
        return Err(ApiError::bad_request(format!(
            "job {} is {}, only complete or failed jobs archive",
            job.id, job.status
        )));
    }
    let job = state
        .store
        .update_job_status(job.id, JobStatus::Archived, None)
        .await?;
    Ok(job_response(&job))
}

// ── Oversight ─────────────────────────────────────────────────────────────────

pub async fn oversight_check(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let issues = consistency_check(&state.store, Utc::now()).await?;
    let descriptions: Vec<String> = issues.iter().map(|i| i.to_string()).collect();
    Ok(Json(json!({ "issues": issues, "descriptions": descriptions })))
}

pub async fn oversight_fix_encoding(
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    let repaired = fix_stuck_encoding_jobs(&state.store).await?;
    Ok(Json(json!({ "success": true, "repaired": repaired })))
}

// ── Active mode ───────────────────────────────────────────────────────────────

async fn read_active_mode(state: &AppState) -> Result<bool, ApiError> {
    let value = state.store.get_setting(ACTIVE_MODE_KEY).await?;
    Ok(active_mode_enabled(value.as_deref()))
}

pub async fn get_active_mode(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let active = read_active_mode(&state).await?;
    Ok(Json(json!({ "active": active })))
}

#[derive(Debug, Deserialize)]
pub struct ActiveModeBody {
    pub active: bool,
}

pub async fn set_active_mode(
    State(state): State<AppState>,
    Json(body): Json<ActiveModeBody>,
) -> Result<Json<Value>, ApiError> {
    state
        .store
        .set_setting(ACTIVE_MODE_KEY, if body.active { "true" } else { "false" })
        .await?;
    Ok(Json(json!({ "success": true, "active": body.active })))
}

pub async fn toggle_active_mode(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let flipped = !read_active_mode(&state).await?;
    state
        .store
        .set_setting(ACTIVE_MODE_KEY, if flipped { "true" } else { "false" })
        .await?;
    Ok(Json(json!({ "success": true, "active": flipped })))
}

// ── Wanted list ───────────────────────────────────────────────────────────────

pub async fn list_wanted(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let wanted = state.store.get_wanted().await?;
    Ok(Json(json!(wanted)))
}

pub async fn add_wanted(
    State(state): State<AppState>,
    Json(body): Json<NewWantedItem>,
) -> Result<Json<Value>, ApiError> {
    if body.title.trim().is_empty() {
        return Err(ApiError::bad_request("title must not be empty"));
    }
    validate_year(body.year)?;
    let item = state.store.add_to_wanted(&body).await?;
    Ok(Json(json!({ "success": true, "id": item.id })))
}

pub async fn remove_wanted(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    state.store.remove_from_wanted(id).await?;
    Ok(Json(json!({ "success": true })))
}

// ── Collection ────────────────────────────────────────────────────────────────

pub async fn list_collection(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let collection = state.store.get_collection().await?;
    Ok(Json(json!(collection)))
}

pub async fn remove_collection(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    state.store.remove_from_collection(id).await?;
    Ok(Json(json!({ "success": true })))
}

// ── Status ────────────────────────────────────────────────────────────────────

pub async fn status(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let counts = state.store.counts_by_status().await?;
    let by_status: serde_json::Map<String, Value> = counts
        .into_iter()
        .map(|(status, count)| (status.to_string(), json!(count)))
        .collect();
    let active = read_active_mode(&state).await?;
    Ok(Json(json!({ "jobs": by_status, "active_mode": active })))
}
