use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::sessions::CurrentUser;
use crate::errors::AppError;
use crate::jobs::lifecycle;
use crate::models::{JobFields, JobPosting, Role};
use crate::state::AppState;

const JOBS_PER_PAGE: i64 = 10;

#[derive(Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: i64,
}

fn default_page() -> i64 {
    1
}

/// GET /jobs
/// Public paginated listing of published+active postings, newest first.
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    Query(params): Query<PageQuery>,
) -> Result<Json<Value>, AppError> {
    let page = params.page.max(1);
    let (jobs, total) = state
        .store
        .list_active_jobs((page - 1) * JOBS_PER_PAGE, JOBS_PER_PAGE)
        .await?;
    let total_pages = (total + JOBS_PER_PAGE - 1) / JOBS_PER_PAGE;
    Ok(Json(json!({
        "jobs": jobs,
        "page": page,
        "per_page": JOBS_PER_PAGE,
        "total": total,
        "total_pages": total_pages,
    })))
}

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// GET /search?q=keyword
pub async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Value>, AppError> {
    let jobs = lifecycle::search(state.store.as_ref(), &params.q).await?;
    Ok(Json(json!({
        "query": params.q,
        "count": jobs.len(),
        "jobs": jobs,
    })))
}

#[derive(Deserialize)]
pub struct PostJobRequest {
    #[serde(flatten)]
    pub fields: JobFields,
    /// False saves the posting as a draft.
    #[serde(default)]
    pub is_active: bool,
}

/// POST /post_job
pub async fn handle_post_job(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<PostJobRequest>,
) -> Result<Json<JobPosting>, AppError> {
    user.require_role(Role::Employer)?;
    let actor = user.account(&state).await?;
    let job = lifecycle::create(state.store.as_ref(), &actor, req.fields, req.is_active).await?;
    Ok(Json(job))
}

/// POST /edit_job/:id
pub async fn handle_edit_job(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(job_id): Path<Uuid>,
    Json(req): Json<PostJobRequest>,
) -> Result<Json<JobPosting>, AppError> {
    let actor = user.account(&state).await?;
    let job = lifecycle::edit(
        state.store.as_ref(),
        &actor,
        job_id,
        req.fields,
        req.is_active,
    )
    .await?;
    Ok(Json(job))
}

/// POST /publish_job/:id
pub async fn handle_publish_job(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobPosting>, AppError> {
    let actor = user.account(&state).await?;
    let job = lifecycle::publish(state.store.as_ref(), &actor, job_id).await?;
    Ok(Json(job))
}

/// POST /delete_job/:id
pub async fn handle_delete_job(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(job_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let actor = user.account(&state).await?;
    lifecycle::delete(state.store.as_ref(), &actor, job_id).await?;
    Ok(Json(json!({ "status": "deleted" })))
}

/// POST /admin/jobs/:id/toggle_active
pub async fn handle_toggle_job_active(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobPosting>, AppError> {
    let actor = user
        .require_admin_permission(&state, |p| p.manage_jobs)
        .await?;
    let job = lifecycle::toggle_active(state.store.as_ref(), &actor, job_id).await?;
    Ok(Json(job))
}
