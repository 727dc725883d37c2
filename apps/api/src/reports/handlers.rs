use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::sessions::CurrentUser;
use crate::errors::AppError;
use crate::models::{ApplicationStatus, Role};
use crate::reports::engine;
use crate::state::AppState;

const EMPLOYER_RECENT_APPLICATIONS: i64 = 10;

/// GET /seeker_dashboard
pub async fn handle_seeker_dashboard(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::Seeker)?;
    let rows = state.store.applications_for_seeker(user.id()).await?;
    let pending = rows
        .iter()
        .filter(|(a, _)| a.status == ApplicationStatus::Pending)
        .count();
    let accepted = rows
        .iter()
        .filter(|(a, _)| a.status == ApplicationStatus::Accepted)
        .count();
    let applications: Vec<Value> = rows
        .into_iter()
        .map(|(application, job)| json!({ "application": application, "job": job }))
        .collect();
    Ok(Json(json!({
        "total_applications": applications.len(),
        "pending": pending,
        "accepted": accepted,
        "applications": applications,
    })))
}

/// GET /employer_dashboard
pub async fn handle_employer_dashboard(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::Employer)?;
    let jobs = state.store.jobs_for_employer(user.id()).await?;
    let total_applications: i64 = jobs.iter().map(|(_, count)| count).sum();
    let active = jobs.iter().filter(|(j, _)| j.lifecycle.is_active()).count();
    let drafts = jobs.iter().filter(|(j, _)| j.lifecycle.is_draft()).count();
    let mut pending = 0usize;
    for (job, _) in &jobs {
        pending += state
            .store
            .applications_for_job(job.id)
            .await?
            .iter()
            .filter(|a| a.status == ApplicationStatus::Pending)
            .count();
    }
    let recent = state
        .store
        .applications_for_employer(user.id(), EMPLOYER_RECENT_APPLICATIONS)
        .await?;
    let recent: Vec<Value> = recent
        .into_iter()
        .map(|(application, job)| json!({ "application": application, "job": job }))
        .collect();
    let jobs: Vec<Value> = jobs
        .into_iter()
        .map(|(job, count)| json!({ "job": job, "application_count": count }))
        .collect();
    Ok(Json(json!({
        "total_jobs": jobs.len(),
        "active_jobs": active,
        "draft_jobs": drafts,
        "total_applications": total_applications,
        "pending_applications": pending,
        "jobs": jobs,
        "recent_applications": recent,
    })))
}

/// GET /admin_dashboard
/// Overview plus the activity feed; any active admin may see it.
pub async fn handle_admin_dashboard(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Value>, AppError> {
    let account = user
        .require_admin_permission(&state, |p| p.any())
        .await?;
    let overview = engine::system_overview(state.store.as_ref()).await?;
    let activity = engine::activity_feed(state.store.as_ref(), 15).await?;
    Ok(Json(json!({
        "admin": account.username,
        "permissions": account.permissions,
        "overview": overview,
        "activity": activity,
    })))
}

const OVERVIEW_RECENT: i64 = 5;

/// GET /admin/reports/overview
pub async fn handle_report_overview(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Value>, AppError> {
    user.require_admin_permission(&state, |p| p.view_reports)
        .await?;
    let overview = engine::system_overview(state.store.as_ref()).await?;
    let recent_users = state.store.recent_accounts(OVERVIEW_RECENT).await?;
    let recent_jobs: Vec<Value> = state
        .store
        .recent_jobs_with_counts(OVERVIEW_RECENT)
        .await?
        .into_iter()
        .map(|(job, count)| json!({ "job": job, "application_count": count }))
        .collect();
    Ok(Json(json!({
        "overview": overview,
        "recent_users": recent_users,
        "recent_jobs": recent_jobs,
    })))
}

#[derive(Deserialize)]
pub struct TopQuery {
    #[serde(default = "default_top_n")]
    pub n: i64,
}

fn default_top_n() -> i64 {
    5
}

/// GET /admin/reports/top_employers
pub async fn handle_report_top_employers(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<TopQuery>,
) -> Result<Json<Value>, AppError> {
    user.require_admin_permission(&state, |p| p.view_reports)
        .await?;
    let n = params.n.clamp(1, 50);
    let employers = state.store.top_employers(n).await?;
    Ok(Json(json!({ "top_employers": employers })))
}

/// GET /admin/reports/top_seekers
pub async fn handle_report_top_seekers(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<TopQuery>,
) -> Result<Json<Value>, AppError> {
    user.require_admin_permission(&state, |p| p.view_reports)
        .await?;
    let n = params.n.clamp(1, 50);
    let seekers = engine::top_seekers(state.store.as_ref(), n).await?;
    Ok(Json(json!({ "top_seekers": seekers })))
}

#[derive(Deserialize)]
pub struct FeedQuery {
    #[serde(default = "default_feed_limit")]
    pub limit: i64,
}

fn default_feed_limit() -> i64 {
    20
}

/// GET /admin/reports/activity
pub async fn handle_report_activity(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<FeedQuery>,
) -> Result<Json<Value>, AppError> {
    user.require_admin_permission(&state, |p| p.view_reports)
        .await?;
    let limit = params.limit.clamp(1, 100);
    let items = engine::activity_feed(state.store.as_ref(), limit).await?;
    Ok(Json(json!({ "activity": items })))
}
