//! Reporting aggregation. Every figure is computed from the store at
//! request time; nothing here is cached or incrementally maintained.
//! All day and month boundaries are UTC.

use chrono::{DateTime, Datelike, Days, NaiveTime, Utc};
use serde::Serialize;

use crate::errors::AppError;
use crate::store::Store;

/// Platform-wide counters for the admin overview.
#[derive(Debug, Clone, Serialize)]
pub struct SystemOverview {
    pub total_users: i64,
    pub active_users: i64,
    pub total_seekers: i64,
    pub total_employers: i64,
    pub active_employers: i64,
    pub total_admins: i64,
    pub users_today: i64,
    pub users_this_month: i64,
    pub total_jobs: i64,
    pub active_jobs: i64,
    pub jobs_today: i64,
    pub jobs_this_month: i64,
    pub total_applications: i64,
    pub applications_today: i64,
    pub applications_this_month: i64,
}

pub fn start_of_today(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

pub fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    let date = now.date_naive();
    let first = date - Days::new(u64::from(date.day0()));
    first.and_time(NaiveTime::MIN).and_utc()
}

pub async fn system_overview(store: &dyn Store) -> Result<SystemOverview, AppError> {
    use crate::models::Role;

    let now = Utc::now();
    let today = Some(start_of_today(now));
    let month = Some(start_of_month(now));

    Ok(SystemOverview {
        total_users: store.count_accounts(None, false, None).await?,
        active_users: store.count_accounts(None, true, None).await?,
        total_seekers: store.count_accounts(Some(Role::Seeker), false, None).await?,
        total_employers: store
            .count_accounts(Some(Role::Employer), false, None)
            .await?,
        active_employers: store
            .count_accounts(Some(Role::Employer), true, None)
            .await?,
        total_admins: store.count_accounts(Some(Role::Admin), false, None).await?,
        users_today: store.count_accounts(None, false, today).await?,
        users_this_month: store.count_accounts(None, false, month).await?,
        total_jobs: store.count_jobs(false, None).await?,
        active_jobs: store.count_jobs(true, None).await?,
        jobs_today: store.count_jobs(false, today).await?,
        jobs_this_month: store.count_jobs(false, month).await?,
        total_applications: store.count_applications(None).await?,
        applications_today: store.count_applications(today).await?,
        applications_this_month: store.count_applications(month).await?,
    })
}

/// Seeker ranking row with the derived acceptance percentage.
#[derive(Debug, Clone, Serialize)]
pub struct SeekerPerformance {
    pub username: String,
    pub application_count: i64,
    pub accepted_count: i64,
    pub acceptance_rate: f64,
}

/// Top seekers by application volume. The acceptance rate guards against
/// division by zero for seekers with no applications.
pub async fn top_seekers(store: &dyn Store, n: i64) -> Result<Vec<SeekerPerformance>, AppError> {
    let ranks = store.top_seekers(n).await?;
    Ok(ranks
        .into_iter()
        .map(|s| {
            let rate = if s.application_count > 0 {
                s.accepted_count as f64 / s.application_count as f64 * 100.0
            } else {
                0.0
            };
            SeekerPerformance {
                username: s.username,
                application_count: s.application_count,
                accepted_count: s.accepted_count,
                acceptance_rate: rate,
            }
        })
        .collect())
}

/// One line in the recent-activity feed.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityItem {
    pub kind: &'static str,
    pub summary: String,
    pub at: DateTime<Utc>,
    pub when: String,
}

/// Interleaves recent registrations, postings and applications into one
/// feed, newest first.
pub async fn activity_feed(store: &dyn Store, limit: i64) -> Result<Vec<ActivityItem>, AppError> {
    let now = Utc::now();
    let mut items = Vec::new();

    for account in store.recent_accounts(limit).await? {
        items.push(ActivityItem {
            kind: "registration",
            summary: format!(
                "{} registered as {}",
                account.username,
                account.role.as_str()
            ),
            at: account.created_at,
            when: relative_time(now, account.created_at),
        });
    }
    for (job, applications) in store.recent_jobs_with_counts(limit).await? {
        items.push(ActivityItem {
            kind: "job_posted",
            summary: format!(
                "{} posted at {} ({} applications)",
                job.title, job.company_name, applications
            ),
            at: job.posted_date,
            when: relative_time(now, job.posted_date),
        });
    }
    for (application, job) in store.recent_applications(limit).await? {
        items.push(ActivityItem {
            kind: "application",
            summary: format!("{} applied for {}", application.form.full_name, job.title),
            at: application.submitted_at,
            when: relative_time(now, application.submitted_at),
        });
    }

    items.sort_by(|a, b| b.at.cmp(&a.at));
    items.truncate(limit as usize);
    Ok(items)
}

/// Human-readable age of a timestamp relative to `now`.
pub fn relative_time(now: DateTime<Utc>, then: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds().max(0);
    if secs < 60 {
        "just now".to_string()
    } else if secs < 3600 {
        format!("{} minutes ago", secs / 60)
    } else if secs < 86_400 {
        format!("{} hours ago", secs / 3600)
    } else {
        format!("{} days ago", secs / 86_400)
    }
}
