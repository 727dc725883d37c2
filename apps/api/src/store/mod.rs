pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Account, AdminPermissions, Application, JobPosting, Role};

pub use memory::MemStore;
pub use postgres::PgStore;

/// Errors surfaced by a store implementation. Uniqueness violations are
/// first-class variants so services can translate them without string
/// matching; everything else collapses into `Backend`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("username already exists")]
    DuplicateUsername,
    #[error("email already exists")]
    DuplicateEmail,
    #[error("application already exists for this job and seeker")]
    DuplicateApplication,
    #[error("row not found")]
    NotFound,
    #[error("backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            other => StoreError::Backend(other.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Fields needed to create an account row. The id and timestamps are
/// assigned by the store.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub full_name: Option<String>,
    pub permissions: AdminPermissions,
    pub created_by: Option<Uuid>,
}

/// Employer ranked by posting volume.
#[derive(Debug, Clone, Serialize)]
pub struct EmployerRank {
    pub username: String,
    pub company_names: Vec<String>,
    pub job_count: i64,
    pub application_count: i64,
}

/// Seeker ranked by application volume.
#[derive(Debug, Clone, Serialize)]
pub struct SeekerRank {
    pub username: String,
    pub application_count: i64,
    pub accepted_count: i64,
}

/// Persistent store seam. Every mutating method is a single transactional
/// unit: it either fully applies or leaves no trace. Implementations must
/// enforce the unique constraints on username, email and (job, seeker), and
/// cascade application deletion when a posting is removed.
#[async_trait]
pub trait Store: Send + Sync {
    // Accounts
    async fn insert_account(&self, new: NewAccount) -> StoreResult<Account>;
    async fn account_by_id(&self, id: Uuid) -> StoreResult<Option<Account>>;
    /// Looks up by username or email, whichever matches.
    async fn account_by_identifier(&self, identifier: &str) -> StoreResult<Option<Account>>;
    async fn account_by_reset_token(&self, token: Uuid) -> StoreResult<Option<Account>>;
    /// Full-row update keyed on `account.id`.
    async fn update_account(&self, account: &Account) -> StoreResult<()>;
    async fn list_accounts(&self) -> StoreResult<Vec<Account>>;

    // Job postings
    async fn insert_job(&self, job: &JobPosting) -> StoreResult<()>;
    async fn job_by_id(&self, id: Uuid) -> StoreResult<Option<JobPosting>>;
    async fn update_job(&self, job: &JobPosting) -> StoreResult<()>;
    /// Deletes the posting and, transitively, its applications.
    async fn delete_job(&self, id: Uuid) -> StoreResult<()>;
    /// Published+active postings, newest first, with the total count for
    /// pagination.
    async fn list_active_jobs(&self, offset: i64, limit: i64)
        -> StoreResult<(Vec<JobPosting>, i64)>;
    /// Case-insensitive substring search over title/description/company/
    /// location, restricted to published+active postings, newest first.
    async fn search_jobs(&self, keyword: &str) -> StoreResult<Vec<JobPosting>>;
    /// All postings owned by the employer with per-posting application
    /// counts, newest first.
    async fn jobs_for_employer(&self, employer_id: Uuid)
        -> StoreResult<Vec<(JobPosting, i64)>>;

    // Applications
    async fn insert_application(&self, application: &Application) -> StoreResult<()>;
    async fn application_by_id(&self, id: Uuid) -> StoreResult<Option<Application>>;
    async fn update_application(&self, application: &Application) -> StoreResult<()>;
    async fn application_exists(&self, job_id: Uuid, seeker_id: Uuid) -> StoreResult<bool>;
    /// A seeker's applications joined with their postings, newest first.
    async fn applications_for_seeker(
        &self,
        seeker_id: Uuid,
    ) -> StoreResult<Vec<(Application, JobPosting)>>;
    /// Applications across all of an employer's postings, newest first.
    async fn applications_for_employer(
        &self,
        employer_id: Uuid,
        limit: i64,
    ) -> StoreResult<Vec<(Application, JobPosting)>>;
    async fn applications_for_job(&self, job_id: Uuid) -> StoreResult<Vec<Application>>;

    // Reporting aggregates
    async fn count_accounts(
        &self,
        role: Option<Role>,
        active_only: bool,
        since: Option<DateTime<Utc>>,
    ) -> StoreResult<i64>;
    async fn count_jobs(
        &self,
        active_only: bool,
        since: Option<DateTime<Utc>>,
    ) -> StoreResult<i64>;
    async fn count_applications(&self, since: Option<DateTime<Utc>>) -> StoreResult<i64>;
    async fn recent_accounts(&self, limit: i64) -> StoreResult<Vec<Account>>;
    /// Most recent postings with per-posting application counts.
    async fn recent_jobs_with_counts(&self, limit: i64)
        -> StoreResult<Vec<(JobPosting, i64)>>;
    /// Most recent applications joined with their postings.
    async fn recent_applications(
        &self,
        limit: i64,
    ) -> StoreResult<Vec<(Application, JobPosting)>>;
    async fn top_employers(&self, n: i64) -> StoreResult<Vec<EmployerRank>>;
    async fn top_seekers(&self, n: i64) -> StoreResult<Vec<SeekerRank>>;
}
