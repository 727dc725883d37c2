//! sqlx-backed `Store` implementation. Every mutating method is a single
//! statement (or transaction), so a failure never leaves partial state.
//! Uniqueness is enforced by the database constraints; SQLSTATE 23505 is
//! translated back into the typed duplicate variants.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use crate::models::{
    Account, AdminPermissions, Application, ApplicationForm, ApplicationStatus, JobPosting,
    Lifecycle, RequirementFlags, Role,
};
use crate::store::{EmployerRank, NewAccount, SeekerRank, Store, StoreError, StoreResult};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    id UUID PRIMARY KEY,
    username VARCHAR(80) NOT NULL,
    email VARCHAR(120) NOT NULL,
    password_hash TEXT NOT NULL,
    role VARCHAR(20) NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    full_name VARCHAR(100),
    phone VARCHAR(20),
    location VARCHAR(100),
    bio TEXT,
    perm_manage_users BOOLEAN NOT NULL DEFAULT FALSE,
    perm_manage_jobs BOOLEAN NOT NULL DEFAULT FALSE,
    perm_manage_applications BOOLEAN NOT NULL DEFAULT FALSE,
    perm_view_reports BOOLEAN NOT NULL DEFAULT FALSE,
    perm_system_settings BOOLEAN NOT NULL DEFAULT FALSE,
    created_by UUID REFERENCES accounts(id),
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    last_login TIMESTAMPTZ,
    reset_token UUID,
    reset_token_expires TIMESTAMPTZ,
    CONSTRAINT accounts_username_key UNIQUE (username),
    CONSTRAINT accounts_email_key UNIQUE (email)
);

CREATE TABLE IF NOT EXISTS job_postings (
    id UUID PRIMARY KEY,
    title VARCHAR(200) NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    employer_id UUID NOT NULL REFERENCES accounts(id),
    company_name VARCHAR(100) NOT NULL DEFAULT '',
    location VARCHAR(100) NOT NULL DEFAULT '',
    salary_range VARCHAR(50),
    job_type VARCHAR(20) NOT NULL DEFAULT 'full-time',
    is_draft BOOLEAN NOT NULL,
    is_active BOOLEAN NOT NULL,
    published_at TIMESTAMPTZ,
    posted_date TIMESTAMPTZ NOT NULL,
    draft_saved_at TIMESTAMPTZ NOT NULL,
    require_phone BOOLEAN NOT NULL DEFAULT TRUE,
    require_address BOOLEAN NOT NULL DEFAULT FALSE,
    require_work_authorization BOOLEAN NOT NULL DEFAULT TRUE,
    require_experience_years BOOLEAN NOT NULL DEFAULT TRUE,
    require_expected_salary BOOLEAN NOT NULL DEFAULT FALSE,
    require_education BOOLEAN NOT NULL DEFAULT TRUE,
    require_work_history BOOLEAN NOT NULL DEFAULT TRUE,
    require_skills BOOLEAN NOT NULL DEFAULT TRUE,
    require_portfolio BOOLEAN NOT NULL DEFAULT FALSE,
    require_cover_letter BOOLEAN NOT NULL DEFAULT TRUE,
    require_resume BOOLEAN NOT NULL DEFAULT TRUE,
    require_portfolio_links BOOLEAN NOT NULL DEFAULT FALSE,
    CONSTRAINT job_postings_state_check CHECK (NOT (is_draft AND is_active))
);

CREATE TABLE IF NOT EXISTS applications (
    id UUID PRIMARY KEY,
    job_id UUID NOT NULL REFERENCES job_postings(id) ON DELETE CASCADE,
    seeker_id UUID NOT NULL REFERENCES accounts(id),
    submitted_at TIMESTAMPTZ NOT NULL,
    status VARCHAR(20) NOT NULL DEFAULT 'pending',
    full_name VARCHAR(100) NOT NULL,
    email VARCHAR(120) NOT NULL,
    phone VARCHAR(20),
    address TEXT,
    work_authorization VARCHAR(100),
    years_experience INTEGER,
    expected_salary VARCHAR(50),
    willing_to_relocate BOOLEAN NOT NULL DEFAULT FALSE,
    willing_to_travel BOOLEAN NOT NULL DEFAULT FALSE,
    highest_qualification VARCHAR(100),
    institution_name VARCHAR(200),
    field_of_study VARCHAR(100),
    graduation_year INTEGER,
    certifications TEXT,
    previous_employers TEXT,
    technical_skills TEXT,
    soft_skills TEXT,
    languages TEXT,
    cover_letter TEXT,
    portfolio_url VARCHAR(200),
    linkedin_url VARCHAR(200),
    github_url VARCHAR(200),
    motivation TEXT,
    availability_date DATE,
    referred_by VARCHAR(100),
    terms_accepted BOOLEAN NOT NULL DEFAULT FALSE,
    data_consent BOOLEAN NOT NULL DEFAULT FALSE,
    resume_filename VARCHAR(200),
    reviewed_at TIMESTAMPTZ,
    review_notes TEXT,
    CONSTRAINT applications_job_seeker_key UNIQUE (job_id, seeker_id)
);

CREATE INDEX IF NOT EXISTS idx_job_postings_posted_date ON job_postings (posted_date DESC);
CREATE INDEX IF NOT EXISTS idx_applications_submitted_at ON applications (submitted_at DESC);
"#;

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connects, applies the schema, and returns a ready store.
    pub async fn connect(database_url: &str) -> Result<Self> {
        info!("Connecting to PostgreSQL...");
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        info!("PostgreSQL connection pool established");
        Ok(PgStore { pool })
    }
}

/// Maps a unique-constraint violation onto the typed duplicate variants.
fn map_db_err(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            return match db_err.constraint() {
                Some("accounts_username_key") => StoreError::DuplicateUsername,
                Some("accounts_email_key") => StoreError::DuplicateEmail,
                Some("applications_job_seeker_key") => StoreError::DuplicateApplication,
                _ => StoreError::Backend(db_err.to_string()),
            };
        }
    }
    err.into()
}

fn decode_account(row: &PgRow) -> StoreResult<Account> {
    let role_raw: String = row.try_get("role")?;
    let role = Role::parse(&role_raw)
        .ok_or_else(|| StoreError::Backend(format!("unknown role in accounts row: {role_raw}")))?;
    Ok(Account {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        role,
        is_active: row.try_get("is_active")?,
        full_name: row.try_get("full_name")?,
        phone: row.try_get("phone")?,
        location: row.try_get("location")?,
        bio: row.try_get("bio")?,
        permissions: AdminPermissions {
            manage_users: row.try_get("perm_manage_users")?,
            manage_jobs: row.try_get("perm_manage_jobs")?,
            manage_applications: row.try_get("perm_manage_applications")?,
            view_reports: row.try_get("perm_view_reports")?,
            system_settings: row.try_get("perm_system_settings")?,
        },
        created_by: row.try_get("created_by")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        last_login: row.try_get("last_login")?,
        reset_token: row.try_get("reset_token")?,
        reset_token_expires: row.try_get("reset_token_expires")?,
    })
}

fn decode_job(row: &PgRow) -> StoreResult<JobPosting> {
    let is_draft: bool = row.try_get("is_draft")?;
    let is_active: bool = row.try_get("is_active")?;
    let published_at: Option<DateTime<Utc>> = row.try_get("published_at")?;
    let lifecycle = Lifecycle::from_flags(is_draft, is_active, published_at).ok_or_else(|| {
        StoreError::Backend("job_postings row is both draft and active".to_string())
    })?;
    Ok(JobPosting {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        employer_id: row.try_get("employer_id")?,
        company_name: row.try_get("company_name")?,
        location: row.try_get("location")?,
        salary_range: row.try_get("salary_range")?,
        job_type: row.try_get("job_type")?,
        lifecycle,
        requirements: RequirementFlags {
            phone: row.try_get("require_phone")?,
            address: row.try_get("require_address")?,
            work_authorization: row.try_get("require_work_authorization")?,
            experience_years: row.try_get("require_experience_years")?,
            expected_salary: row.try_get("require_expected_salary")?,
            education: row.try_get("require_education")?,
            work_history: row.try_get("require_work_history")?,
            skills: row.try_get("require_skills")?,
            portfolio: row.try_get("require_portfolio")?,
            cover_letter: row.try_get("require_cover_letter")?,
            resume: row.try_get("require_resume")?,
            portfolio_links: row.try_get("require_portfolio_links")?,
        },
        posted_date: row.try_get("posted_date")?,
        draft_saved_at: row.try_get("draft_saved_at")?,
    })
}

fn decode_application(row: &PgRow) -> StoreResult<Application> {
    let status_raw: String = row.try_get("status")?;
    let status = ApplicationStatus::parse(&status_raw).ok_or_else(|| {
        StoreError::Backend(format!("unknown status in applications row: {status_raw}"))
    })?;
    Ok(Application {
        id: row.try_get("id")?,
        job_id: row.try_get("job_id")?,
        seeker_id: row.try_get("seeker_id")?,
        submitted_at: row.try_get("submitted_at")?,
        status,
        form: ApplicationForm {
            full_name: row.try_get("full_name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            address: row.try_get("address")?,
            work_authorization: row.try_get("work_authorization")?,
            years_experience: row.try_get("years_experience")?,
            expected_salary: row.try_get("expected_salary")?,
            willing_to_relocate: row.try_get("willing_to_relocate")?,
            willing_to_travel: row.try_get("willing_to_travel")?,
            highest_qualification: row.try_get("highest_qualification")?,
            institution_name: row.try_get("institution_name")?,
            field_of_study: row.try_get("field_of_study")?,
            graduation_year: row.try_get("graduation_year")?,
            certifications: row.try_get("certifications")?,
            previous_employers: row.try_get("previous_employers")?,
            technical_skills: row.try_get("technical_skills")?,
            soft_skills: row.try_get("soft_skills")?,
            languages: row.try_get("languages")?,
            cover_letter: row.try_get("cover_letter")?,
            portfolio_url: row.try_get("portfolio_url")?,
            linkedin_url: row.try_get("linkedin_url")?,
            github_url: row.try_get("github_url")?,
            motivation: row.try_get("motivation")?,
            availability_date: row.try_get("availability_date")?,
            referred_by: row.try_get("referred_by")?,
            terms_accepted: row.try_get("terms_accepted")?,
            data_consent: row.try_get("data_consent")?,
        },
        resume_filename: row.try_get("resume_filename")?,
        reviewed_at: row.try_get("reviewed_at")?,
        review_notes: row.try_get("review_notes")?,
    })
}

const JOB_COLUMNS: &str = "id, title, description, employer_id, company_name, location, \
     salary_range, job_type, is_draft, is_active, published_at, posted_date, draft_saved_at, \
     require_phone, require_address, require_work_authorization, require_experience_years, \
     require_expected_salary, require_education, require_work_history, require_skills, \
     require_portfolio, require_cover_letter, require_resume, require_portfolio_links";

fn bind_job_values<'q>(
    query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    job: &'q JobPosting,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    let r = &job.requirements;
    query
        .bind(job.id)
        .bind(&job.title)
        .bind(&job.description)
        .bind(job.employer_id)
        .bind(&job.company_name)
        .bind(&job.location)
        .bind(&job.salary_range)
        .bind(&job.job_type)
        .bind(job.lifecycle.is_draft())
        .bind(job.lifecycle.is_active())
        .bind(job.lifecycle.published_at())
        .bind(job.posted_date)
        .bind(job.draft_saved_at)
        .bind(r.phone)
        .bind(r.address)
        .bind(r.work_authorization)
        .bind(r.experience_years)
        .bind(r.expected_salary)
        .bind(r.education)
        .bind(r.work_history)
        .bind(r.skills)
        .bind(r.portfolio)
        .bind(r.cover_letter)
        .bind(r.resume)
        .bind(r.portfolio_links)
}

#[async_trait]
impl Store for PgStore {
    async fn insert_account(&self, new: NewAccount) -> StoreResult<Account> {
        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            role: new.role,
            is_active: true,
            full_name: new.full_name,
            phone: None,
            location: None,
            bio: None,
            permissions: new.permissions,
            created_by: new.created_by,
            created_at: now,
            updated_at: now,
            last_login: None,
            reset_token: None,
            reset_token_expires: None,
        };
        let p = &account.permissions;
        sqlx::query(
            "INSERT INTO accounts \
                 (id, username, email, password_hash, role, is_active, full_name, \
                  perm_manage_users, perm_manage_jobs, perm_manage_applications, \
                  perm_view_reports, perm_system_settings, created_by, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(account.id)
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.role.as_str())
        .bind(account.is_active)
        .bind(&account.full_name)
        .bind(p.manage_users)
        .bind(p.manage_jobs)
        .bind(p.manage_applications)
        .bind(p.view_reports)
        .bind(p.system_settings)
        .bind(account.created_by)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(account)
    }

    async fn account_by_id(&self, id: Uuid) -> StoreResult<Option<Account>> {
        let row = sqlx::query("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(decode_account).transpose()
    }

    async fn account_by_identifier(&self, identifier: &str) -> StoreResult<Option<Account>> {
        let row = sqlx::query("SELECT * FROM accounts WHERE username = $1 OR email = $1")
            .bind(identifier)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(decode_account).transpose()
    }

    async fn account_by_reset_token(&self, token: Uuid) -> StoreResult<Option<Account>> {
        let row = sqlx::query("SELECT * FROM accounts WHERE reset_token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(decode_account).transpose()
    }

    async fn update_account(&self, account: &Account) -> StoreResult<()> {
        let p = &account.permissions;
        let result = sqlx::query(
            "UPDATE accounts SET \
                 username = $2, email = $3, password_hash = $4, role = $5, is_active = $6, \
                 full_name = $7, phone = $8, location = $9, bio = $10, \
                 perm_manage_users = $11, perm_manage_jobs = $12, \
                 perm_manage_applications = $13, perm_view_reports = $14, \
                 perm_system_settings = $15, updated_at = $16, last_login = $17, \
                 reset_token = $18, reset_token_expires = $19 \
             WHERE id = $1",
        )
        .bind(account.id)
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.role.as_str())
        .bind(account.is_active)
        .bind(&account.full_name)
        .bind(&account.phone)
        .bind(&account.location)
        .bind(&account.bio)
        .bind(p.manage_users)
        .bind(p.manage_jobs)
        .bind(p.manage_applications)
        .bind(p.view_reports)
        .bind(p.system_settings)
        .bind(account.updated_at)
        .bind(account.last_login)
        .bind(account.reset_token)
        .bind(account.reset_token_expires)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_accounts(&self) -> StoreResult<Vec<Account>> {
        let rows = sqlx::query("SELECT * FROM accounts ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(decode_account).collect()
    }

    async fn insert_job(&self, job: &JobPosting) -> StoreResult<()> {
        let sql = format!(
            "INSERT INTO job_postings ({JOB_COLUMNS}) VALUES \
             ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, \
              $18, $19, $20, $21, $22, $23, $24, $25)"
        );
        bind_job_values(sqlx::query(&sql), job)
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn job_by_id(&self, id: Uuid) -> StoreResult<Option<JobPosting>> {
        let row = sqlx::query("SELECT * FROM job_postings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(decode_job).transpose()
    }

    async fn update_job(&self, job: &JobPosting) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE job_postings SET \
                 title = $2, description = $3, employer_id = $4, company_name = $5, \
                 location = $6, salary_range = $7, job_type = $8, is_draft = $9, \
                 is_active = $10, published_at = $11, posted_date = $12, draft_saved_at = $13, \
                 require_phone = $14, require_address = $15, require_work_authorization = $16, \
                 require_experience_years = $17, require_expected_salary = $18, \
                 require_education = $19, require_work_history = $20, require_skills = $21, \
                 require_portfolio = $22, require_cover_letter = $23, require_resume = $24, \
                 require_portfolio_links = $25 \
             WHERE id = $1",
        );
        let result = bind_job_values(result, job)
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_job(&self, id: Uuid) -> StoreResult<()> {
        // Applications go with the posting via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM job_postings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_active_jobs(
        &self,
        offset: i64,
        limit: i64,
    ) -> StoreResult<(Vec<JobPosting>, i64)> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM job_postings WHERE is_active = TRUE")
                .fetch_one(&self.pool)
                .await?;
        let rows = sqlx::query(
            "SELECT * FROM job_postings WHERE is_active = TRUE \
             ORDER BY posted_date DESC OFFSET $1 LIMIT $2",
        )
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        let jobs = rows.iter().map(decode_job).collect::<StoreResult<_>>()?;
        Ok((jobs, total))
    }

    async fn search_jobs(&self, keyword: &str) -> StoreResult<Vec<JobPosting>> {
        let pattern = format!("%{}%", keyword.replace('%', "\\%").replace('_', "\\_"));
        let rows = sqlx::query(
            "SELECT * FROM job_postings WHERE is_active = TRUE AND \
                 (title ILIKE $1 OR description ILIKE $1 OR company_name ILIKE $1 \
                  OR location ILIKE $1) \
             ORDER BY posted_date DESC",
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(decode_job).collect()
    }

    async fn jobs_for_employer(
        &self,
        employer_id: Uuid,
    ) -> StoreResult<Vec<(JobPosting, i64)>> {
        let rows = sqlx::query(
            "SELECT j.*, COUNT(a.id) AS application_count \
             FROM job_postings j LEFT OUTER JOIN applications a ON a.job_id = j.id \
             WHERE j.employer_id = $1 \
             GROUP BY j.id ORDER BY j.posted_date DESC",
        )
        .bind(employer_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| {
                let count: i64 = row.try_get("application_count")?;
                Ok((decode_job(row)?, count))
            })
            .collect()
    }

    async fn insert_application(&self, application: &Application) -> StoreResult<()> {
        let f = &application.form;
        sqlx::query(
            "INSERT INTO applications \
                 (id, job_id, seeker_id, submitted_at, status, full_name, email, phone, \
                  address, work_authorization, years_experience, expected_salary, \
                  willing_to_relocate, willing_to_travel, highest_qualification, \
                  institution_name, field_of_study, graduation_year, certifications, \
                  previous_employers, technical_skills, soft_skills, languages, cover_letter, \
                  portfolio_url, linkedin_url, github_url, motivation, availability_date, \
                  referred_by, terms_accepted, data_consent, resume_filename, reviewed_at, \
                  review_notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
                     $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29, $30, \
                     $31, $32, $33, $34, $35)",
        )
        .bind(application.id)
        .bind(application.job_id)
        .bind(application.seeker_id)
        .bind(application.submitted_at)
        .bind(application.status.as_str())
        .bind(&f.full_name)
        .bind(&f.email)
        .bind(&f.phone)
        .bind(&f.address)
        .bind(&f.work_authorization)
        .bind(f.years_experience)
        .bind(&f.expected_salary)
        .bind(f.willing_to_relocate)
        .bind(f.willing_to_travel)
        .bind(&f.highest_qualification)
        .bind(&f.institution_name)
        .bind(&f.field_of_study)
        .bind(f.graduation_year)
        .bind(&f.certifications)
        .bind(&f.previous_employers)
        .bind(&f.technical_skills)
        .bind(&f.soft_skills)
        .bind(&f.languages)
        .bind(&f.cover_letter)
        .bind(&f.portfolio_url)
        .bind(&f.linkedin_url)
        .bind(&f.github_url)
        .bind(&f.motivation)
        .bind(f.availability_date)
        .bind(&f.referred_by)
        .bind(f.terms_accepted)
        .bind(f.data_consent)
        .bind(&application.resume_filename)
        .bind(application.reviewed_at)
        .bind(&application.review_notes)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }

    async fn application_by_id(&self, id: Uuid) -> StoreResult<Option<Application>> {
        let row = sqlx::query("SELECT * FROM applications WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(decode_application).transpose()
    }

    async fn update_application(&self, application: &Application) -> StoreResult<()> {
        // Only the review-side fields move after submission.
        let result = sqlx::query(
            "UPDATE applications SET status = $2, reviewed_at = $3, review_notes = $4 \
             WHERE id = $1",
        )
        .bind(application.id)
        .bind(application.status.as_str())
        .bind(application.reviewed_at)
        .bind(&application.review_notes)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn application_exists(&self, job_id: Uuid, seeker_id: Uuid) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM applications WHERE job_id = $1 AND seeker_id = $2)",
        )
        .bind(job_id)
        .bind(seeker_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn applications_for_seeker(
        &self,
        seeker_id: Uuid,
    ) -> StoreResult<Vec<(Application, JobPosting)>> {
        let rows = sqlx::query(
            "SELECT a.* FROM applications a \
             JOIN job_postings j ON j.id = a.job_id \
             WHERE a.seeker_id = $1 ORDER BY a.submitted_at DESC",
        )
        .bind(seeker_id)
        .fetch_all(&self.pool)
        .await?;
        self.join_postings(rows).await
    }

    async fn applications_for_employer(
        &self,
        employer_id: Uuid,
        limit: i64,
    ) -> StoreResult<Vec<(Application, JobPosting)>> {
        let rows = sqlx::query(
            "SELECT a.* FROM applications a \
             JOIN job_postings j ON j.id = a.job_id \
             WHERE j.employer_id = $1 ORDER BY a.submitted_at DESC LIMIT $2",
        )
        .bind(employer_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        self.join_postings(rows).await
    }

    async fn applications_for_job(&self, job_id: Uuid) -> StoreResult<Vec<Application>> {
        let rows = sqlx::query(
            "SELECT * FROM applications WHERE job_id = $1 ORDER BY submitted_at DESC",
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(decode_application).collect()
    }

    async fn count_accounts(
        &self,
        role: Option<Role>,
        active_only: bool,
        since: Option<DateTime<Utc>>,
    ) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM accounts WHERE \
                 ($1::VARCHAR IS NULL OR role = $1) AND \
                 (NOT $2 OR is_active) AND \
                 ($3::TIMESTAMPTZ IS NULL OR created_at >= $3)",
        )
        .bind(role.map(|r| r.as_str()))
        .bind(active_only)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn count_jobs(
        &self,
        active_only: bool,
        since: Option<DateTime<Utc>>,
    ) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM job_postings WHERE \
                 (NOT $1 OR is_active) AND \
                 ($2::TIMESTAMPTZ IS NULL OR posted_date >= $2)",
        )
        .bind(active_only)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn count_applications(&self, since: Option<DateTime<Utc>>) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM applications WHERE \
                 ($1::TIMESTAMPTZ IS NULL OR submitted_at >= $1)",
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn recent_accounts(&self, limit: i64) -> StoreResult<Vec<Account>> {
        let rows = sqlx::query("SELECT * FROM accounts ORDER BY created_at DESC LIMIT $1")
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(decode_account).collect()
    }

    async fn recent_jobs_with_counts(
        &self,
        limit: i64,
    ) -> StoreResult<Vec<(JobPosting, i64)>> {
        let rows = sqlx::query(
            "SELECT j.*, COUNT(a.id) AS application_count \
             FROM job_postings j LEFT OUTER JOIN applications a ON a.job_id = j.id \
             GROUP BY j.id ORDER BY j.posted_date DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| {
                let count: i64 = row.try_get("application_count")?;
                Ok((decode_job(row)?, count))
            })
            .collect()
    }

    async fn recent_applications(
        &self,
        limit: i64,
    ) -> StoreResult<Vec<(Application, JobPosting)>> {
        let rows = sqlx::query(
            "SELECT * FROM applications ORDER BY submitted_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        self.join_postings(rows).await
    }

    async fn top_employers(&self, n: i64) -> StoreResult<Vec<EmployerRank>> {
        let rows = sqlx::query(
            "SELECT u.username, \
                    COUNT(DISTINCT j.id) AS job_count, \
                    COUNT(a.id) AS application_count, \
                    ARRAY_REMOVE(ARRAY_AGG(DISTINCT j.company_name), '') AS company_names \
             FROM accounts u \
             JOIN job_postings j ON j.employer_id = u.id \
             LEFT OUTER JOIN applications a ON a.job_id = j.id \
             WHERE u.role = 'employer' \
             GROUP BY u.id ORDER BY job_count DESC, u.username ASC LIMIT $1",
        )
        .bind(n)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| {
                Ok(EmployerRank {
                    username: row.try_get("username")?,
                    company_names: row.try_get("company_names")?,
                    job_count: row.try_get("job_count")?,
                    application_count: row.try_get("application_count")?,
                })
            })
            .collect()
    }

    async fn top_seekers(&self, n: i64) -> StoreResult<Vec<SeekerRank>> {
        let rows = sqlx::query(
            "SELECT u.username, \
                    COUNT(a.id) AS application_count, \
                    COUNT(a.id) FILTER (WHERE a.status = 'accepted') AS accepted_count \
             FROM accounts u \
             JOIN applications a ON a.seeker_id = u.id \
             WHERE u.role = 'seeker' \
             GROUP BY u.id ORDER BY application_count DESC, u.username ASC LIMIT $1",
        )
        .bind(n)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| {
                Ok(SeekerRank {
                    username: row.try_get("username")?,
                    application_count: row.try_get("application_count")?,
                    accepted_count: row.try_get("accepted_count")?,
                })
            })
            .collect()
    }
}

impl PgStore {
    /// Pairs application rows with their postings. The posting is fetched
    /// per distinct job id; result sets here are small (dashboards).
    async fn join_postings(
        &self,
        rows: Vec<PgRow>,
    ) -> StoreResult<Vec<(Application, JobPosting)>> {
        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            let application = decode_application(row)?;
            let job = self
                .job_by_id(application.job_id)
                .await?
                .ok_or(StoreError::NotFound)?;
            out.push((application, job));
        }
        Ok(out)
    }
}
