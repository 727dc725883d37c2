//! In-memory `Store` used by tests and database-less local runs. Enforces
//! the same invariants as the Postgres store: unique username/email, unique
//! (job, seeker) application pairs, and cascading application deletion.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Account, Application, ApplicationStatus, JobPosting, Role};
use crate::store::{EmployerRank, NewAccount, SeekerRank, Store, StoreError, StoreResult};

#[derive(Default)]
struct Tables {
    accounts: HashMap<Uuid, Account>,
    jobs: HashMap<Uuid, JobPosting>,
    applications: HashMap<Uuid, Application>,
}

#[derive(Default)]
pub struct MemStore {
    tables: RwLock<Tables>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_err<T>(_: T) -> StoreError {
    StoreError::Backend("store lock poisoned".to_string())
}

#[async_trait]
impl Store for MemStore {
    async fn insert_account(&self, new: NewAccount) -> StoreResult<Account> {
        let mut tables = self.tables.write().map_err(lock_err)?;

        if tables.accounts.values().any(|a| a.username == new.username) {
            return Err(StoreError::DuplicateUsername);
        }
        if tables.accounts.values().any(|a| a.email == new.email) {
            return Err(StoreError::DuplicateEmail);
        }

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
        tables.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn account_by_id(&self, id: Uuid) -> StoreResult<Option<Account>> {
        let tables = self.tables.read().map_err(lock_err)?;
        Ok(tables.accounts.get(&id).cloned())
    }

    async fn account_by_identifier(&self, identifier: &str) -> StoreResult<Option<Account>> {
        let tables = self.tables.read().map_err(lock_err)?;
        Ok(tables
            .accounts
            .values()
            .find(|a| a.username == identifier || a.email == identifier)
            .cloned())
    }

    async fn account_by_reset_token(&self, token: Uuid) -> StoreResult<Option<Account>> {
        let tables = self.tables.read().map_err(lock_err)?;
        Ok(tables
            .accounts
            .values()
            .find(|a| a.reset_token == Some(token))
            .cloned())
    }

    async fn update_account(&self, account: &Account) -> StoreResult<()> {
        let mut tables = self.tables.write().map_err(lock_err)?;

        if !tables.accounts.contains_key(&account.id) {
            return Err(StoreError::NotFound);
        }
        if tables
            .accounts
            .values()
            .any(|a| a.id != account.id && a.username == account.username)
        {
            return Err(StoreError::DuplicateUsername);
        }
        if tables
            .accounts
            .values()
            .any(|a| a.id != account.id && a.email == account.email)
        {
            return Err(StoreError::DuplicateEmail);
        }

        tables.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn list_accounts(&self) -> StoreResult<Vec<Account>> {
        let tables = self.tables.read().map_err(lock_err)?;
        let mut accounts: Vec<Account> = tables.accounts.values().cloned().collect();
        accounts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(accounts)
    }

    async fn insert_job(&self, job: &JobPosting) -> StoreResult<()> {
        let mut tables = self.tables.write().map_err(lock_err)?;
        if !tables.accounts.contains_key(&job.employer_id) {
            return Err(StoreError::NotFound);
        }
        tables.jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn job_by_id(&self, id: Uuid) -> StoreResult<Option<JobPosting>> {
        let tables = self.tables.read().map_err(lock_err)?;
        Ok(tables.jobs.get(&id).cloned())
    }

    async fn update_job(&self, job: &JobPosting) -> StoreResult<()> {
        let mut tables = self.tables.write().map_err(lock_err)?;
        if !tables.jobs.contains_key(&job.id) {
            return Err(StoreError::NotFound);
        }
        tables.jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn delete_job(&self, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().map_err(lock_err)?;
        if tables.jobs.remove(&id).is_none() {
            return Err(StoreError::NotFound);
        }
        // Cascade: no application may outlive its posting.
        tables.applications.retain(|_, a| a.job_id != id);
        Ok(())
    }

    async fn list_active_jobs(
        &self,
        offset: i64,
        limit: i64,
    ) -> StoreResult<(Vec<JobPosting>, i64)> {
        let tables = self.tables.read().map_err(lock_err)?;
        let mut jobs: Vec<JobPosting> = tables
            .jobs
            .values()
            .filter(|j| j.lifecycle.is_active())
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.posted_date.cmp(&a.posted_date));
        let total = jobs.len() as i64;
        let page = jobs
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn search_jobs(&self, keyword: &str) -> StoreResult<Vec<JobPosting>> {
        let needle = keyword.to_lowercase();
        let tables = self.tables.read().map_err(lock_err)?;
        let mut jobs: Vec<JobPosting> = tables
            .jobs
            .values()
            .filter(|j| j.lifecycle.is_active())
            .filter(|j| {
                j.title.to_lowercase().contains(&needle)
                    || j.description.to_lowercase().contains(&needle)
                    || j.company_name.to_lowercase().contains(&needle)
                    || j.location.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.posted_date.cmp(&a.posted_date));
        Ok(jobs)
    }

    async fn jobs_for_employer(
        &self,
        employer_id: Uuid,
    ) -> StoreResult<Vec<(JobPosting, i64)>> {
        let tables = self.tables.read().map_err(lock_err)?;
        let mut jobs: Vec<(JobPosting, i64)> = tables
            .jobs
            .values()
            .filter(|j| j.employer_id == employer_id)
            .map(|j| {
                let count = tables
                    .applications
                    .values()
                    .filter(|a| a.job_id == j.id)
                    .count() as i64;
                (j.clone(), count)
            })
            .collect();
        jobs.sort_by(|a, b| b.0.posted_date.cmp(&a.0.posted_date));
        Ok(jobs)
    }

    async fn insert_application(&self, application: &Application) -> StoreResult<()> {
        let mut tables = self.tables.write().map_err(lock_err)?;
        if !tables.jobs.contains_key(&application.job_id) {
            return Err(StoreError::NotFound);
        }
        if tables
            .applications
            .values()
            .any(|a| a.job_id == application.job_id && a.seeker_id == application.seeker_id)
        {
            return Err(StoreError::DuplicateApplication);
        }
        tables
            .applications
            .insert(application.id, application.clone());
        Ok(())
    }

    async fn application_by_id(&self, id: Uuid) -> StoreResult<Option<Application>> {
        let tables = self.tables.read().map_err(lock_err)?;
        Ok(tables.applications.get(&id).cloned())
    }

    async fn update_application(&self, application: &Application) -> StoreResult<()> {
        let mut tables = self.tables.write().map_err(lock_err)?;
        if !tables.applications.contains_key(&application.id) {
            return Err(StoreError::NotFound);
        }
        tables
            .applications
            .insert(application.id, application.clone());
        Ok(())
    }

    async fn application_exists(&self, job_id: Uuid, seeker_id: Uuid) -> StoreResult<bool> {
        let tables = self.tables.read().map_err(lock_err)?;
        Ok(tables
            .applications
            .values()
            .any(|a| a.job_id == job_id && a.seeker_id == seeker_id))
    }

    async fn applications_for_seeker(
        &self,
        seeker_id: Uuid,
    ) -> StoreResult<Vec<(Application, JobPosting)>> {
        let tables = self.tables.read().map_err(lock_err)?;
        let mut rows: Vec<(Application, JobPosting)> = tables
            .applications
            .values()
            .filter(|a| a.seeker_id == seeker_id)
            .filter_map(|a| tables.jobs.get(&a.job_id).map(|j| (a.clone(), j.clone())))
            .collect();
        rows.sort_by(|a, b| b.0.submitted_at.cmp(&a.0.submitted_at));
        Ok(rows)
    }

    async fn applications_for_employer(
        &self,
        employer_id: Uuid,
        limit: i64,
    ) -> StoreResult<Vec<(Application, JobPosting)>> {
        let tables = self.tables.read().map_err(lock_err)?;
        let mut rows: Vec<(Application, JobPosting)> = tables
            .applications
            .values()
            .filter_map(|a| tables.jobs.get(&a.job_id).map(|j| (a.clone(), j.clone())))
            .filter(|(_, j)| j.employer_id == employer_id)
            .collect();
        rows.sort_by(|a, b| b.0.submitted_at.cmp(&a.0.submitted_at));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn applications_for_job(&self, job_id: Uuid) -> StoreResult<Vec<Application>> {
        let tables = self.tables.read().map_err(lock_err)?;
        let mut rows: Vec<Application> = tables
            .applications
            .values()
            .filter(|a| a.job_id == job_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(rows)
    }

    async fn count_accounts(
        &self,
        role: Option<Role>,
        active_only: bool,
        since: Option<DateTime<Utc>>,
    ) -> StoreResult<i64> {
        let tables = self.tables.read().map_err(lock_err)?;
        Ok(tables
            .accounts
            .values()
            .filter(|a| role.map(|r| a.role == r).unwrap_or(true))
            .filter(|a| !active_only || a.is_active)
            .filter(|a| since.map(|s| a.created_at >= s).unwrap_or(true))
            .count() as i64)
    }

    async fn count_jobs(
        &self,
        active_only: bool,
        since: Option<DateTime<Utc>>,
    ) -> StoreResult<i64> {
        let tables = self.tables.read().map_err(lock_err)?;
        Ok(tables
            .jobs
            .values()
            .filter(|j| !active_only || j.lifecycle.is_active())
            .filter(|j| since.map(|s| j.posted_date >= s).unwrap_or(true))
            .count() as i64)
    }

    async fn count_applications(&self, since: Option<DateTime<Utc>>) -> StoreResult<i64> {
        let tables = self.tables.read().map_err(lock_err)?;
        Ok(tables
            .applications
            .values()
            .filter(|a| since.map(|s| a.submitted_at >= s).unwrap_or(true))
            .count() as i64)
    }

    async fn recent_accounts(&self, limit: i64) -> StoreResult<Vec<Account>> {
        let mut accounts = self.list_accounts().await?;
        accounts.truncate(limit.max(0) as usize);
        Ok(accounts)
    }

    async fn recent_jobs_with_counts(
        &self,
        limit: i64,
    ) -> StoreResult<Vec<(JobPosting, i64)>> {
        let tables = self.tables.read().map_err(lock_err)?;
        let mut rows: Vec<(JobPosting, i64)> = tables
            .jobs
            .values()
            .map(|j| {
                let count = tables
                    .applications
                    .values()
                    .filter(|a| a.job_id == j.id)
                    .count() as i64;
                (j.clone(), count)
            })
            .collect();
        rows.sort_by(|a, b| b.0.posted_date.cmp(&a.0.posted_date));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn recent_applications(
        &self,
        limit: i64,
    ) -> StoreResult<Vec<(Application, JobPosting)>> {
        let tables = self.tables.read().map_err(lock_err)?;
        let mut rows: Vec<(Application, JobPosting)> = tables
            .applications
            .values()
            .filter_map(|a| tables.jobs.get(&a.job_id).map(|j| (a.clone(), j.clone())))
            .collect();
        rows.sort_by(|a, b| b.0.submitted_at.cmp(&a.0.submitted_at));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn top_employers(&self, n: i64) -> StoreResult<Vec<EmployerRank>> {
        let tables = self.tables.read().map_err(lock_err)?;
        let mut ranks: Vec<EmployerRank> = tables
            .accounts
            .values()
            .filter(|a| a.role == Role::Employer)
            .map(|employer| {
                let jobs: Vec<&JobPosting> = tables
                    .jobs
                    .values()
                    .filter(|j| j.employer_id == employer.id)
                    .collect();
                let application_count = tables
                    .applications
                    .values()
                    .filter(|a| jobs.iter().any(|j| j.id == a.job_id))
                    .count() as i64;
                let mut company_names: Vec<String> = jobs
                    .iter()
                    .map(|j| j.company_name.clone())
                    .filter(|c| !c.is_empty())
                    .collect();
                company_names.sort();
                company_names.dedup();
                EmployerRank {
                    username: employer.username.clone(),
                    company_names,
                    job_count: jobs.len() as i64,
                    application_count,
                }
            })
            .filter(|r| r.job_count > 0)
            .collect();
        ranks.sort_by(|a, b| b.job_count.cmp(&a.job_count).then(a.username.cmp(&b.username)));
        ranks.truncate(n.max(0) as usize);
        Ok(ranks)
    }

    async fn top_seekers(&self, n: i64) -> StoreResult<Vec<SeekerRank>> {
        let tables = self.tables.read().map_err(lock_err)?;
        let mut ranks: Vec<SeekerRank> = tables
            .accounts
            .values()
            .filter(|a| a.role == Role::Seeker)
            .map(|seeker| {
                let apps: Vec<&Application> = tables
                    .applications
                    .values()
                    .filter(|a| a.seeker_id == seeker.id)
                    .collect();
                let accepted = apps
                    .iter()
                    .filter(|a| a.status == ApplicationStatus::Accepted)
                    .count() as i64;
                SeekerRank {
                    username: seeker.username.clone(),
                    application_count: apps.len() as i64,
                    accepted_count: accepted,
                }
            })
            .filter(|r| r.application_count > 0)
            .collect();
        ranks.sort_by(|a, b| {
            b.application_count
                .cmp(&a.application_count)
                .then(a.username.cmp(&b.username))
        });
        ranks.truncate(n.max(0) as usize);
        Ok(ranks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AdminPermissions, ApplicationForm, Lifecycle, RequirementFlags};

    fn new_account(username: &str, role: Role) -> NewAccount {
        NewAccount {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: "hash".to_string(),
            role,
            full_name: None,
            permissions: AdminPermissions::default(),
            created_by: None,
        }
    }

    fn published_job(employer_id: Uuid, title: &str) -> JobPosting {
        let now = Utc::now();
        JobPosting {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: "desc".to_string(),
            employer_id,
            company_name: "Acme".to_string(),
            location: "Remote".to_string(),
            salary_range: None,
            job_type: "full-time".to_string(),
            lifecycle: Lifecycle::Published {
                published_at: now,
                active: true,
            },
            requirements: RequirementFlags::default(),
            posted_date: now,
            draft_saved_at: now,
        }
    }

    fn pending_application(job_id: Uuid, seeker_id: Uuid) -> Application {
        Application {
            id: Uuid::new_v4(),
            job_id,
            seeker_id,
            submitted_at: Utc::now(),
            status: ApplicationStatus::Pending,
            form: ApplicationForm {
                full_name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
                ..ApplicationForm::default()
            },
            resume_filename: None,
            reviewed_at: None,
            review_notes: None,
        }
    }

    #[tokio::test]
    async fn duplicate_username_and_email_rejected() {
        let store = MemStore::new();
        store
            .insert_account(new_account("alice", Role::Seeker))
            .await
            .unwrap();

        let err = store
            .insert_account(new_account("alice", Role::Seeker))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateUsername));

        let mut clash = new_account("alice2", Role::Seeker);
        clash.email = "alice@example.com".to_string();
        let err = store.insert_account(clash).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
    }

    #[tokio::test]
    async fn duplicate_application_pair_rejected() {
        let store = MemStore::new();
        let employer = store
            .insert_account(new_account("bob", Role::Employer))
            .await
            .unwrap();
        let seeker = store
            .insert_account(new_account("alice", Role::Seeker))
            .await
            .unwrap();
        let job = published_job(employer.id, "Engineer");
        store.insert_job(&job).await.unwrap();

        store
            .insert_application(&pending_application(job.id, seeker.id))
            .await
            .unwrap();
        let err = store
            .insert_application(&pending_application(job.id, seeker.id))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateApplication));
    }

    #[tokio::test]
    async fn deleting_job_cascades_to_applications() {
        let store = MemStore::new();
        let employer = store
            .insert_account(new_account("bob", Role::Employer))
            .await
            .unwrap();
        let seeker = store
            .insert_account(new_account("alice", Role::Seeker))
            .await
            .unwrap();
        let job = published_job(employer.id, "Engineer");
        store.insert_job(&job).await.unwrap();
        store
            .insert_application(&pending_application(job.id, seeker.id))
            .await
            .unwrap();

        store.delete_job(job.id).await.unwrap();
        assert_eq!(
            store.applications_for_seeker(seeker.id).await.unwrap().len(),
            0
        );
        assert_eq!(store.count_applications(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn search_excludes_drafts_and_matches_all_fields() {
        let store = MemStore::new();
        let employer = store
            .insert_account(new_account("bob", Role::Employer))
            .await
            .unwrap();

        let mut draft = published_job(employer.id, "Rust Engineer");
        draft.lifecycle = Lifecycle::Draft;
        store.insert_job(&draft).await.unwrap();

        let live = published_job(employer.id, "Backend Developer");
        store.insert_job(&live).await.unwrap();

        assert!(store.search_jobs("rust").await.unwrap().is_empty());
        assert_eq!(store.search_jobs("ACME").await.unwrap().len(), 1);
        assert_eq!(store.search_jobs("backend").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn top_seekers_ranks_by_volume() {
        let store = MemStore::new();
        let employer = store
            .insert_account(new_account("bob", Role::Employer))
            .await
            .unwrap();
        let alice = store
            .insert_account(new_account("alice", Role::Seeker))
            .await
            .unwrap();
        let carol = store
            .insert_account(new_account("carol", Role::Seeker))
            .await
            .unwrap();

        for title in ["A", "B"] {
            let job = published_job(employer.id, title);
            store.insert_job(&job).await.unwrap();
            let mut app = pending_application(job.id, alice.id);
            if title == "A" {
                app.status = ApplicationStatus::Accepted;
            }
            store.insert_application(&app).await.unwrap();
            if title == "A" {
                store
                    .insert_application(&pending_application(job.id, carol.id))
                    .await
                    .unwrap();
            }
        }

        let ranks = store.top_seekers(10).await.unwrap();
        assert_eq!(ranks.len(), 2);
        assert_eq!(ranks[0].username, "alice");
        assert_eq!(ranks[0].application_count, 2);
        assert_eq!(ranks[0].accepted_count, 1);
    }
}
