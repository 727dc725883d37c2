//! Posting lifecycle: drafts, publication, visibility toggling, deletion
//! and search. A posting is published at most once; `published_at` never
//! moves after the first Draft→Published transition.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Account, JobFields, JobPosting, Lifecycle, Role};
use crate::store::Store;

/// First publish-mandatory field that is empty, if any.
fn missing_for_publish(job: &JobPosting) -> Option<&'static str> {
    if job.title.trim().is_empty() {
        Some("title")
    } else if job.description.trim().is_empty() {
        Some("description")
    } else if job.company_name.trim().is_empty() {
        Some("company name")
    } else if job.location.trim().is_empty() {
        Some("location")
    } else {
        None
    }
}

fn check_publishable(job: &JobPosting) -> Result<(), AppError> {
    match missing_for_publish(job) {
        Some(field) => Err(AppError::IncompleteForPublish(field)),
        None => Ok(()),
    }
}

/// Owner-employer or managing admin. Non-owner employers get `NotFound`
/// rather than `Forbidden` so they cannot probe which postings exist.
fn authorize_mutation(actor: &Account, job: &JobPosting) -> Result<(), AppError> {
    match actor.role {
        Role::Employer if job.employer_id == actor.id => Ok(()),
        Role::Employer => Err(AppError::NotFound("job".to_string())),
        Role::Admin if actor.permissions.manage_jobs => Ok(()),
        _ => Err(AppError::Forbidden),
    }
}

/// Creates a posting, either as a draft or published immediately.
pub async fn create(
    store: &dyn Store,
    actor: &Account,
    fields: JobFields,
    publish: bool,
) -> Result<JobPosting, AppError> {
    if actor.role != Role::Employer {
        return Err(AppError::Forbidden);
    }
    if fields.title.trim().is_empty() {
        return Err(AppError::MissingTitle);
    }

    let now = Utc::now();
    let job = JobPosting {
        id: Uuid::new_v4(),
        title: fields.title.trim().to_string(),
        description: fields.description.trim().to_string(),
        employer_id: actor.id,
        company_name: fields.company_name.trim().to_string(),
        location: fields.location.trim().to_string(),
        salary_range: fields.salary_range.filter(|s| !s.trim().is_empty()),
        job_type: fields.job_type,
        lifecycle: if publish {
            Lifecycle::Published {
                published_at: now,
                active: true,
            }
        } else {
            Lifecycle::Draft
        },
        requirements: fields.requirements,
        posted_date: now,
        draft_saved_at: now,
    };
    if publish {
        check_publishable(&job)?;
    }

    store.insert_job(&job).await?;
    info!(
        "job {} created by {} ({})",
        job.id,
        actor.username,
        if publish { "published" } else { "draft" }
    );
    Ok(job)
}

/// Edits a posting in place. Publishing through an edit stamps
/// `published_at` only when the posting was still a draft; deactivating a
/// published posting keeps it published but hidden.
pub async fn edit(
    store: &dyn Store,
    actor: &Account,
    job_id: Uuid,
    fields: JobFields,
    make_active: bool,
) -> Result<JobPosting, AppError> {
    let mut job = store
        .job_by_id(job_id)
        .await?
        .ok_or_else(|| AppError::NotFound("job".to_string()))?;
    authorize_mutation(actor, &job)?;

    if fields.title.trim().is_empty() {
        return Err(AppError::MissingTitle);
    }
    job.title = fields.title.trim().to_string();
    job.description = fields.description.trim().to_string();
    job.company_name = fields.company_name.trim().to_string();
    job.location = fields.location.trim().to_string();
    job.salary_range = fields.salary_range.filter(|s| !s.trim().is_empty());
    job.job_type = fields.job_type;
    job.requirements = fields.requirements;

    job.lifecycle = match (job.lifecycle, make_active) {
        (Lifecycle::Draft, false) => Lifecycle::Draft,
        (Lifecycle::Draft, true) => Lifecycle::Published {
            published_at: Utc::now(),
            active: true,
        },
        (Lifecycle::Published { published_at, .. }, active) => Lifecycle::Published {
            published_at,
            active,
        },
    };
    if !job.lifecycle.is_draft() {
        check_publishable(&job)?;
    }
    job.draft_saved_at = Utc::now();

    store.update_job(&job).await?;
    Ok(job)
}

/// Explicit Draft→Published transition. Only drafts qualify; a published
/// posting is simply not found by this operation.
pub async fn publish(
    store: &dyn Store,
    actor: &Account,
    job_id: Uuid,
) -> Result<JobPosting, AppError> {
    let mut job = store
        .job_by_id(job_id)
        .await?
        .ok_or_else(|| AppError::NotFound("draft job".to_string()))?;
    authorize_mutation(actor, &job)?;
    if !job.lifecycle.is_draft() {
        return Err(AppError::NotFound("draft job".to_string()));
    }
    check_publishable(&job)?;

    job.lifecycle = Lifecycle::Published {
        published_at: Utc::now(),
        active: true,
    };
    store.update_job(&job).await?;
    info!("job {} published by {}", job.id, actor.username);
    Ok(job)
}

/// Admin visibility toggle. Toggling a draft counts as its first publish.
pub async fn toggle_active(
    store: &dyn Store,
    actor: &Account,
    job_id: Uuid,
) -> Result<JobPosting, AppError> {
    if actor.role != Role::Admin || !actor.permissions.manage_jobs {
        return Err(AppError::Forbidden);
    }
    let mut job = store
        .job_by_id(job_id)
        .await?
        .ok_or_else(|| AppError::NotFound("job".to_string()))?;

    job.lifecycle = match job.lifecycle {
        Lifecycle::Draft => Lifecycle::Published {
            published_at: Utc::now(),
            active: true,
        },
        Lifecycle::Published {
            published_at,
            active,
        } => Lifecycle::Published {
            published_at,
            active: !active,
        },
    };
    store.update_job(&job).await?;
    Ok(job)
}

/// Deletes a posting and, through the store cascade, its applications.
pub async fn delete(store: &dyn Store, actor: &Account, job_id: Uuid) -> Result<(), AppError> {
    let job = store
        .job_by_id(job_id)
        .await?
        .ok_or_else(|| AppError::NotFound("job".to_string()))?;
    authorize_mutation(actor, &job)?;

    store.delete_job(job_id).await?;
    info!("job {} deleted by {}", job_id, actor.username);
    Ok(())
}

/// Keyword search over published+active postings. Blank keywords match
/// nothing rather than everything.
pub async fn search(store: &dyn Store, keyword: &str) -> Result<Vec<JobPosting>, AppError> {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return Ok(Vec::new());
    }
    Ok(store.search_jobs(keyword).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::service::register;
    use crate::models::RequirementFlags;
    use crate::store::MemStore;

    async fn employer(store: &MemStore, name: &str) -> Account {
        register(store, name, &format!("{name}@x.com"), "secret1", "employer")
            .await
            .unwrap()
    }

    async fn seeker(store: &MemStore, name: &str) -> Account {
        register(store, name, &format!("{name}@x.com"), "secret1", "seeker")
            .await
            .unwrap()
    }

    fn admin(manage_jobs: bool) -> Account {
        let mut account = Account {
            id: Uuid::new_v4(),
            username: "root".to_string(),
            email: "root@x.com".to_string(),
            password_hash: "hash".to_string(),
            role: Role::Admin,
            is_active: true,
            full_name: None,
            phone: None,
            location: None,
            bio: None,
            permissions: crate::models::AdminPermissions::default(),
            created_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login: None,
            reset_token: None,
            reset_token_expires: None,
        };
        account.permissions.manage_jobs = manage_jobs;
        account
    }

    fn fields(title: &str) -> JobFields {
        JobFields {
            title: title.to_string(),
            description: String::new(),
            company_name: String::new(),
            location: String::new(),
            salary_range: None,
            job_type: "full-time".to_string(),
            requirements: RequirementFlags::default(),
        }
    }

    fn complete_fields(title: &str) -> JobFields {
        JobFields {
            description: "We build things".to_string(),
            company_name: "Acme".to_string(),
            location: "Remote".to_string(),
            ..fields(title)
        }
    }

    #[tokio::test]
    async fn draft_needs_only_a_title() {
        let store = MemStore::new();
        let bob = employer(&store, "bob").await;

        let job = create(&store, &bob, fields("Engineer"), false).await.unwrap();
        assert!(job.lifecycle.is_draft());
        assert!(!job.lifecycle.is_active());
        assert!(job.lifecycle.published_at().is_none());
    }

    #[tokio::test]
    async fn title_is_required_even_for_drafts() {
        let store = MemStore::new();
        let bob = employer(&store, "bob").await;
        let err = create(&store, &bob, fields("   "), false).await.unwrap_err();
        assert!(matches!(err, AppError::MissingTitle));
    }

    #[tokio::test]
    async fn publishing_incomplete_draft_fails_and_stays_draft() {
        let store = MemStore::new();
        let bob = employer(&store, "bob").await;
        let job = create(&store, &bob, fields("Engineer"), false).await.unwrap();

        let err = publish(&store, &bob, job.id).await.unwrap_err();
        assert!(matches!(err, AppError::IncompleteForPublish(_)));
        let reloaded = store.job_by_id(job.id).await.unwrap().unwrap();
        assert!(reloaded.lifecycle.is_draft());
    }

    #[tokio::test]
    async fn direct_publish_requires_all_fields() {
        let store = MemStore::new();
        let bob = employer(&store, "bob").await;

        let err = create(&store, &bob, fields("Engineer"), true).await.unwrap_err();
        assert!(matches!(err, AppError::IncompleteForPublish("description")));

        let job = create(&store, &bob, complete_fields("Engineer"), true)
            .await
            .unwrap();
        assert!(job.lifecycle.is_active());
        assert!(job.lifecycle.published_at().is_some());
    }

    #[tokio::test]
    async fn published_at_is_set_exactly_once() {
        let store = MemStore::new();
        let bob = employer(&store, "bob").await;
        let job = create(&store, &bob, complete_fields("Engineer"), false)
            .await
            .unwrap();

        let published = publish(&store, &bob, job.id).await.unwrap();
        let first = published.lifecycle.published_at().unwrap();

        // Deactivate then reactivate through edits; the timestamp holds.
        let hidden = edit(&store, &bob, job.id, complete_fields("Engineer v2"), false)
            .await
            .unwrap();
        assert!(!hidden.lifecycle.is_active());
        assert!(!hidden.lifecycle.is_draft());
        assert_eq!(hidden.lifecycle.published_at(), Some(first));

        let live = edit(&store, &bob, job.id, complete_fields("Engineer v3"), true)
            .await
            .unwrap();
        assert_eq!(live.lifecycle.published_at(), Some(first));
    }

    #[tokio::test]
    async fn publish_is_not_applicable_to_published_postings() {
        let store = MemStore::new();
        let bob = employer(&store, "bob").await;
        let job = create(&store, &bob, complete_fields("Engineer"), true)
            .await
            .unwrap();
        let err = publish(&store, &bob, job.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn other_employers_cannot_see_or_touch_the_posting() {
        let store = MemStore::new();
        let bob = employer(&store, "bob").await;
        let carol = employer(&store, "carol").await;
        let job = create(&store, &bob, complete_fields("Engineer"), true)
            .await
            .unwrap();

        let err = delete(&store, &carol, job.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        let err = edit(&store, &carol, job.id, complete_fields("Hijack"), true)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn seekers_cannot_create_or_mutate_postings() {
        let store = MemStore::new();
        let bob = employer(&store, "bob").await;
        let alice = seeker(&store, "alice").await;
        let job = create(&store, &bob, complete_fields("Engineer"), true)
            .await
            .unwrap();

        let err = create(&store, &alice, complete_fields("Fake"), true)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
        let err = delete(&store, &alice, job.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }

    #[tokio::test]
    async fn toggle_active_is_admin_only_and_publishes_drafts() {
        let store = MemStore::new();
        let bob = employer(&store, "bob").await;
        let job = create(&store, &bob, complete_fields("Engineer"), false)
            .await
            .unwrap();

        let err = toggle_active(&store, &bob, job.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
        let err = toggle_active(&store, &admin(false), job.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden));

        let published = toggle_active(&store, &admin(true), job.id).await.unwrap();
        assert!(published.lifecycle.is_active());
        let first = published.lifecycle.published_at().unwrap();

        let hidden = toggle_active(&store, &admin(true), job.id).await.unwrap();
        assert!(!hidden.lifecycle.is_active());
        assert_eq!(hidden.lifecycle.published_at(), Some(first));
    }

    #[tokio::test]
    async fn admin_with_manage_jobs_can_delete_any_posting() {
        let store = MemStore::new();
        let bob = employer(&store, "bob").await;
        let job = create(&store, &bob, complete_fields("Engineer"), true)
            .await
            .unwrap();
        delete(&store, &admin(true), job.id).await.unwrap();
        assert!(store.job_by_id(job.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn search_ignores_blank_keywords() {
        let store = MemStore::new();
        let bob = employer(&store, "bob").await;
        create(&store, &bob, complete_fields("Engineer"), true)
            .await
            .unwrap();
        assert!(search(&store, "   ").await.unwrap().is_empty());
        assert_eq!(search(&store, "engineer").await.unwrap().len(), 1);
    }
}
