//! Application submission and review. One application per (job, seeker)
//! pair; the store's unique constraint is the real guarantee, the
//! pre-check here only gives a friendlier early error.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::applications::upload::UploadStore;
use crate::errors::AppError;
use crate::models::{Account, Application, ApplicationForm, ApplicationStatus, Role};
use crate::store::{Store, StoreError};

/// A resume file as received from the client.
pub struct ResumeUpload {
    pub original_name: String,
    pub content: Vec<u8>,
}

/// Submits an application to a published posting.
pub async fn apply(
    store: &dyn Store,
    uploads: &UploadStore,
    actor: &Account,
    job_id: Uuid,
    form: ApplicationForm,
    resume: Option<ResumeUpload>,
) -> Result<Application, AppError> {
    if actor.role != Role::Seeker {
        return Err(AppError::NotEligible);
    }
    let job = store
        .job_by_id(job_id)
        .await?
        .ok_or_else(|| AppError::NotFound("job".to_string()))?;
    if !job.lifecycle.is_active() {
        return Err(AppError::NotEligible);
    }
    if store.application_exists(job_id, actor.id).await? {
        return Err(AppError::DuplicateApplication);
    }
    if form.full_name.trim().is_empty() || form.email.trim().is_empty() {
        return Err(AppError::Validation(
            "full name and email are required".to_string(),
        ));
    }

    let resume_filename = match resume {
        Some(upload) => Some(
            uploads
                .save_resume(&upload.original_name, &upload.content)
                .await?,
        ),
        None => None,
    };

    let application = Application {
        id: Uuid::new_v4(),
        job_id,
        seeker_id: actor.id,
        submitted_at: Utc::now(),
        status: ApplicationStatus::Pending,
        form,
        resume_filename,
        reviewed_at: None,
        review_notes: None,
    };

    if let Err(err) = store.insert_application(&application).await {
        // The saved file stays behind as debris; the row never landed, so
        // no duplicate path opens up.
        if let Some(name) = &application.resume_filename {
            warn!("orphaned resume upload {name} after failed submission");
        }
        return Err(match err {
            StoreError::DuplicateApplication => AppError::DuplicateApplication,
            other => {
                tracing::error!("application insert failed: {other}");
                AppError::SubmissionFailed
            }
        });
    }

    info!(
        "application {} submitted by {} for job {}",
        application.id, actor.username, job_id
    );
    Ok(application)
}

/// Moves an application through the review pipeline. Allowed for the
/// employer owning the parent posting and for managing admins.
pub async fn update_status(
    store: &dyn Store,
    actor: &Account,
    application_id: Uuid,
    new_status: &str,
    notes: Option<String>,
) -> Result<Application, AppError> {
    let status = ApplicationStatus::parse(new_status)
        .ok_or_else(|| AppError::InvalidStatus(new_status.to_string()))?;

    let mut application = store
        .application_by_id(application_id)
        .await?
        .ok_or_else(|| AppError::NotFound("application".to_string()))?;
    let job = store
        .job_by_id(application.job_id)
        .await?
        .ok_or_else(|| AppError::NotFound("job".to_string()))?;

    let allowed = match actor.role {
        Role::Employer => job.employer_id == actor.id,
        Role::Admin => actor.permissions.manage_applications,
        Role::Seeker => false,
    };
    if !allowed {
        return Err(AppError::Forbidden);
    }

    application.status = status;
    application.reviewed_at = Some(Utc::now());
    application.review_notes = notes.filter(|n| !n.trim().is_empty());
    store.update_application(&application).await?;

    info!(
        "application {} set to {} by {}",
        application.id,
        status.as_str(),
        actor.username
    );
    Ok(application)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::service::register;
    use crate::jobs::lifecycle;
    use crate::models::{JobFields, JobPosting, RequirementFlags};
    use crate::store::MemStore;

    async fn seeker(store: &MemStore, name: &str) -> Account {
        register(store, name, &format!("{name}@x.com"), "secret1", "seeker")
            .await
            .unwrap()
    }

    async fn employer(store: &MemStore, name: &str) -> Account {
        register(store, name, &format!("{name}@x.com"), "secret1", "employer")
            .await
            .unwrap()
    }

    async fn published_job(store: &MemStore, owner: &Account) -> JobPosting {
        lifecycle::create(
            store,
            owner,
            JobFields {
                title: "Engineer".to_string(),
                description: "Build".to_string(),
                company_name: "Acme".to_string(),
                location: "Remote".to_string(),
                salary_range: None,
                job_type: "full-time".to_string(),
                requirements: RequirementFlags::default(),
            },
            true,
        )
        .await
        .unwrap()
    }

    fn form(name: &str) -> ApplicationForm {
        ApplicationForm {
            full_name: name.to_string(),
            email: format!("{}@x.com", name.to_lowercase()),
            terms_accepted: true,
            data_consent: true,
            ..ApplicationForm::default()
        }
    }

    fn uploads() -> (tempfile::TempDir, UploadStore) {
        let tmp = tempfile::tempdir().unwrap();
        let store = UploadStore::new(tmp.path());
        (tmp, store)
    }

    #[tokio::test]
    async fn submission_lands_as_pending() {
        let store = MemStore::new();
        let (_tmp, uploads) = uploads();
        let bob = employer(&store, "bob").await;
        let alice = seeker(&store, "alice").await;
        let job = published_job(&store, &bob).await;

        let application = apply(&store, &uploads, &alice, job.id, form("Alice"), None)
            .await
            .unwrap();
        assert_eq!(application.status, ApplicationStatus::Pending);
        assert_eq!(application.seeker_id, alice.id);
        assert!(application.resume_filename.is_none());
    }

    #[tokio::test]
    async fn second_application_for_same_pair_is_rejected() {
        let store = MemStore::new();
        let (_tmp, uploads) = uploads();
        let bob = employer(&store, "bob").await;
        let alice = seeker(&store, "alice").await;
        let job = published_job(&store, &bob).await;

        apply(&store, &uploads, &alice, job.id, form("Alice"), None)
            .await
            .unwrap();
        let err = apply(&store, &uploads, &alice, job.id, form("Alice"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateApplication));
    }

    #[tokio::test]
    async fn only_seekers_can_apply_and_only_to_live_postings() {
        let store = MemStore::new();
        let (_tmp, uploads) = uploads();
        let bob = employer(&store, "bob").await;
        let carol = employer(&store, "carol").await;
        let alice = seeker(&store, "alice").await;
        let job = published_job(&store, &bob).await;

        let err = apply(&store, &uploads, &carol, job.id, form("Carol"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotEligible));

        let draft = lifecycle::create(
            &store,
            &bob,
            JobFields {
                title: "Draft role".to_string(),
                description: String::new(),
                company_name: String::new(),
                location: String::new(),
                salary_range: None,
                job_type: "full-time".to_string(),
                requirements: RequirementFlags::default(),
            },
            false,
        )
        .await
        .unwrap();
        let err = apply(&store, &uploads, &alice, draft.id, form("Alice"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotEligible));
    }

    #[tokio::test]
    async fn resume_is_stored_under_generated_name() {
        let store = MemStore::new();
        let (_tmp, uploads) = uploads();
        let bob = employer(&store, "bob").await;
        let alice = seeker(&store, "alice").await;
        let job = published_job(&store, &bob).await;

        let application = apply(
            &store,
            &uploads,
            &alice,
            job.id,
            form("Alice"),
            Some(ResumeUpload {
                original_name: "my resume.pdf".to_string(),
                content: b"pdf bytes".to_vec(),
            }),
        )
        .await
        .unwrap();

        let name = application.resume_filename.unwrap();
        assert!(name.ends_with(".pdf"));
        assert_ne!(name, "my resume.pdf");
    }

    #[tokio::test]
    async fn owner_updates_status_other_employer_is_forbidden() {
        let store = MemStore::new();
        let (_tmp, uploads) = uploads();
        let bob = employer(&store, "bob").await;
        let carol = employer(&store, "carol").await;
        let alice = seeker(&store, "alice").await;
        let job = published_job(&store, &bob).await;
        let application = apply(&store, &uploads, &alice, job.id, form("Alice"), None)
            .await
            .unwrap();

        let accepted = update_status(
            &store,
            &bob,
            application.id,
            "accepted",
            Some("Strong fit".to_string()),
        )
        .await
        .unwrap();
        assert_eq!(accepted.status, ApplicationStatus::Accepted);
        assert!(accepted.reviewed_at.is_some());
        assert_eq!(accepted.review_notes.as_deref(), Some("Strong fit"));

        let err = update_status(&store, &carol, application.id, "rejected", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));

        let err = update_status(&store, &alice, application.id, "rejected", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }

    #[tokio::test]
    async fn unknown_status_is_rejected_before_any_lookup() {
        let store = MemStore::new();
        let bob = employer(&store, "bob").await;
        let err = update_status(&store, &bob, Uuid::new_v4(), "archived", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidStatus(_)));
    }
}
