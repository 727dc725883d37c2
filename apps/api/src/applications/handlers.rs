use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::applications::pipeline::{self, ResumeUpload};
use crate::auth::sessions::CurrentUser;
use crate::errors::AppError;
use crate::models::{Application, ApplicationForm, Role};
use crate::state::AppState;

/// GET /apply/:job_id
/// Describes the application form for a posting, driven by its
/// requirement flags.
pub async fn handle_application_form(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(job_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::Seeker)?;
    let job = state
        .store
        .job_by_id(job_id)
        .await?
        .ok_or_else(|| AppError::NotFound("job".to_string()))?;
    if !job.lifecycle.is_active() {
        return Err(AppError::NotEligible);
    }
    let already_applied = state.store.application_exists(job_id, user.id()).await?;
    Ok(Json(json!({
        "job": job,
        "requirements": job.requirements,
        "already_applied": already_applied,
    })))
}

/// POST /submit_application/:job_id
/// Multipart form: text fields mirror [`ApplicationForm`], plus an optional
/// `resume` file part.
pub async fn handle_submit_application(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(job_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<Application>, AppError> {
    let actor = user.account(&state).await?;

    let mut fields = Map::new();
    let mut resume = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("malformed form: {e}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if name == "resume" {
            let original_name = field.file_name().unwrap_or("resume").to_string();
            let content = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("bad resume upload: {e}")))?;
            if !content.is_empty() {
                resume = Some(ResumeUpload {
                    original_name,
                    content: content.to_vec(),
                });
            }
        } else {
            let text = field
                .text()
                .await
                .map_err(|e| AppError::Validation(format!("bad field {name}: {e}")))?;
            fields.insert(name.clone(), coerce_field(&name, text));
        }
    }

    let form: ApplicationForm = serde_json::from_value(Value::Object(fields))
        .map_err(|e| AppError::Validation(format!("invalid application form: {e}")))?;

    let application = pipeline::apply(
        state.store.as_ref(),
        &state.uploads,
        &actor,
        job_id,
        form,
        resume,
    )
    .await?;
    Ok(Json(application))
}

// Multipart carries everything as text; numeric and checkbox fields are
// coerced before deserialization. Empty strings mean "not provided".
fn coerce_field(name: &str, text: String) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    match name {
        "years_experience" | "graduation_year" => text
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or(Value::String(text)),
        "willing_to_relocate" | "willing_to_travel" | "terms_accepted" | "data_consent" => {
            Value::Bool(matches!(text.as_str(), "true" | "on" | "1" | "yes"))
        }
        _ => Value::String(text),
    }
}

/// GET /my_applications
pub async fn handle_my_applications(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::Seeker)?;
    let rows = state.store.applications_for_seeker(user.id()).await?;
    let applications: Vec<Value> = rows
        .into_iter()
        .map(|(application, job)| json!({ "application": application, "job": job }))
        .collect();
    Ok(Json(json!({ "applications": applications })))
}

/// GET /jobs/:id/applications
/// Review listing for the posting owner or a managing admin.
pub async fn handle_job_applications(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(job_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let actor = user.account(&state).await?;
    let job = state
        .store
        .job_by_id(job_id)
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
    let applications = state.store.applications_for_job(job_id).await?;
    Ok(Json(json!({
        "job": job,
        "count": applications.len(),
        "applications": applications,
    })))
}

#[derive(Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// POST /applications/:id/status
pub async fn handle_update_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(application_id): Path<Uuid>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<Json<Application>, AppError> {
    let actor = user.account(&state).await?;
    let application = pipeline::update_status(
        state.store.as_ref(),
        &actor,
        application_id,
        &req.status,
        req.notes,
    )
    .await?;
    Ok(Json(application))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkbox_and_numeric_fields_are_coerced() {
        assert_eq!(coerce_field("terms_accepted", "on".to_string()), json!(true));
        assert_eq!(
            coerce_field("willing_to_travel", "false".to_string()),
            json!(false)
        );
        assert_eq!(coerce_field("years_experience", "7".to_string()), json!(7));
        assert_eq!(
            coerce_field("full_name", "Alice".to_string()),
            json!("Alice")
        );
        assert_eq!(coerce_field("phone", String::new()), Value::Null);
    }

    #[test]
    fn coerced_fields_deserialize_into_a_form() {
        let mut fields = Map::new();
        fields.insert("full_name".into(), coerce_field("full_name", "Alice".into()));
        fields.insert("email".into(), coerce_field("email", "alice@x.com".into()));
        fields.insert(
            "years_experience".into(),
            coerce_field("years_experience", "3".into()),
        );
        fields.insert(
            "terms_accepted".into(),
            coerce_field("terms_accepted", "on".into()),
        );
        fields.insert(
            "availability_date".into(),
            coerce_field("availability_date", "2026-09-01".into()),
        );

        let form: ApplicationForm = serde_json::from_value(Value::Object(fields)).unwrap();
        assert_eq!(form.full_name, "Alice");
        assert_eq!(form.years_experience, Some(3));
        assert!(form.terms_accepted);
        assert_eq!(
            form.availability_date.unwrap().to_string(),
            "2026-09-01"
        );
    }
}
