use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::service;
use crate::auth::sessions::CurrentUser;
use crate::errors::AppError;
use crate::models::user::ProfileUpdate;
use crate::models::{Account, AdminPermissions};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub role: String,
    #[serde(default)]
    pub terms: bool,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub token: Uuid,
    pub user: Account,
}

/// POST /register
/// Creates the account and establishes a session immediately.
pub async fn handle_register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    if !req.terms {
        return Err(AppError::Validation(
            "the terms must be accepted".to_string(),
        ));
    }
    if req.password != req.confirm_password {
        return Err(AppError::Validation("passwords do not match".to_string()));
    }

    let user = service::register(
        state.store.as_ref(),
        &req.username,
        &req.email,
        &req.password,
        &req.role,
    )
    .await?;
    let token = state.sessions.create(&user, state.config.session_ttl_secs);
    Ok(Json(AuthResponse { token, user }))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    /// Username or email.
    pub identifier: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

/// POST /login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = service::authenticate(state.store.as_ref(), &req.identifier, &req.password).await?;
    let ttl = if req.remember_me {
        state.config.remember_me_ttl_secs
    } else {
        state.config.session_ttl_secs
    };
    let token = state.sessions.create(&user, ttl);
    Ok(Json(AuthResponse { token, user }))
}

/// GET /logout
pub async fn handle_logout(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Json<Value> {
    state.sessions.destroy(user.token);
    Json(json!({ "status": "logged_out" }))
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// POST /forgot_password
/// Responds identically whether or not the email is registered.
pub async fn handle_forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Json<Value>, AppError> {
    service::issue_reset_token(state.store.as_ref(), state.mailer.as_ref(), &req.email).await?;
    Ok(Json(json!({
        "status": "ok",
        "message": "If that email is registered, a reset link has been sent."
    })))
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub token: Uuid,
    pub new_password: String,
}

/// POST /reset_password
pub async fn handle_reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<Value>, AppError> {
    service::consume_reset_token(state.store.as_ref(), req.token, &req.new_password).await?;
    Ok(Json(json!({ "status": "password_updated" })))
}

/// GET /profile
pub async fn handle_profile(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Value>, AppError> {
    let account = state
        .store
        .account_by_id(user.id())
        .await?
        .ok_or(AppError::NotAuthenticated)?;
    let completion = account.profile_completion();
    Ok(Json(json!({
        "user": account,
        "role_display": account.role.display_name(),
        "profile_completion": completion,
    })))
}

/// POST /profile/edit
pub async fn handle_edit_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<Account>, AppError> {
    let account = service::update_profile(state.store.as_ref(), user.id(), update).await?;
    Ok(Json(account))
}

/// GET /dashboard
/// Tells the client which role-specific dashboard to load.
pub async fn handle_dashboard_dispatch(user: CurrentUser) -> Json<Value> {
    let dashboard = match user.role() {
        crate::models::Role::Seeker => "/seeker_dashboard",
        crate::models::Role::Employer => "/employer_dashboard",
        crate::models::Role::Admin => "/admin_dashboard",
    };
    Json(json!({ "role": user.role(), "dashboard": dashboard }))
}

#[derive(Deserialize)]
pub struct CreateAdminRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub permissions: AdminPermissions,
}

/// POST /admin/create_admin
pub async fn handle_create_admin(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateAdminRequest>,
) -> Result<Json<Account>, AppError> {
    let actor = user
        .require_admin_permission(&state, |p| p.manage_users)
        .await?;
    let admin = service::create_admin(
        state.store.as_ref(),
        &req.username,
        &req.email,
        &req.password,
        req.full_name,
        req.permissions,
        actor.id,
    )
    .await?;
    Ok(Json(admin))
}

/// GET /admin/users
pub async fn handle_list_users(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Value>, AppError> {
    user.require_admin_permission(&state, |p| p.manage_users)
        .await?;
    let users = state.store.list_accounts().await?;
    Ok(Json(json!({ "count": users.len(), "users": users })))
}

/// POST /admin/users/:id/toggle_active
/// Admins cannot deactivate themselves; revoking the last working admin
/// session this way would lock the panel.
pub async fn handle_toggle_user_active(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(account_id): Path<Uuid>,
) -> Result<Json<Account>, AppError> {
    user.require_admin_permission(&state, |p| p.manage_users)
        .await?;
    if account_id == user.id() {
        return Err(AppError::Validation(
            "cannot change your own active status".to_string(),
        ));
    }
    let current = state
        .store
        .account_by_id(account_id)
        .await?
        .ok_or_else(|| AppError::NotFound("account".to_string()))?;
    let account =
        service::set_account_active(state.store.as_ref(), account_id, !current.is_active).await?;
    Ok(Json(account))
}
