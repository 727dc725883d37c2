//! Identity and credential management: registration, login, password
//! reset, profile edits, and admin account creation.

use chrono::{Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::passwords::{hash_password, verify_password};
use crate::errors::AppError;
use crate::mail::Mailer;
use crate::models::user::ProfileUpdate;
use crate::models::{Account, AdminPermissions, Role};
use crate::store::{NewAccount, Store};

const MIN_PASSWORD_LEN: usize = 6;
const RESET_TOKEN_TTL_HOURS: i64 = 1;

fn check_password_strength(password: &str) -> Result<(), AppError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::WeakCredential);
    }
    Ok(())
}

/// Creates a seeker or employer account. Admin accounts go through
/// [`create_admin`] instead.
pub async fn register(
    store: &dyn Store,
    username: &str,
    email: &str,
    password: &str,
    role_raw: &str,
) -> Result<Account, AppError> {
    let role = match Role::parse(role_raw) {
        Some(Role::Seeker) => Role::Seeker,
        Some(Role::Employer) => Role::Employer,
        _ => return Err(AppError::InvalidRole(role_raw.to_string())),
    };
    let username = username.trim();
    let email = email.trim();
    if username.is_empty() || email.is_empty() {
        return Err(AppError::Validation(
            "username and email are required".to_string(),
        ));
    }
    check_password_strength(password)?;

    let account = store
        .insert_account(NewAccount {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: hash_password(password)?,
            role,
            full_name: None,
            permissions: AdminPermissions::default(),
            created_by: None,
        })
        .await?;
    info!("registered {} account {}", role.as_str(), account.username);
    Ok(account)
}

/// Looks the account up by username or email and checks the password.
/// Missing account and wrong password produce the same error so callers
/// cannot probe for registered identifiers.
pub async fn authenticate(
    store: &dyn Store,
    identifier: &str,
    password: &str,
) -> Result<Account, AppError> {
    let account = store.account_by_identifier(identifier.trim()).await?;
    let mut account = match account {
        Some(a) if a.is_active => a,
        _ => {
            warn!("failed login for {identifier:?}");
            return Err(AppError::InvalidCredentials);
        }
    };
    if !verify_password(password, &account.password_hash) {
        warn!("failed login for {identifier:?}");
        return Err(AppError::InvalidCredentials);
    }

    account.last_login = Some(Utc::now());
    store.update_account(&account).await?;
    info!("login for {}", account.username);
    Ok(account)
}

/// Issues a password-reset token. Succeeds from the caller's perspective
/// whether or not the email is registered; only delivery failures surface,
/// and those as a generic error.
pub async fn issue_reset_token(
    store: &dyn Store,
    mailer: &dyn Mailer,
    email: &str,
) -> Result<(), AppError> {
    let Some(mut account) = store.account_by_identifier(email.trim()).await? else {
        info!("reset requested for unknown email");
        return Ok(());
    };

    let token = Uuid::new_v4();
    account.reset_token = Some(token);
    account.reset_token_expires = Some(Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS));
    store.update_account(&account).await?;

    mailer
        .send(
            &account.email,
            "Password reset",
            &format!(
                "A password reset was requested for your account.\n\
                 Your reset token is: {token}\n\
                 It expires in {RESET_TOKEN_TTL_HOURS} hour(s)."
            ),
        )
        .await
        .map_err(|e| {
            warn!("reset mail delivery failed: {e}");
            AppError::SubmissionFailed
        })?;
    Ok(())
}

/// Redeems a reset token: replaces the credential and clears the token so
/// it cannot be used twice.
pub async fn consume_reset_token(
    store: &dyn Store,
    token: Uuid,
    new_password: &str,
) -> Result<Account, AppError> {
    check_password_strength(new_password)?;

    let mut account = store
        .account_by_reset_token(token)
        .await?
        .ok_or(AppError::InvalidOrExpiredToken)?;
    match account.reset_token_expires {
        Some(expiry) if expiry > Utc::now() => {}
        _ => return Err(AppError::InvalidOrExpiredToken),
    }

    account.password_hash = hash_password(new_password)?;
    account.reset_token = None;
    account.reset_token_expires = None;
    account.updated_at = Utc::now();
    store.update_account(&account).await?;
    info!("password reset for {}", account.username);
    Ok(account)
}

/// Applies profile edits. Blank strings clear the optional fields.
pub async fn update_profile(
    store: &dyn Store,
    account_id: Uuid,
    update: ProfileUpdate,
) -> Result<Account, AppError> {
    let mut account = store
        .account_by_id(account_id)
        .await?
        .ok_or_else(|| AppError::NotFound("account".to_string()))?;

    let normalize = |value: Option<String>, current: &Option<String>| match value {
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        None => current.clone(),
    };
    account.full_name = normalize(update.full_name, &account.full_name);
    account.phone = normalize(update.phone, &account.phone);
    account.location = normalize(update.location, &account.location);
    account.bio = normalize(update.bio, &account.bio);
    account.updated_at = Utc::now();

    store.update_account(&account).await?;
    Ok(account)
}

/// Creates an admin account with an explicit permission set. The caller is
/// responsible for the `manage_users` gate.
pub async fn create_admin(
    store: &dyn Store,
    username: &str,
    email: &str,
    password: &str,
    full_name: Option<String>,
    permissions: AdminPermissions,
    created_by: Uuid,
) -> Result<Account, AppError> {
    let username = username.trim();
    let email = email.trim();
    if username.len() < 3 || username.len() > 80 {
        return Err(AppError::Validation(
            "username must be between 3 and 80 characters".to_string(),
        ));
    }
    if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        return Err(AppError::Validation("invalid email address".to_string()));
    }
    check_password_strength(password)?;
    if !permissions.any() {
        return Err(AppError::Validation(
            "at least one permission must be assigned".to_string(),
        ));
    }

    let account = store
        .insert_account(NewAccount {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: hash_password(password)?,
            role: Role::Admin,
            full_name,
            permissions,
            created_by: Some(created_by),
        })
        .await?;
    info!("admin {} created by {}", account.username, created_by);
    Ok(account)
}

/// Deactivates (never deletes) an account, or re-activates it.
pub async fn set_account_active(
    store: &dyn Store,
    account_id: Uuid,
    active: bool,
) -> Result<Account, AppError> {
    let mut account = store
        .account_by_id(account_id)
        .await?
        .ok_or_else(|| AppError::NotFound("account".to_string()))?;
    account.is_active = active;
    account.updated_at = Utc::now();
    store.update_account(&account).await?;
    Ok(account)
}

/// Startup bootstrap: guarantees at least one admin exists.
pub async fn ensure_default_admin(store: &dyn Store) -> Result<(), AppError> {
    if store.count_accounts(Some(Role::Admin), false, None).await? > 0 {
        return Ok(());
    }
    let account = store
        .insert_account(NewAccount {
            username: "admin".to_string(),
            email: "admin@jobboard.local".to_string(),
            password_hash: hash_password("admin123")?,
            role: Role::Admin,
            full_name: None,
            permissions: AdminPermissions::all(),
            created_by: None,
        })
        .await?;
    warn!(
        "default admin {} created with a well-known password; change it after first login",
        account.username
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::testing::MemoryMailer;
    use crate::store::MemStore;

    #[tokio::test]
    async fn register_establishes_seeker_account() {
        let store = MemStore::new();
        let account = register(&store, "alice", "alice@x.com", "secret1", "seeker")
            .await
            .unwrap();
        assert_eq!(account.role, Role::Seeker);
        assert!(account.is_active);
        assert_ne!(account.password_hash, "secret1");
    }

    #[tokio::test]
    async fn register_rejects_admin_and_unknown_roles() {
        let store = MemStore::new();
        for role in ["admin", "superuser"] {
            let err = register(&store, "x", "x@x.com", "secret1", role)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::InvalidRole(_)));
        }
    }

    #[tokio::test]
    async fn register_rejects_short_password() {
        let store = MemStore::new();
        let err = register(&store, "alice", "alice@x.com", "short", "seeker")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::WeakCredential));
    }

    #[tokio::test]
    async fn duplicate_registration_fails_with_duplicate_identity() {
        let store = MemStore::new();
        register(&store, "alice", "alice@x.com", "secret1", "seeker")
            .await
            .unwrap();
        let err = register(&store, "alice", "other@x.com", "secret1", "seeker")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateIdentity("username")));
        let err = register(&store, "alice2", "alice@x.com", "secret1", "seeker")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateIdentity("email")));
    }

    #[tokio::test]
    async fn authenticate_accepts_username_or_email() {
        let store = MemStore::new();
        register(&store, "alice", "alice@x.com", "secret1", "seeker")
            .await
            .unwrap();

        let by_name = authenticate(&store, "alice", "secret1").await.unwrap();
        assert!(by_name.last_login.is_some());
        authenticate(&store, "alice@x.com", "secret1").await.unwrap();
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_are_indistinguishable() {
        let store = MemStore::new();
        register(&store, "alice", "alice@x.com", "secret1", "seeker")
            .await
            .unwrap();

        let wrong = authenticate(&store, "alice", "nope99").await.unwrap_err();
        let missing = authenticate(&store, "nobody", "nope99").await.unwrap_err();
        assert!(matches!(wrong, AppError::InvalidCredentials));
        assert!(matches!(missing, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn deactivated_account_cannot_log_in() {
        let store = MemStore::new();
        let account = register(&store, "alice", "alice@x.com", "secret1", "seeker")
            .await
            .unwrap();
        set_account_active(&store, account.id, false).await.unwrap();
        let err = authenticate(&store, "alice", "secret1").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn reset_flow_is_single_use() {
        let store = MemStore::new();
        let mailer = MemoryMailer::default();
        register(&store, "alice", "alice@x.com", "secret1", "seeker")
            .await
            .unwrap();

        issue_reset_token(&store, &mailer, "alice@x.com").await.unwrap();
        let token = store
            .account_by_identifier("alice")
            .await
            .unwrap()
            .unwrap()
            .reset_token
            .unwrap();
        assert_eq!(mailer.sent.lock().unwrap().len(), 1);

        consume_reset_token(&store, token, "newpass1").await.unwrap();
        authenticate(&store, "alice", "newpass1").await.unwrap();

        let err = consume_reset_token(&store, token, "another1")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidOrExpiredToken));
    }

    #[tokio::test]
    async fn reset_for_unknown_email_reports_success_and_sends_nothing() {
        let store = MemStore::new();
        let mailer = MemoryMailer::default();
        issue_reset_token(&store, &mailer, "ghost@x.com").await.unwrap();
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn expired_reset_token_is_rejected() {
        let store = MemStore::new();
        let mailer = MemoryMailer::default();
        register(&store, "alice", "alice@x.com", "secret1", "seeker")
            .await
            .unwrap();
        issue_reset_token(&store, &mailer, "alice@x.com").await.unwrap();

        let mut account = store.account_by_identifier("alice").await.unwrap().unwrap();
        let token = account.reset_token.unwrap();
        account.reset_token_expires = Some(Utc::now() - Duration::minutes(1));
        store.update_account(&account).await.unwrap();

        let err = consume_reset_token(&store, token, "newpass1")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidOrExpiredToken));
    }

    #[tokio::test]
    async fn profile_update_clears_blank_fields() {
        let store = MemStore::new();
        let account = register(&store, "alice", "alice@x.com", "secret1", "seeker")
            .await
            .unwrap();

        let updated = update_profile(
            &store,
            account.id,
            ProfileUpdate {
                full_name: Some("Alice Smith".to_string()),
                phone: Some("555-0100".to_string()),
                location: None,
                bio: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.full_name.as_deref(), Some("Alice Smith"));

        let cleared = update_profile(
            &store,
            account.id,
            ProfileUpdate {
                phone: Some("   ".to_string()),
                ..ProfileUpdate::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(cleared.phone, None);
        // Untouched fields survive.
        assert_eq!(cleared.full_name.as_deref(), Some("Alice Smith"));
    }

    #[tokio::test]
    async fn create_admin_requires_a_permission() {
        let store = MemStore::new();
        let creator = Uuid::new_v4();
        let err = create_admin(
            &store,
            "root2",
            "root2@x.com",
            "secret1",
            None,
            AdminPermissions::default(),
            creator,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let admin = create_admin(
            &store,
            "root2",
            "root2@x.com",
            "secret1",
            None,
            AdminPermissions {
                view_reports: true,
                ..AdminPermissions::default()
            },
            creator,
        )
        .await
        .unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert_eq!(admin.created_by, Some(creator));
    }

    #[tokio::test]
    async fn default_admin_bootstrap_is_idempotent() {
        let store = MemStore::new();
        ensure_default_admin(&store).await.unwrap();
        ensure_default_admin(&store).await.unwrap();
        assert_eq!(
            store.count_accounts(Some(Role::Admin), false, None).await.unwrap(),
            1
        );
    }
}
