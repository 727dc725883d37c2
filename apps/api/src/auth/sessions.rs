//! Server-side sessions and the request guards built on them.
//!
//! A session is a random id mapped to {user_id, username, role, email} with
//! an expiry. Clients present the id as a bearer token; handlers receive a
//! [`CurrentUser`] extractor that has already rejected unauthenticated
//! requests with `NotAuthenticated`.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Account, Role};
use crate::state::AppState;

#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

/// Shared in-process session table. Expired entries are dropped lazily on
/// lookup.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, account: &Account, ttl_secs: i64) -> Uuid {
        let token = Uuid::new_v4();
        let session = Session {
            user_id: account.id,
            username: account.username.clone(),
            role: account.role,
            email: account.email.clone(),
            expires_at: Utc::now() + Duration::seconds(ttl_secs),
        };
        if let Ok(mut sessions) = self.inner.write() {
            sessions.insert(token, session);
        }
        token
    }

    pub fn get(&self, token: Uuid) -> Option<Session> {
        let expired = {
            let sessions = self.inner.read().ok()?;
            match sessions.get(&token) {
                Some(s) if s.expires_at > Utc::now() => return Some(s.clone()),
                Some(_) => true,
                None => false,
            }
        };
        if expired {
            self.destroy(token);
        }
        None
    }

    pub fn destroy(&self, token: Uuid) {
        if let Ok(mut sessions) = self.inner.write() {
            sessions.remove(&token);
        }
    }
}

/// Authenticated requester. Extraction fails with `NotAuthenticated` when
/// the bearer token is missing, unknown, or expired.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub token: Uuid,
    pub session: Session,
}

impl CurrentUser {
    pub fn id(&self) -> Uuid {
        self.session.user_id
    }

    pub fn role(&self) -> Role {
        self.session.role
    }

    /// Role gate: exact match required.
    pub fn require_role(&self, role: Role) -> Result<(), AppError> {
        if self.session.role == role {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    /// Loads the full account behind the session. Sessions for deactivated
    /// or deleted accounts are treated as unauthenticated.
    pub async fn account(&self, state: &AppState) -> Result<Account, AppError> {
        match state.store.account_by_id(self.session.user_id).await? {
            Some(account) if account.is_active => Ok(account),
            _ => Err(AppError::NotAuthenticated),
        }
    }

    /// Admin gate with a named capability check against the account's
    /// permission set. The account is re-fetched so a permission revocation
    /// takes effect without re-login.
    pub async fn require_admin_permission(
        &self,
        state: &AppState,
        check: impl Fn(&crate::models::AdminPermissions) -> bool,
    ) -> Result<Account, AppError> {
        if self.session.role != Role::Admin {
            return Err(AppError::Forbidden);
        }
        let account = state
            .store
            .account_by_id(self.session.user_id)
            .await?
            .ok_or(AppError::NotAuthenticated)?;
        if !account.is_active || !check(&account.permissions) {
            return Err(AppError::Forbidden);
        }
        Ok(account)
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(AppError::NotAuthenticated)?;
        let token = header
            .strip_prefix("Bearer ")
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
            .ok_or(AppError::NotAuthenticated)?;
        let session = state
            .sessions
            .get(token)
            .ok_or(AppError::NotAuthenticated)?;
        Ok(CurrentUser { token, session })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AdminPermissions;

    fn account(role: Role) -> Account {
        Account {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@x.com".to_string(),
            password_hash: "hash".to_string(),
            role,
            is_active: true,
            full_name: None,
            phone: None,
            location: None,
            bio: None,
            permissions: AdminPermissions::default(),
            created_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login: None,
            reset_token: None,
            reset_token_expires: None,
        }
    }

    #[test]
    fn session_round_trip_and_destroy() {
        let store = SessionStore::new();
        let token = store.create(&account(Role::Seeker), 3600);
        assert_eq!(store.get(token).unwrap().username, "alice");

        store.destroy(token);
        assert!(store.get(token).is_none());
    }

    #[test]
    fn expired_session_is_rejected() {
        let store = SessionStore::new();
        let token = store.create(&account(Role::Seeker), -1);
        assert!(store.get(token).is_none());
    }

    #[test]
    fn role_gate_rejects_other_roles() {
        let store = SessionStore::new();
        let token = store.create(&account(Role::Seeker), 3600);
        let user = CurrentUser {
            token,
            session: store.get(token).unwrap(),
        };
        assert!(user.require_role(Role::Seeker).is_ok());
        assert!(matches!(
            user.require_role(Role::Employer),
            Err(AppError::Forbidden)
        ));
        assert!(matches!(
            user.require_role(Role::Admin),
            Err(AppError::Forbidden)
        ));
    }
}
