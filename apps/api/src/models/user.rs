use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account role. Registration only offers seeker/employer; admins are
/// created by other admins (or the startup bootstrap).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Seeker,
    Employer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Seeker => "seeker",
            Role::Employer => "employer",
            Role::Admin => "admin",
        }
    }

    pub fn parse(raw: &str) -> Option<Role> {
        match raw {
            "seeker" => Some(Role::Seeker),
            "employer" => Some(Role::Employer),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Seeker => "Job Seeker",
            Role::Employer => "Employer",
            Role::Admin => "Administrator",
        }
    }
}

/// Admin capability flags. Fixed shape: every capability is a named field,
/// so there are no string-keyed lookups to get wrong.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminPermissions {
    pub manage_users: bool,
    pub manage_jobs: bool,
    pub manage_applications: bool,
    pub view_reports: bool,
    pub system_settings: bool,
}

impl AdminPermissions {
    /// Full permission set, granted to the bootstrap admin.
    pub fn all() -> Self {
        AdminPermissions {
            manage_users: true,
            manage_jobs: true,
            manage_applications: true,
            view_reports: true,
            system_settings: true,
        }
    }

    pub fn any(&self) -> bool {
        self.manage_users
            || self.manage_jobs
            || self.manage_applications
            || self.view_reports
            || self.system_settings
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    /// Only meaningful for admin accounts; default (all false) otherwise.
    pub permissions: AdminPermissions,
    /// Admin that created this account, when admin-created.
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub reset_token: Option<Uuid>,
    #[serde(skip_serializing)]
    pub reset_token_expires: Option<DateTime<Utc>>,
}

impl Account {
    /// Percentage of the six profile fields that are filled in.
    pub fn profile_completion(&self) -> u8 {
        let filled = [
            Some(self.username.as_str()),
            Some(self.email.as_str()),
            self.full_name.as_deref(),
            self.phone.as_deref(),
            self.location.as_deref(),
            self.bio.as_deref(),
        ]
        .iter()
        .filter(|f| f.map(|s| !s.trim().is_empty()).unwrap_or(false))
        .count();

        (filled * 100 / 6) as u8
    }
}

/// Profile fields editable by the account owner. Blank strings clear the
/// corresponding field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_account() -> Account {
        Account {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@x.com".to_string(),
            password_hash: "hash".to_string(),
            role: Role::Seeker,
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
    fn completion_counts_only_filled_fields() {
        let mut account = bare_account();
        assert_eq!(account.profile_completion(), 33); // username + email

        account.full_name = Some("Alice Smith".to_string());
        account.phone = Some("  ".to_string()); // whitespace does not count
        assert_eq!(account.profile_completion(), 50);

        account.phone = Some("555-0100".to_string());
        account.location = Some("Berlin".to_string());
        account.bio = Some("Hi".to_string());
        assert_eq!(account.profile_completion(), 100);
    }

    #[test]
    fn role_parse_rejects_unknown() {
        assert_eq!(Role::parse("employer"), Some(Role::Employer));
        assert_eq!(Role::parse("superuser"), None);
    }

    #[test]
    fn default_permissions_grant_nothing() {
        assert!(!AdminPermissions::default().any());
        assert!(AdminPermissions::all().any());
    }
}
