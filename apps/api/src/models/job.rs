use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Posting lifecycle. A posting starts as a draft and is published at most
/// once; after that only the `active` visibility flag moves. The legacy
/// `is_active`/`is_draft` flag pair is derived from this enum at the store
/// boundary, so the both-true combination cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Lifecycle {
    Draft,
    Published {
        published_at: DateTime<Utc>,
        active: bool,
    },
}

impl Lifecycle {
    pub fn is_draft(&self) -> bool {
        matches!(self, Lifecycle::Draft)
    }

    /// Visible on public surfaces: published and not deactivated.
    pub fn is_active(&self) -> bool {
        matches!(self, Lifecycle::Published { active: true, .. })
    }

    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Lifecycle::Draft => None,
            Lifecycle::Published { published_at, .. } => Some(*published_at),
        }
    }

    /// Rebuilds the lifecycle from the persisted flag pair. The invalid
    /// active-draft combination is rejected rather than guessed at.
    pub fn from_flags(
        is_draft: bool,
        is_active: bool,
        published_at: Option<DateTime<Utc>>,
    ) -> Option<Lifecycle> {
        match (is_draft, is_active) {
            (true, true) => None,
            (true, false) => Some(Lifecycle::Draft),
            (false, active) => Some(Lifecycle::Published {
                // A published row with no timestamp predates the draft
                // feature; fall back to the epoch rather than failing reads.
                published_at: published_at.unwrap_or(DateTime::<Utc>::MIN_UTC),
                active,
            }),
        }
    }
}

/// Which optional sections the generated application form requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequirementFlags {
    pub phone: bool,
    pub address: bool,
    pub work_authorization: bool,
    pub experience_years: bool,
    pub expected_salary: bool,
    pub education: bool,
    pub work_history: bool,
    pub skills: bool,
    pub portfolio: bool,
    pub cover_letter: bool,
    pub resume: bool,
    pub portfolio_links: bool,
}

impl Default for RequirementFlags {
    // Defaults mirror what a typical posting asks for.
    fn default() -> Self {
        RequirementFlags {
            phone: true,
            address: false,
            work_authorization: true,
            experience_years: true,
            expected_salary: false,
            education: true,
            work_history: true,
            skills: true,
            portfolio: false,
            cover_letter: true,
            resume: true,
            portfolio_links: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub employer_id: Uuid,
    pub company_name: String,
    pub location: String,
    pub salary_range: Option<String>,
    pub job_type: String,
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
    pub requirements: RequirementFlags,
    pub posted_date: DateTime<Utc>,
    pub draft_saved_at: DateTime<Utc>,
}

/// Employer-supplied posting fields, shared by create and edit.
#[derive(Debug, Clone, Deserialize)]
pub struct JobFields {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub salary_range: Option<String>,
    #[serde(default = "default_job_type")]
    pub job_type: String,
    #[serde(default)]
    pub requirements: RequirementFlags,
}

fn default_job_type() -> String {
    "full-time".to_string()
}
