use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Review pipeline status for a submitted application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Reviewed,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Reviewed => "reviewed",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    pub fn parse(raw: &str) -> Option<ApplicationStatus> {
        match raw {
            "pending" => Some(ApplicationStatus::Pending),
            "reviewed" => Some(ApplicationStatus::Reviewed),
            "accepted" => Some(ApplicationStatus::Accepted),
            "rejected" => Some(ApplicationStatus::Rejected),
            _ => None,
        }
    }
}

/// Applicant-supplied form fields. Which ones the form actually asks for is
/// driven by the posting's requirement flags; everything except name and
/// email is optional here.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ApplicationForm {
    // Personal
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub work_authorization: Option<String>,

    // Professional
    #[serde(default)]
    pub years_experience: Option<i32>,
    #[serde(default)]
    pub expected_salary: Option<String>,
    #[serde(default)]
    pub willing_to_relocate: bool,
    #[serde(default)]
    pub willing_to_travel: bool,

    // Education
    #[serde(default)]
    pub highest_qualification: Option<String>,
    #[serde(default)]
    pub institution_name: Option<String>,
    #[serde(default)]
    pub field_of_study: Option<String>,
    #[serde(default)]
    pub graduation_year: Option<i32>,
    #[serde(default)]
    pub certifications: Option<String>,

    // Work history
    #[serde(default)]
    pub previous_employers: Option<String>,

    // Skills
    #[serde(default)]
    pub technical_skills: Option<String>,
    #[serde(default)]
    pub soft_skills: Option<String>,
    #[serde(default)]
    pub languages: Option<String>,

    // Documents and links (resume handled separately as a file upload)
    #[serde(default)]
    pub cover_letter: Option<String>,
    #[serde(default)]
    pub portfolio_url: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub github_url: Option<String>,

    // Job-specific
    #[serde(default)]
    pub motivation: Option<String>,
    #[serde(default)]
    pub availability_date: Option<NaiveDate>,
    #[serde(default)]
    pub referred_by: Option<String>,

    // Legal
    #[serde(default)]
    pub terms_accepted: bool,
    #[serde(default)]
    pub data_consent: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: Uuid,
    pub job_id: Uuid,
    pub seeker_id: Uuid,
    pub submitted_at: DateTime<Utc>,
    pub status: ApplicationStatus,
    #[serde(flatten)]
    pub form: ApplicationForm,
    /// Server-generated name under the uploads directory. The client's
    /// filename is never stored.
    pub resume_filename: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parse_covers_pipeline() {
        for raw in ["pending", "reviewed", "accepted", "rejected"] {
            assert_eq!(ApplicationStatus::parse(raw).unwrap().as_str(), raw);
        }
        assert!(ApplicationStatus::parse("archived").is_none());
        assert!(ApplicationStatus::parse("Pending").is_none());
    }
}
