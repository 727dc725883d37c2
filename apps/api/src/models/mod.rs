pub mod application;
pub mod job;
pub mod user;

pub use application::{Application, ApplicationForm, ApplicationStatus};
pub use job::{JobFields, JobPosting, Lifecycle, RequirementFlags};
pub use user::{Account, AdminPermissions, ProfileUpdate, Role};
