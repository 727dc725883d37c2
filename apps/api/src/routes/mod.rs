pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::applications::handlers as application_handlers;
use crate::auth::handlers as auth_handlers;
use crate::jobs::handlers as job_handlers;
use crate::reports::handlers as report_handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Accounts and sessions
        .route("/register", post(auth_handlers::handle_register))
        .route("/login", post(auth_handlers::handle_login))
        .route("/logout", get(auth_handlers::handle_logout))
        .route(
            "/forgot_password",
            post(auth_handlers::handle_forgot_password),
        )
        .route(
            "/reset_password",
            post(auth_handlers::handle_reset_password),
        )
        .route("/profile", get(auth_handlers::handle_profile))
        .route("/profile/edit", post(auth_handlers::handle_edit_profile))
        .route(
            "/dashboard",
            get(auth_handlers::handle_dashboard_dispatch),
        )
        // Job postings
        .route("/jobs", get(job_handlers::handle_list_jobs))
        .route("/search", get(job_handlers::handle_search))
        .route("/post_job", post(job_handlers::handle_post_job))
        .route("/edit_job/:id", post(job_handlers::handle_edit_job))
        .route("/publish_job/:id", post(job_handlers::handle_publish_job))
        .route("/delete_job/:id", post(job_handlers::handle_delete_job))
        // Applications
        .route(
            "/apply/:job_id",
            get(application_handlers::handle_application_form),
        )
        .route(
            "/submit_application/:job_id",
            post(application_handlers::handle_submit_application),
        )
        .route(
            "/my_applications",
            get(application_handlers::handle_my_applications),
        )
        .route(
            "/jobs/:id/applications",
            get(application_handlers::handle_job_applications),
        )
        .route(
            "/applications/:id/status",
            post(application_handlers::handle_update_status),
        )
        // Dashboards
        .route(
            "/seeker_dashboard",
            get(report_handlers::handle_seeker_dashboard),
        )
        .route(
            "/employer_dashboard",
            get(report_handlers::handle_employer_dashboard),
        )
        .route(
            "/admin_dashboard",
            get(report_handlers::handle_admin_dashboard),
        )
        // Admin
        .route(
            "/admin/create_admin",
            post(auth_handlers::handle_create_admin),
        )
        .route("/admin/users", get(auth_handlers::handle_list_users))
        .route(
            "/admin/users/:id/toggle_active",
            post(auth_handlers::handle_toggle_user_active),
        )
        .route(
            "/admin/jobs/:id/toggle_active",
            post(job_handlers::handle_toggle_job_active),
        )
        .route(
            "/admin/reports/overview",
            get(report_handlers::handle_report_overview),
        )
        .route(
            "/admin/reports/top_employers",
            get(report_handlers::handle_report_top_employers),
        )
        .route(
            "/admin/reports/top_seekers",
            get(report_handlers::handle_report_top_seekers),
        )
        .route(
            "/admin/reports/activity",
            get(report_handlers::handle_report_activity),
        )
        .with_state(state)
}
