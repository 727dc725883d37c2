use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. When unset the server falls back to the
    /// in-memory store (useful for local development without a database).
    pub database_url: Option<String>,
    pub port: u16,
    /// Directory receiving uploaded resume files.
    pub upload_dir: String,
    /// SMTP settings for password-reset delivery. When the host is unset,
    /// reset emails are logged instead of sent.
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub mail_from: String,
    /// Session lifetime in seconds for plain logins.
    pub session_ttl_secs: i64,
    /// Session lifetime in seconds when "remember me" is requested.
    pub remember_me_ttl_secs: i64,
    pub rust_log: String,
}

const DEFAULT_SESSION_TTL_SECS: i64 = 2 * 60 * 60;
const REMEMBER_ME_TTL_SECS: i64 = 30 * 24 * 60 * 60;

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: std::env::var("DATABASE_URL").ok(),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            upload_dir: std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()),
            smtp_host: std::env::var("SMTP_HOST").ok(),
            smtp_port: std::env::var("SMTP_PORT")
                .unwrap_or_else(|_| "587".to_string())
                .parse::<u16>()
                .context("SMTP_PORT must be a valid port number")?,
            smtp_username: std::env::var("SMTP_USERNAME").unwrap_or_default(),
            smtp_password: std::env::var("SMTP_PASSWORD").unwrap_or_default(),
            mail_from: std::env::var("MAIL_FROM")
                .unwrap_or_else(|_| "noreply@jobboard.local".to_string()),
            session_ttl_secs: env_i64("SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS)?,
            remember_me_ttl_secs: env_i64("REMEMBER_ME_TTL_SECS", REMEMBER_ME_TTL_SECS)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn env_i64(key: &str, default: i64) -> Result<i64> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<i64>()
            .with_context(|| format!("{key} must be an integer")),
        Err(_) => Ok(default),
    }
}
