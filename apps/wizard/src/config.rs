use anyhow::{bail, Context, Result};

use crate::wizard::SubmitValidation;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Remote résumé API. When unset the service keeps résumés in memory.
    pub resume_api_base_url: Option<String>,
    pub resume_api_token: Option<String>,
    pub http_timeout_secs: u64,
    pub submit_validation: SubmitValidation,
    /// Wizard sessions untouched for this long are dropped.
    pub session_idle_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            resume_api_base_url: optional_env("RESUME_API_BASE_URL"),
            resume_api_token: optional_env("RESUME_API_TOKEN"),
            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse::<u64>()
                .context("HTTP_TIMEOUT_SECS must be a whole number of seconds")?,
            submit_validation: parse_submit_validation(
                &std::env::var("WIZARD_SUBMIT_VALIDATION").unwrap_or_else(|_| "full".to_string()),
            )?,
            session_idle_secs: std::env::var("WIZARD_SESSION_IDLE_SECS")
                .unwrap_or_else(|_| "1800".to_string())
                .parse::<u64>()
                .context("WIZARD_SESSION_IDLE_SECS must be a whole number of seconds")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            resume_api_base_url: None,
            resume_api_token: None,
            http_timeout_secs: 30,
            submit_validation: SubmitValidation::FullDocument,
            session_idle_secs: 1800,
            port: 8080,
            rust_log: "info".to_string(),
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_submit_validation(raw: &str) -> Result<SubmitValidation> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "active" | "active_step" => Ok(SubmitValidation::ActiveStep),
        "full" | "full_document" => Ok(SubmitValidation::FullDocument),
        other => bail!("WIZARD_SUBMIT_VALIDATION must be 'active' or 'full', got '{other}'"),
    }
}
