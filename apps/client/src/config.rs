use anyhow::{Context, Result};

/// Client configuration loaded from environment variables.
/// Startup fails with a context message if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend origin, e.g. `http://localhost:5001`. The only required value.
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    /// Delay before the automatic Upload → Match transition.
    pub auto_advance_delay_ms: u64,
    /// `limit` query parameter for history fetches.
    pub history_limit: u32,
    /// Driver inputs: documents to upload before generating.
    pub cv_path: Option<String>,
    pub job_path: Option<String>,
    /// Driver output directory for the export artifacts.
    pub output_dir: String,
    pub use_sample_data: bool,
    pub github_username: Option<String>,
    pub linkedin_url: Option<String>,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            api_base_url: require_env("API_BASE_URL")?,
            request_timeout_secs: parse_env("REQUEST_TIMEOUT_SECS", 30)?,
            auto_advance_delay_ms: parse_env("AUTO_ADVANCE_DELAY_MS", 1500)?,
            history_limit: parse_env("HISTORY_LIMIT", 10)?,
            cv_path: optional_env("CV_PATH"),
            job_path: optional_env("JOB_PATH"),
            output_dir: std::env::var("OUTPUT_DIR").unwrap_or_else(|_| ".".to_string()),
            use_sample_data: flag_env("USE_SAMPLE_DATA"),
            github_username: optional_env("GITHUB_USERNAME"),
            linkedin_url: optional_env("LINKEDIN_URL"),
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Returns the variable trimmed, or `None` when unset or blank.
fn optional_env(key: &str) -> Option<String> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

fn flag_env(key: &str) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}
