use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://airis-api-711296505139.europe-southwest1.run.app";
pub const DEFAULT_LOADER_URL: &str = "https://airis-loader-711296505139.europe-southwest1.run.app";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_IMAGES_KIND: &str = "profile";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_url: String,
    pub loader_url: String,
    pub data_dir: PathBuf,
    pub http_timeout: Duration,
    pub images_kind: String,
    pub log_json: bool,
    pub ephemeral: bool,
}

fn home_dir() -> PathBuf {
    env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("USERPROFILE").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| parse_bool(&v))
        .unwrap_or(default)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim() {
        "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
        "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
        _ => None,
    }
}

fn env_string(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn trim_base_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

impl AppConfig {
    pub fn from_env() -> Self {
        let data_dir = env::var_os("AIRIS_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| home_dir().join(".airis-studio"));
        let http_timeout = env::var("AIRIS_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            api_url: trim_base_url(env_string("AIRIS_API_URL", DEFAULT_API_URL)),
            loader_url: trim_base_url(env_string("AIRIS_LOADER_URL", DEFAULT_LOADER_URL)),
            data_dir,
            http_timeout: Duration::from_secs(http_timeout),
            images_kind: env_string("AIRIS_IMAGES_KIND", DEFAULT_IMAGES_KIND),
            log_json: env_bool("AIRIS_LOG_JSON", false),
            ephemeral: env_bool("AIRIS_EPHEMERAL", false),
        }
    }

    pub fn workflow_store_path(&self) -> PathBuf {
        self.data_dir.join("workflow.json")
    }

    pub fn session_path(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_bool, trim_base_url};

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool("yes"), Some(true));
        assert_eq!(parse_bool(" 0 "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn base_urls_lose_trailing_slashes() {
        assert_eq!(
            trim_base_url("http://localhost:8000//".to_string()),
            "http://localhost:8000"
        );
    }
}
