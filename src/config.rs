//! Runtime configuration from the environment
//!
//! An optional `.env` file is loaded first; real environment variables win.

use crate::llm::{LlmConfig, LlmError, DEFAULT_BASE_URL, DEFAULT_MODEL};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const API_KEY_VAR: &str = "GEMINI_API_KEY";
const DEFAULT_CREDENTIALS_PATH: &str = "credentials.json";
const DEFAULT_SHEET_NAME: &str = "MyExpenses";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_SESSION_IDLE_SECS: u64 = 30 * 60;

/// Setup failures; fatal at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    MissingVar(&'static str),
    #[error("{name} has an invalid value {value:?}")]
    InvalidVar { name: &'static str, value: String },
    #[error("cannot read credential file {}: {source}", path.display())]
    CredentialFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("credential file {} is malformed: {reason}", path.display())]
    MalformedCredential { path: PathBuf, reason: String },
    #[error("HTTP client setup failed: {0}")]
    HttpClient(String),
    #[error("language model client setup failed: {0}")]
    Model(#[from] LlmError),
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub llm: LlmConfig,
    pub credentials_path: PathBuf,
    pub sheet_name: String,
    pub port: u16,
    pub http_timeout: Duration,
    /// Sessions with no activity and no open stream for this long are ended
    pub session_idle: Duration,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env file");
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build settings from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = var(API_KEY_VAR).ok_or(ConfigError::MissingVar(API_KEY_VAR))?;
        let port = parse_var(&var, "EXPENSE_CHAT_PORT", DEFAULT_PORT)?;
        let timeout_secs = parse_var(&var, "HTTP_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        let http_timeout = Duration::from_secs(timeout_secs);
        let idle_secs = parse_var(&var, "SESSION_IDLE_SECS", DEFAULT_SESSION_IDLE_SECS)?;

        Ok(Self {
            llm: LlmConfig {
                api_key: Some(api_key),
                base_url: var("LLM_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                model: var("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                timeout: http_timeout,
            },
            credentials_path: var("GOOGLE_CREDENTIALS_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_CREDENTIALS_PATH), PathBuf::from),
            sheet_name: var("EXPENSE_SHEET_NAME").unwrap_or_else(|| DEFAULT_SHEET_NAME.to_string()),
            port,
            http_timeout,
            session_idle: Duration::from_secs(idle_secs),
        })
    }
}

fn parse_var<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match var(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidVar { name, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_missing_api_key_is_fatal() {
        let err = Settings::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("GEMINI_API_KEY")));
        assert_eq!(err.to_string(), "GEMINI_API_KEY is not set");
    }

    #[test]
    fn test_blank_api_key_counts_as_missing() {
        let err = Settings::from_lookup(lookup(&[("GEMINI_API_KEY", "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(_)));
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(&[("GEMINI_API_KEY", "secret")])).unwrap();
        assert_eq!(settings.llm.api_key.as_deref(), Some("secret"));
        assert_eq!(settings.llm.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.llm.model, "gemini-2.0-flash");
        assert_eq!(settings.credentials_path, PathBuf::from("credentials.json"));
        assert_eq!(settings.sheet_name, "MyExpenses");
        assert_eq!(settings.port, 8000);
        assert_eq!(settings.http_timeout, Duration::from_secs(60));
        assert_eq!(settings.llm.timeout, settings.http_timeout);
        assert_eq!(settings.session_idle, Duration::from_secs(1800));
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "secret"),
            ("LLM_MODEL", "gemini-2.5-pro"),
            ("EXPENSE_SHEET_NAME", "Household"),
            ("EXPENSE_CHAT_PORT", "9100"),
            ("HTTP_TIMEOUT_SECS", "15"),
            ("SESSION_IDLE_SECS", "120"),
            ("GOOGLE_CREDENTIALS_PATH", "/etc/expense/sa.json"),
        ]))
        .unwrap();
        assert_eq!(settings.llm.model, "gemini-2.5-pro");
        assert_eq!(settings.sheet_name, "Household");
        assert_eq!(settings.port, 9100);
        assert_eq!(settings.http_timeout, Duration::from_secs(15));
        assert_eq!(settings.session_idle, Duration::from_secs(120));
        assert_eq!(settings.credentials_path, PathBuf::from("/etc/expense/sa.json"));
    }

    #[test]
    fn test_invalid_port() {
        let err = Settings::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "secret"),
            ("EXPENSE_CHAT_PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidVar {
                name: "EXPENSE_CHAT_PORT",
                ..
            }
        ));
    }
}
