//! Server configuration from environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use edalab_learning::{EvaluationStrategy, LearningResult, TrainingConfig};
use thiserror::Error;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 8000;

/// Default upload limit: 100 MiB.
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 100 * 1024 * 1024;

/// Default cap on live sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 100;

/// Default idle time after which a session is dropped.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60);

/// An environment variable that is set but unusable.
#[derive(Error, Debug)]
#[error("Invalid value for {var}: '{value}' ({reason})")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

/// Runtime settings of the HTTP service.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory for persisted model artifacts, created at startup.
    pub models_dir: PathBuf,
    /// Origins from `ALLOWED_ORIGINS`. Logged only; CORS allows any origin.
    pub allowed_origins: Vec<String>,
    /// Request body limit in bytes for uploads.
    pub max_upload_size: usize,
    pub evaluation: EvaluationStrategy,
    /// Live sessions kept at once; the least recently used one is evicted
    /// when an upload opens a new session past the cap.
    pub max_sessions: usize,
    /// Sessions idle this long are dropped.
    pub session_ttl: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            models_dir: PathBuf::from("models"),
            allowed_origins: vec!["*".to_string()],
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            evaluation: EvaluationStrategy::default(),
            max_sessions: DEFAULT_MAX_SESSIONS,
            session_ttl: DEFAULT_SESSION_TTL,
        }
    }
}

impl ServerConfig {
    /// Read `HOST`, `PORT`, `MODELS_DIR`, `ALLOWED_ORIGINS`, `MAX_UPLOAD_SIZE`,
    /// `EVALUATION`, `MAX_SESSIONS` and `SESSION_TTL_SECS`, falling back to
    /// defaults for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`ServerConfig::from_env`] with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(host) = lookup("HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("PORT") {
            config.port = parse_var("PORT", port)?;
        }
        if let Some(dir) = lookup("MODELS_DIR") {
            config.models_dir = PathBuf::from(dir);
        }
        if let Some(origins) = lookup("ALLOWED_ORIGINS") {
            config.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(limit) = lookup("MAX_UPLOAD_SIZE") {
            config.max_upload_size = parse_var("MAX_UPLOAD_SIZE", limit)?;
        }
        if let Some(evaluation) = lookup("EVALUATION") {
            config.evaluation = parse_var("EVALUATION", evaluation)?;
        }
        if let Some(max) = lookup("MAX_SESSIONS") {
            config.max_sessions = parse_var("MAX_SESSIONS", max.clone())?;
            if config.max_sessions == 0 {
                return Err(ConfigError {
                    var: "MAX_SESSIONS",
                    value: max,
                    reason: "must be at least 1".to_string(),
                });
            }
        }
        if let Some(ttl) = lookup("SESSION_TTL_SECS") {
            config.session_ttl = Duration::from_secs(parse_var("SESSION_TTL_SECS", ttl)?);
        }

        Ok(config)
    }

    /// Training settings for every predict request.
    pub fn training_config(&self) -> LearningResult<TrainingConfig> {
        TrainingConfig::builder().evaluation(self.evaluation).build()
    }
}

fn parse_var<T>(var: &'static str, value: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError {
        var,
        reason: e.to_string(),
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.models_dir, PathBuf::from("models"));
        assert_eq!(config.allowed_origins, vec!["*"]);
        assert_eq!(config.max_upload_size, 100 * 1024 * 1024);
        assert_eq!(config.evaluation, EvaluationStrategy::TimeSeriesCv);
        assert_eq!(config.max_sessions, 100);
        assert_eq!(config.session_ttl, Duration::from_secs(3600));
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("PORT", "9000"),
            ("MODELS_DIR", "/tmp/m"),
            ("ALLOWED_ORIGINS", "http://a.test, http://b.test,"),
            ("EVALUATION", "holdout"),
            ("MAX_SESSIONS", "8"),
            ("SESSION_TTL_SECS", "90"),
        ]))
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.models_dir, PathBuf::from("/tmp/m"));
        assert_eq!(config.allowed_origins, vec!["http://a.test", "http://b.test"]);
        assert!(matches!(config.evaluation, EvaluationStrategy::Holdout { .. }));
        assert_eq!(config.training_config().unwrap().evaluation, config.evaluation);
        assert_eq!(config.max_sessions, 8);
        assert_eq!(config.session_ttl, Duration::from_secs(90));
    }

    #[test]
    fn test_bad_port() {
        let err = ServerConfig::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert_eq!(err.var, "PORT");
        assert!(err.to_string().contains("eighty"));
    }

    #[test]
    fn test_zero_sessions_rejected() {
        let err = ServerConfig::from_lookup(lookup(&[("MAX_SESSIONS", "0")])).unwrap_err();
        assert_eq!(err.var, "MAX_SESSIONS");
        assert!(err.to_string().contains("at least 1"));
    }
}
