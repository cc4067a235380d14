// Runtime configuration read from the environment
use crate::languages::DEFAULT_LANGUAGES_PATH;
use crate::types::Language;
use std::path::PathBuf;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3002";
pub const DEFAULT_PISTON_URL: &str = "https://emkc.org/api/v2/piston";
pub const DEFAULT_PROBLEM: &str = "two-sum";
pub const DEFAULT_DOCKER_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 30 * 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Which execution backend runs submissions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorKind {
    Piston,
    Docker,
}

#[derive(Debug, Clone)]
pub struct ArenaConfig {
    pub bind_addr: String,
    pub executor: ExecutorKind,
    pub piston_url: String,
    /// Problem catalog file; the built-in catalog is used when unset
    pub catalog_path: Option<PathBuf>,
    pub languages_path: PathBuf,
    pub default_problem: String,
    pub default_language: Language,
    pub docker_timeout_ms: u64,
    /// Sessions untouched for this long are evicted by the API
    pub session_idle_secs: u64,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            executor: ExecutorKind::Piston,
            piston_url: DEFAULT_PISTON_URL.to_string(),
            catalog_path: None,
            languages_path: PathBuf::from(DEFAULT_LANGUAGES_PATH),
            default_problem: DEFAULT_PROBLEM.to_string(),
            default_language: Language::JavaScript,
            docker_timeout_ms: DEFAULT_DOCKER_TIMEOUT_MS,
            session_idle_secs: DEFAULT_SESSION_IDLE_SECS,
        }
    }
}

impl ArenaConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("ARENA_BIND_ADDR") {
            config.bind_addr = addr;
        }

        if let Some(kind) = lookup("ARENA_EXECUTOR") {
            config.executor = match kind.to_lowercase().as_str() {
                "piston" => ExecutorKind::Piston,
                "docker" => ExecutorKind::Docker,
                other => {
                    return Err(ConfigError::Invalid {
                        key: "ARENA_EXECUTOR",
                        message: format!("expected 'piston' or 'docker', got '{}'", other),
                    })
                }
            };
        }

        if let Some(url) = lookup("ARENA_PISTON_URL") {
            config.piston_url = url.trim_end_matches('/').to_string();
        }

        config.catalog_path = lookup("ARENA_CATALOG_PATH").map(PathBuf::from);

        if let Some(path) = lookup("ARENA_LANGUAGES_PATH") {
            config.languages_path = PathBuf::from(path);
        }

        if let Some(problem) = lookup("ARENA_DEFAULT_PROBLEM") {
            config.default_problem = problem;
        }

        if let Some(lang) = lookup("ARENA_DEFAULT_LANGUAGE") {
            config.default_language = lang.parse().map_err(|e| ConfigError::Invalid {
                key: "ARENA_DEFAULT_LANGUAGE",
                message: format!("{}", e),
            })?;
        }

        if let Some(ms) = lookup("ARENA_DOCKER_TIMEOUT_MS") {
            config.docker_timeout_ms = ms.parse().map_err(|_| ConfigError::Invalid {
                key: "ARENA_DOCKER_TIMEOUT_MS",
                message: format!("'{}' is not a number of milliseconds", ms),
            })?;
        }

        if let Some(secs) = lookup("ARENA_SESSION_IDLE_SECS") {
            config.session_idle_secs = match secs.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "ARENA_SESSION_IDLE_SECS",
                        message: format!("'{}' is not a positive number of seconds", secs),
                    })
                }
            };
        }

        Ok(config)
    }
}
