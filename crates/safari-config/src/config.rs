//! TOML-backed application configuration.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable that points at an explicit config file.
pub const CONFIG_ENV: &str = "SAFARI_CONFIG";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Errors raised while loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to read token file {path}: {source}")]
    TokenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Backend connection settings
    pub api: ApiConfig,
    /// Where the bearer credential comes from
    pub session: SessionConfig,
    /// Per-entity filter overrides keyed by entity name (`users`, `boats`, ...)
    pub filters: BTreeMap<String, FilterProfileConfig>,
}

/// Backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the REST backend, without a trailing slash
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: format!("safari-dash/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Sources for the bearer credential, tried in field order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Literal token
    pub token: Option<String>,
    /// Environment variable holding the token
    pub token_env: String,
    /// File containing the token
    pub token_file: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token: None,
            token_env: "SAFARI_TOKEN".to_string(),
            token_file: None,
        }
    }
}

/// Filter profile override for one entity list
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FilterProfileConfig {
    /// Text fields the search predicate looks at
    pub search_fields: Vec<String>,
    /// Exact-match selectors
    pub selectors: Vec<SelectorConfig>,
}

/// One exact-match selector
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SelectorConfig {
    /// Predicate name used in filter specs
    pub name: String,
    /// Record field compared against; defaults to `name`
    #[serde(default)]
    pub field: Option<String>,
    /// Value assumed when the record lacks the field
    #[serde(default)]
    pub default: Option<String>,
}

impl AppConfig {
    /// Load configuration from the first source that exists:
    /// `$SAFARI_CONFIG`, then the platform config directory.
    /// Falls back to defaults when neither is present.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, preferring an explicit path when one is given
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let candidate = match path {
            Some(p) => Some(p.to_path_buf()),
            None => std::env::var_os(CONFIG_ENV)
                .map(PathBuf::from)
                .or_else(|| Self::default_path().filter(|p| p.exists())),
        };

        let config = match candidate {
            Some(path) => Self::from_file(&path)?,
            None => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Platform-specific location of `config.toml`
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("io", "boatsafari", "safari")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Reject settings no request could succeed with
    pub fn validate(&self) -> Result<()> {
        let base = self.api.base_url.trim();
        if base.is_empty() {
            return Err(ConfigError::Invalid("api.base_url must not be empty".into()));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "api.base_url must be an http(s) URL, got '{}'",
                base
            )));
        }
        if self.api.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "api.timeout_secs must be greater than zero".into(),
            ));
        }
        for (entity, profile) in &self.filters {
            if let Some(selector) = profile.selectors.iter().find(|s| s.name.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!(
                    "filters.{}: selector with empty name (field {:?})",
                    entity, selector.field
                )));
            }
        }
        Ok(())
    }

    /// Base URL with any trailing slash removed
    pub fn base_url(&self) -> &str {
        self.api.base_url.trim().trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.api.timeout_secs, 20);
        assert_eq!(config.session.token_env, "SAFARI_TOKEN");
    }

    #[test]
    fn parses_partial_toml() {
        let config = AppConfig::from_toml(
            r#"
            [api]
            base_url = "https://safari.example.com/"

            [filters.users]
            search_fields = ["firstName", "email"]
            selectors = [{ name = "status", default = "ACTIVE" }]
            "#,
        )
        .expect("parse");

        assert_eq!(config.base_url(), "https://safari.example.com");
        assert_eq!(config.api.timeout_secs, 20);
        let users = &config.filters["users"];
        assert_eq!(users.search_fields, vec!["firstName", "email"]);
        assert_eq!(users.selectors[0].default.as_deref(), Some("ACTIVE"));
        assert!(users.selectors[0].field.is_none());
    }

    #[test]
    fn rejects_zero_timeout_and_bad_url() {
        let mut config = AppConfig::default();
        config.api.timeout_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = AppConfig::default();
        config.api.base_url = "ftp://nope".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn load_from_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "[api]\nbase_url = \"http://127.0.0.1:9000\"\ntimeout_secs = 5").unwrap();

        let config = AppConfig::load_from(Some(file.path())).expect("load");
        assert_eq!(config.base_url(), "http://127.0.0.1:9000");
        assert_eq!(config.api.timeout_secs, 5);
    }

    #[test]
    fn load_from_reports_parse_errors_with_path() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "[api\nbase_url = ").unwrap();

        let err = AppConfig::load_from(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }
}
