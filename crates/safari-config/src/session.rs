//! Process-wide session state holding the bearer credential.
//!
//! The data layer only ever reads the token. Writing it belongs to the
//! login and logout flow.

use crate::config::{ConfigError, Result, SessionConfig};
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// Shared handle to the current bearer credential
#[derive(Clone, Default)]
pub struct Session {
    token: Arc<RwLock<Option<String>>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

impl Session {
    /// A session with no credential
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A session that already holds a credential
    pub fn with_token(token: impl Into<String>) -> Self {
        let session = Self::default();
        session.login(token);
        session
    }

    /// Resolve the credential from configuration: literal token, then the
    /// configured environment variable, then the token file.
    pub fn from_config(config: &SessionConfig) -> Result<Self> {
        if let Some(token) = config.token.as_deref().and_then(non_empty) {
            debug!("Using token from configuration");
            return Ok(Self::with_token(token));
        }

        if let Ok(token) = std::env::var(&config.token_env) {
            if let Some(token) = non_empty(&token) {
                debug!("Using token from ${}", config.token_env);
                return Ok(Self::with_token(token));
            }
        }

        if let Some(path) = &config.token_file {
            let content =
                std::fs::read_to_string(path).map_err(|source| ConfigError::TokenFile {
                    path: path.clone(),
                    source,
                })?;
            if let Some(token) = non_empty(&content) {
                debug!("Using token from {}", path.display());
                return Ok(Self::with_token(token));
            }
        }

        Ok(Self::anonymous())
    }

    /// Current bearer token, if any
    pub fn bearer_token(&self) -> Option<String> {
        self.token.read().ok().and_then(|guard| guard.clone())
    }

    /// Whether a credential is present
    pub fn is_authenticated(&self) -> bool {
        self.token
            .read()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    /// Store a freshly issued credential
    pub fn login(&self, token: impl Into<String>) {
        if let Ok(mut guard) = self.token.write() {
            *guard = Some(token.into());
            info!("Session authenticated");
        }
    }

    /// Drop the credential
    pub fn logout(&self) {
        if let Ok(mut guard) = self.token.write() {
            *guard = None;
            info!("Session cleared");
        }
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn literal_token_wins() {
        let config = SessionConfig {
            token: Some("  abc  ".into()),
            token_env: "SAFARI_TEST_UNUSED_TOKEN_ENV".into(),
            token_file: None,
        };
        let session = Session::from_config(&config).expect("session");
        assert_eq!(session.bearer_token().as_deref(), Some("abc"));
    }

    #[test]
    fn token_file_is_trimmed() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "file-token").unwrap();
        let config = SessionConfig {
            token: None,
            token_env: "SAFARI_TEST_MISSING_TOKEN_ENV".into(),
            token_file: Some(file.path().to_path_buf()),
        };
        let session = Session::from_config(&config).expect("session");
        assert_eq!(session.bearer_token().as_deref(), Some("file-token"));
    }

    #[test]
    fn missing_sources_yield_anonymous_session() {
        let config = SessionConfig {
            token: Some("   ".into()),
            token_env: "SAFARI_TEST_MISSING_TOKEN_ENV".into(),
            token_file: None,
        };
        let session = Session::from_config(&config).expect("session");
        assert!(!session.is_authenticated());
    }

    #[test]
    fn clones_share_login_state() {
        let session = Session::anonymous();
        let handle = session.clone();
        session.login("t1");
        assert_eq!(handle.bearer_token().as_deref(), Some("t1"));
        handle.logout();
        assert!(!session.is_authenticated());
    }

    #[test]
    fn debug_output_redacts_token() {
        let session = Session::with_token("secret-value");
        let rendered = format!("{:?}", session);
        assert!(!rendered.contains("secret-value"));
        assert!(rendered.contains("authenticated: true"));
    }
}
