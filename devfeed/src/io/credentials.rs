//! Read-only access to the signed-in user's session.
//!
//! The feed never logs in or out; it only forwards whatever token the
//! surrounding application obtained.

use std::env;

use crate::io::config::SessionConfig;

/// Environment variable that overrides `session.token`.
pub const TOKEN_ENV: &str = "DEVFEED_TOKEN";

#[derive(Clone, Default, PartialEq, Eq)]
pub struct SessionCredentials {
    pub token: Option<String>,
    pub user_id: Option<String>,
}

impl SessionCredentials {
    /// Resolve credentials from config, letting `DEVFEED_TOKEN` win.
    pub fn resolve(config: &SessionConfig) -> Self {
        Self::from_parts(config, env::var(TOKEN_ENV).ok())
    }

    fn from_parts(config: &SessionConfig, env_token: Option<String>) -> Self {
        let token = env_token
            .filter(|token| !token.trim().is_empty())
            .or_else(|| config.token.clone());
        Self {
            token,
            user_id: config.user_id.clone(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// `Cookie` header value carrying the session token.
    pub fn cookie_header(&self) -> Option<String> {
        self.token.as_ref().map(|token| format!("token={}", token))
    }
}

impl std::fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCredentials")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("user_id", &self.user_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_token_overrides_config() {
        let config = SessionConfig {
            token: Some("from-file".to_string()),
            user_id: Some("u1".to_string()),
        };
        let creds = SessionCredentials::from_parts(&config, Some("from-env".to_string()));
        assert_eq!(creds.token.as_deref(), Some("from-env"));
        assert_eq!(creds.user_id.as_deref(), Some("u1"));
        assert_eq!(creds.cookie_header().as_deref(), Some("token=from-env"));
    }

    #[test]
    fn blank_env_token_falls_back_to_config() {
        let config = SessionConfig {
            token: Some("from-file".to_string()),
            user_id: None,
        };
        let creds = SessionCredentials::from_parts(&config, Some("  ".to_string()));
        assert_eq!(creds.token.as_deref(), Some("from-file"));
    }

    #[test]
    fn debug_output_redacts_token() {
        let creds = SessionCredentials {
            token: Some("secret".to_string()),
            user_id: None,
        };
        assert!(!format!("{:?}", creds).contains("secret"));
        assert!(SessionCredentials::default().cookie_header().is_none());
    }
}
