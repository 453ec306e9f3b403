use axum::http::{header::AUTHORIZATION, HeaderMap};

use crate::config::AuthConfig;
use crate::server::error::ApiError;

/// Caller identity extracted from the request; the token doubles as the
/// billing credential forwarded upstream.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
}

pub trait Authenticator: Send + Sync {
    fn authenticate(&self, headers: &HeaderMap) -> Result<Session, ApiError>;
}

/// Accepts `Authorization: Bearer <token>`, optionally limited to an allow-list.
pub struct BearerAuth {
    allowed: Vec<String>,
}

impl BearerAuth {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            allowed: config.allowed_tokens.clone(),
        }
    }
}

impl Authenticator for BearerAuth {
    fn authenticate(&self, headers: &HeaderMap) -> Result<Session, ApiError> {
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::Auth("Sign in to continue".into()))?;

        if !self.allowed.is_empty() && !self.allowed.iter().any(|a| a == token) {
            tracing::warn!("rejected unknown bearer token");
            return Err(ApiError::Auth("Session is not valid".into()));
        }
        Ok(Session {
            token: token.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn missing_or_blank_token_is_rejected() {
        let auth = BearerAuth::new(&AuthConfig::default());
        assert!(auth.authenticate(&HeaderMap::new()).is_err());
        assert!(auth.authenticate(&headers("Bearer   ")).is_err());
        assert!(auth.authenticate(&headers("Basic abc")).is_err());
    }

    #[test]
    fn any_token_accepted_without_allow_list() {
        let auth = BearerAuth::new(&AuthConfig::default());
        assert_eq!(auth.authenticate(&headers("Bearer tok")).unwrap().token, "tok");
    }

    #[test]
    fn allow_list_is_enforced() {
        let auth = BearerAuth::new(&AuthConfig {
            allowed_tokens: vec!["good".into()],
        });
        assert!(auth.authenticate(&headers("Bearer good")).is_ok());
        assert!(auth.authenticate(&headers("Bearer bad")).is_err());
    }
}
