//! Bearer token authentication

use std::collections::HashMap;

use axum::http::{header::AUTHORIZATION, HeaderMap};

use crate::error::ApiError;

/// An authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
}

/// Resolves bearer tokens to users
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Option<AuthUser>;
}

/// Fixed token table from configuration
#[derive(Debug, Clone, Default)]
pub struct StaticTokens {
    tokens: HashMap<String, String>,
}

impl StaticTokens {
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl TokenVerifier for StaticTokens {
    fn verify(&self, token: &str) -> Option<AuthUser> {
        self.tokens.get(token).map(|user| AuthUser { id: user.clone() })
    }
}

/// Authenticate a request from its `Authorization: Bearer` header
pub fn authenticate(headers: &HeaderMap, verifier: &dyn TokenVerifier) -> Result<AuthUser, ApiError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(ApiError::Unauthorized)?;

    verifier.verify(token).ok_or(ApiError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn verifier() -> StaticTokens {
        StaticTokens::new(HashMap::from([("s3cret".to_string(), "alice".to_string())]))
    }

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_valid_token() {
        let user = authenticate(&headers("Bearer s3cret"), &verifier()).unwrap();
        assert_eq!(user.id, "alice");
    }

    #[test]
    fn test_rejected_tokens() {
        for value in ["Bearer wrong", "Basic s3cret", "Bearer ", "s3cret"] {
            assert!(matches!(
                authenticate(&headers(value), &verifier()),
                Err(ApiError::Unauthorized)
            ));
        }
        assert!(authenticate(&HeaderMap::new(), &verifier()).is_err());
    }
}
