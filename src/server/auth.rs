//! Static bearer-token authentication.
//!
//! Tokens and their roles come from `[[auth.tokens]]` in the config file.
//! Handlers take [`Caller`] for any authenticated route and [`Admin`] for
//! admin-only routes.

use std::collections::HashMap;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use serde::Deserialize;

use super::AppState;
use super::error::ApiError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthRole {
    #[default]
    User,
    Admin,
}

/// Token to role lookup.
#[derive(Debug, Clone, Default)]
pub struct TokenTable {
    tokens: HashMap<String, AuthRole>,
}

impl TokenTable {
    pub fn new(tokens: impl IntoIterator<Item = (String, AuthRole)>) -> Self {
        Self {
            tokens: tokens.into_iter().collect(),
        }
    }

    pub fn role_of(&self, token: &str) -> Option<AuthRole> {
        self.tokens.get(token).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// An authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub role: AuthRole,
}

/// An authenticated caller holding the admin role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admin;

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token.trim()).filter(|t| !t.is_empty())
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let token = bearer_token(parts)
            .ok_or_else(|| ApiError::unauthorized("missing bearer token"))?;
        let role = state
            .tokens
            .role_of(token)
            .ok_or_else(|| ApiError::unauthorized("unknown token"))?;
        Ok(Caller { role })
    }
}

impl FromRequestParts<AppState> for Admin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let caller = Caller::from_request_parts(parts, state).await?;
        match caller.role {
            AuthRole::Admin => Ok(Admin),
            AuthRole::User => Err(ApiError::forbidden()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn bearer_parsing() {
        assert_eq!(bearer_token(&parts(Some("Bearer abc"))), Some("abc"));
        assert_eq!(bearer_token(&parts(Some("bearer  abc "))), Some("abc"));
        assert_eq!(bearer_token(&parts(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&parts(Some("Bearer "))), None);
        assert_eq!(bearer_token(&parts(None)), None);
    }

    #[test]
    fn table_lookup() {
        let table = TokenTable::new([
            ("t-admin".to_string(), AuthRole::Admin),
            ("t-user".to_string(), AuthRole::User),
        ]);
        assert_eq!(table.role_of("t-admin"), Some(AuthRole::Admin));
        assert_eq!(table.role_of("t-user"), Some(AuthRole::User));
        assert_eq!(table.role_of("other"), None);
        assert!(TokenTable::default().is_empty());
    }
}
