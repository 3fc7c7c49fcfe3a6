//! Resolves an incoming `Authorization: Bearer <token>` header to a live
//! principal. Failure kinds are ordered: missing header, malformed token,
//! expired, revoked, then principal-not-found (token valid but user deleted).

use axum::http::HeaderMap;

use crate::error::AppError;
use crate::model::User;
use crate::store::UserStore;

use super::token::{TokenError, TokenVault};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Please login to access this route")]
    Missing,
    #[error("Invalid token")]
    Malformed,
    #[error("Token expired. Please login again")]
    Expired,
    #[error("Token is invalid. Please login again")]
    Revoked,
    #[error("User not found")]
    PrincipalNotFound,
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        let message = e.to_string();
        match e {
            AuthError::Missing => AppError::AuthMissing { message },
            AuthError::Malformed => AppError::AuthMalformed { message },
            AuthError::Expired => AppError::AuthExpired { message },
            AuthError::Revoked => AppError::AuthRevoked { message },
            AuthError::PrincipalNotFound => AppError::AuthUnknownPrincipal { message },
        }
    }
}

/// Pull the bearer token out of the header map, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get("authorization")?.to_str().ok()?;
    let rest = raw.strip_prefix("Bearer ")?;
    let tok = rest.trim();
    if tok.is_empty() { None } else { Some(tok.to_string()) }
}

/// Authenticate a request: validate the token, then load a fresh principal
/// snapshot from the credential store. Returns the principal together with
/// the raw token so logout can revoke it.
pub fn authenticate(
    vault: &TokenVault,
    users: &dyn UserStore,
    headers: &HeaderMap,
) -> Result<(User, String), AppError> {
    let token = bearer_token(headers).ok_or(AuthError::Missing)?;
    let claims = vault.validate(&token).map_err(|e| match e {
        TokenError::Malformed => AuthError::Malformed,
        TokenError::Expired => AuthError::Expired,
        TokenError::Revoked => AuthError::Revoked,
    })?;
    let user = users
        .get(claims.sub)
        .map_err(|e| AppError::internal(e.to_string()))?
        .ok_or(AuthError::PrincipalNotFound)?;
    Ok((user, token))
}
