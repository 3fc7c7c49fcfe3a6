//! Token vault: issues, validates and revokes signed session tokens.
//!
//! A token is `base64url(claims-json) . base64url(hmac-sha256(payload))`,
//! signed with the process-wide secret. Revocation is a deny-list keyed by
//! the full token string; each entry carries the token's own `exp` so the
//! background sweep can drop it once it would no longer verify anyway.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

use crate::model::Role;

type HmacSha256 = Hmac<Sha256>;

/// Signed token payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Validation failure kinds, distinguishable by the caller. Ordering matters:
/// signature and expiry are checked before the revocation set, because the
/// deny-list is only consulted once the token is trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("expired token")]
    Expired,
    #[error("revoked token")]
    Revoked,
}

pub struct TokenVault {
    secret: Vec<u8>,
    ttl: Duration,
    /// token string -> exp (unix seconds)
    revoked: RwLock<HashMap<String, i64>>,
}

impl TokenVault {
    pub fn new(secret: impl Into<Vec<u8>>, ttl: Duration) -> Self {
        Self { secret: secret.into(), ttl, revoked: RwLock::new(HashMap::new()) }
    }

    fn sign(&self, payload: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.secret).expect("hmac accepts any key length");
        mac.update(payload.as_bytes());
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }

    fn encode(&self, claims: &Claims) -> String {
        let body = serde_json::to_vec(claims).expect("claims serialize");
        let payload = URL_SAFE_NO_PAD.encode(body);
        let sig = self.sign(&payload);
        format!("{payload}.{sig}")
    }

    /// Issue a fresh token for the given principal.
    pub fn issue(&self, principal_id: Uuid, role: Role) -> String {
        let now = Utc::now().timestamp();
        let claims = Claims { sub: principal_id, role, iat: now, exp: now + self.ttl.as_secs() as i64 };
        self.encode(&claims)
    }

    /// Verify signature, then expiry, then revocation set membership.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let Some((payload, sig)) = token.split_once('.') else {
            return Err(TokenError::Malformed);
        };
        let mut mac = HmacSha256::new_from_slice(&self.secret).expect("hmac accepts any key length");
        mac.update(payload.as_bytes());
        let sig_bytes = URL_SAFE_NO_PAD.decode(sig).map_err(|_| TokenError::Malformed)?;
        mac.verify_slice(&sig_bytes).map_err(|_| TokenError::Malformed)?;
        let claims = decode_claims(payload).ok_or(TokenError::Malformed)?;
        if claims.exp <= Utc::now().timestamp() {
            return Err(TokenError::Expired);
        }
        if self.revoked.read().contains_key(token) {
            return Err(TokenError::Revoked);
        }
        Ok(claims)
    }

    /// Add a token to the deny-list. Decodes without re-verifying the
    /// signature to read `exp`; idempotent, and undecodable input is a no-op.
    pub fn revoke(&self, token: &str) {
        let exp = token
            .split_once('.')
            .and_then(|(payload, _)| decode_claims(payload))
            .map(|c| c.exp);
        if let Some(exp) = exp {
            self.revoked.write().insert(token.to_string(), exp);
        }
    }

    /// Drop revocation entries whose token has expired on its own.
    /// Returns the number of entries removed.
    pub fn sweep(&self) -> usize {
        let now = Utc::now().timestamp();
        let mut map = self.revoked.write();
        let before = map.len();
        map.retain(|_, exp| *exp > now);
        before - map.len()
    }

    pub fn revoked_len(&self) -> usize {
        self.revoked.read().len()
    }
}

fn decode_claims(payload: &str) -> Option<Claims> {
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    serde_json::from_slice(&bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault() -> TokenVault {
        TokenVault::new("test-secret", Duration::from_secs(3600))
    }

    #[test]
    fn issue_then_validate() {
        let v = vault();
        let id = Uuid::new_v4();
        let tok = v.issue(id, Role::Manager);
        let claims = v.validate(&tok).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.role, Role::Manager);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn garbage_is_malformed() {
        let v = vault();
        assert_eq!(v.validate("not a token"), Err(TokenError::Malformed));
        assert_eq!(v.validate("a.b"), Err(TokenError::Malformed));
    }

    #[test]
    fn tampered_signature_is_malformed() {
        let v = vault();
        let tok = v.issue(Uuid::new_v4(), Role::User);
        let (payload, _) = tok.split_once('.').unwrap();
        let forged = format!("{payload}.{}", URL_SAFE_NO_PAD.encode([0u8; 32]));
        assert_eq!(v.validate(&forged), Err(TokenError::Malformed));
    }

    #[test]
    fn wrong_secret_is_malformed() {
        let v = vault();
        let tok = v.issue(Uuid::new_v4(), Role::User);
        let other = TokenVault::new("different-secret", Duration::from_secs(3600));
        assert_eq!(other.validate(&tok), Err(TokenError::Malformed));
    }

    #[test]
    fn zero_ttl_expires_immediately() {
        let v = TokenVault::new("test-secret", Duration::from_secs(0));
        let tok = v.issue(Uuid::new_v4(), Role::User);
        assert_eq!(v.validate(&tok), Err(TokenError::Expired));
    }

    #[test]
    fn revoke_blocks_reuse_and_is_idempotent() {
        let v = vault();
        let tok = v.issue(Uuid::new_v4(), Role::User);
        assert!(v.validate(&tok).is_ok());
        v.revoke(&tok);
        assert_eq!(v.validate(&tok), Err(TokenError::Revoked));
        v.revoke(&tok);
        assert_eq!(v.validate(&tok), Err(TokenError::Revoked));
        assert_eq!(v.revoked_len(), 1);
    }

    #[test]
    fn expiry_is_reported_before_revocation() {
        let v = vault();
        let now = Utc::now().timestamp();
        let stale = Claims { sub: Uuid::new_v4(), role: Role::User, iat: now - 120, exp: now - 60 };
        let tok = v.encode(&stale);
        v.revoke(&tok);
        assert_eq!(v.validate(&tok), Err(TokenError::Expired));
    }

    #[test]
    fn sweep_drops_only_expired_entries() {
        let v = vault();
        let now = Utc::now().timestamp();
        let stale = v.encode(&Claims { sub: Uuid::new_v4(), role: Role::User, iat: now - 120, exp: now - 60 });
        let live = v.issue(Uuid::new_v4(), Role::User);
        v.revoke(&stale);
        v.revoke(&live);
        assert_eq!(v.revoked_len(), 2);
        assert_eq!(v.sweep(), 1);
        assert_eq!(v.revoked_len(), 1);
        assert_eq!(v.validate(&live), Err(TokenError::Revoked));
    }

    #[test]
    fn revoking_garbage_is_a_noop() {
        let v = vault();
        v.revoke("complete nonsense");
        assert_eq!(v.revoked_len(), 0);
    }
}
