use std::sync::Arc;

use chrono::Duration;
use thiserror::Error;

use crate::clock::Clock;
use crate::jwt::JwtError;
use crate::jwt::JwtHandler;
use crate::jwt::SessionClaims;
use crate::jwt::SessionGrant;
use crate::jwt::SESSION_CLAIMS_VERSION;

/// Lifetime applied when a grant does not carry its own.
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 30;

/// Session token errors.
///
/// Validation collapses every failure into one variant so callers cannot
/// tell a forged token from an expired one.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,

    #[error("Failed to issue token: {0}")]
    IssueFailed(String),
}

/// Issues and validates stateless, signed session tokens.
///
/// Nothing is stored server-side: a token is valid exactly when its
/// signature checks out and the clock has not passed its `exp`. There is no
/// way to revoke a token before it expires.
pub struct SessionTokenService {
    jwt_handler: JwtHandler,
    clock: Arc<dyn Clock>,
    default_ttl: Duration,
}

impl SessionTokenService {
    /// Create a session token service.
    ///
    /// # Arguments
    /// * `signing_secret` - HS256 secret
    /// * `default_ttl` - Lifetime for grants without their own TTL
    /// * `clock` - Time source for `iat`/`exp` and expiry checks
    pub fn new(signing_secret: &[u8], default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            jwt_handler: JwtHandler::new(signing_secret),
            clock,
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Mint a token for `grant`.
    ///
    /// `sub`, `iat`, `exp` and `auth_type` always come from the grant and the
    /// clock; extension claims are carried in `ext` untouched.
    ///
    /// # Errors
    /// * `IssueFailed` - Token encoding failed
    pub fn issue(&self, grant: SessionGrant) -> Result<String, SessionError> {
        let now = self.clock.now();
        let ttl = grant.ttl.unwrap_or(self.default_ttl);

        let claims = SessionClaims {
            ver: SESSION_CLAIMS_VERSION,
            sub: grant.subject,
            auth_type: grant.auth_type,
            provider: grant.provider,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            ext: grant.ext,
        };

        self.jwt_handler
            .encode(&claims)
            .map_err(|e| SessionError::IssueFailed(e.to_string()))
    }

    /// Validate a token and return its subject.
    ///
    /// # Errors
    /// * `InvalidOrExpiredToken` - Any signature, structure, version or expiry failure
    pub fn validate(&self, token: &str) -> Result<String, SessionError> {
        self.validate_claims(token).map(|claims| claims.sub)
    }

    /// Validate a token and return all of its claims.
    ///
    /// # Errors
    /// * `InvalidOrExpiredToken` - Any signature, structure, version or expiry failure
    pub fn validate_claims(&self, token: &str) -> Result<SessionClaims, SessionError> {
        let claims: SessionClaims = self.jwt_handler.decode(token).map_err(|e: JwtError| {
            tracing::debug!(reason = %e, "Session token rejected");
            SessionError::InvalidOrExpiredToken
        })?;

        if claims.ver != SESSION_CLAIMS_VERSION {
            tracing::debug!(version = claims.ver, "Session token has unsupported version");
            return Err(SessionError::InvalidOrExpiredToken);
        }

        if claims.is_expired(self.clock.now().timestamp()) {
            tracing::debug!(exp = claims.exp, "Session token expired");
            return Err(SessionError::InvalidOrExpiredToken);
        }

        Ok(claims)
    }
}
