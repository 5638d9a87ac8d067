use std::collections::BTreeMap;
use std::fmt;

use chrono::Duration;
use serde::Deserialize;
use serde::Serialize;

/// Current layout of [`SessionClaims`]. Tokens carrying any other version are rejected.
pub const SESSION_CLAIMS_VERSION: u16 = 1;

/// How the session holder proved their identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    Local,
    External,
}

impl AuthType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthType::Local => "local",
            AuthType::External => "external",
        }
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session token payload.
///
/// Registered claims are typed fields owned by the issuer. Auxiliary values
/// live only inside `ext`, so nothing a caller adds can shadow `sub`, `exp`
/// or `auth_type`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SessionClaims {
    /// Claims layout version
    pub ver: u16,

    /// Subject (account email)
    pub sub: String,

    pub auth_type: AuthType,

    /// Identity provider, for external sessions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Extension claims
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ext: BTreeMap<String, serde_json::Value>,
}

impl SessionClaims {
    /// Check if token is expired.
    ///
    /// A token stays valid through the second named by `exp`.
    pub fn is_expired(&self, current_timestamp: i64) -> bool {
        self.exp < current_timestamp
    }

    /// Get an extension claim as a string.
    pub fn extension_str(&self, key: &str) -> Option<&str> {
        self.ext.get(key).and_then(|v| v.as_str())
    }
}

/// Request to mint a session token.
///
/// Built with the `with_*` methods and handed to
/// [`SessionTokenService::issue`](crate::session::SessionTokenService::issue).
#[derive(Debug, Clone, PartialEq)]
pub struct SessionGrant {
    pub subject: String,
    pub auth_type: AuthType,
    pub provider: Option<String>,
    pub ext: BTreeMap<String, serde_json::Value>,
    pub ttl: Option<Duration>,
}

impl SessionGrant {
    /// Grant for a password-authenticated account.
    pub fn local(subject: impl ToString) -> Self {
        Self {
            subject: subject.to_string(),
            auth_type: AuthType::Local,
            provider: None,
            ext: BTreeMap::new(),
            ttl: None,
        }
    }

    /// Grant for an account authenticated by an identity provider.
    pub fn external(subject: impl ToString, provider: impl ToString) -> Self {
        Self {
            subject: subject.to_string(),
            auth_type: AuthType::External,
            provider: Some(provider.to_string()),
            ext: BTreeMap::new(),
            ttl: None,
        }
    }

    /// Add an extension claim.
    pub fn with_claim(mut self, key: impl ToString, value: impl Serialize) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.ext.insert(key.to_string(), json_value);
        }
        self
    }

    /// Override the service's default lifetime.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_grant() {
        let grant = SessionGrant::local("a@x.com");

        assert_eq!(grant.subject, "a@x.com");
        assert_eq!(grant.auth_type, AuthType::Local);
        assert!(grant.provider.is_none());
        assert!(grant.ttl.is_none());
    }

    #[test]
    fn test_external_grant_builder() {
        let grant = SessionGrant::external("b@y.com", "google")
            .with_claim("user_id", "42")
            .with_ttl(Duration::minutes(5));

        assert_eq!(grant.auth_type, AuthType::External);
        assert_eq!(grant.provider.as_deref(), Some("google"));
        assert_eq!(grant.ext.get("user_id").unwrap().as_str(), Some("42"));
        assert_eq!(grant.ttl, Some(Duration::minutes(5)));
    }

    #[test]
    fn test_is_expired() {
        let claims = SessionClaims {
            ver: SESSION_CLAIMS_VERSION,
            sub: "a@x.com".to_string(),
            auth_type: AuthType::Local,
            provider: None,
            iat: 0,
            exp: 1000,
            ext: BTreeMap::new(),
        };

        assert!(!claims.is_expired(999));
        assert!(!claims.is_expired(1000)); // Exactly at expiration
        assert!(claims.is_expired(1001));
    }

    #[test]
    fn test_extension_cannot_shadow_subject() {
        let claims = SessionClaims {
            ver: SESSION_CLAIMS_VERSION,
            sub: "a@x.com".to_string(),
            auth_type: AuthType::Local,
            provider: None,
            iat: 0,
            exp: 1000,
            ext: BTreeMap::from([("sub".to_string(), serde_json::json!("root@x.com"))]),
        };

        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["sub"], "a@x.com");
        assert_eq!(json["ext"]["sub"], "root@x.com");

        let decoded: SessionClaims = serde_json::from_value(json).unwrap();
        assert_eq!(decoded.sub, "a@x.com");
    }

    #[test]
    fn test_unknown_top_level_claim_rejected() {
        let json = serde_json::json!({
            "ver": 1,
            "sub": "a@x.com",
            "auth_type": "local",
            "iat": 0,
            "exp": 10,
            "role": "admin"
        });

        assert!(serde_json::from_value::<SessionClaims>(json).is_err());
    }

    #[test]
    fn test_auth_type_wire_format() {
        assert_eq!(
            serde_json::to_value(AuthType::External).unwrap(),
            serde_json::json!("external")
        );
        assert_eq!(AuthType::Local.to_string(), "local");
    }
}
