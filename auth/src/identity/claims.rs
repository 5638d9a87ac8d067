use serde::Deserialize;
use serde::Serialize;

use super::errors::IdentityError;

/// Normalized identity extracted from a verified provider token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Provider-scoped stable user identifier
    pub subject: String,
    pub email: String,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    /// Avatar URL
    pub picture: Option<String>,
}

/// Payload of a provider ID token, as the provider names things.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ProviderClaims {
    pub sub: String,
    pub exp: i64,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub email_verified: Option<serde_json::Value>,

    #[serde(default, alias = "first_name")]
    pub given_name: Option<String>,

    #[serde(default, alias = "last_name")]
    pub family_name: Option<String>,

    #[serde(default, alias = "avatar_url")]
    pub picture: Option<String>,
}

impl ProviderClaims {
    /// Map provider fields onto [`IdentityClaims`].
    ///
    /// # Errors
    /// * `InvalidToken` - Subject or email missing, or email explicitly unverified
    pub fn into_identity(self) -> Result<IdentityClaims, IdentityError> {
        if self.sub.trim().is_empty() {
            return Err(IdentityError::invalid("empty subject"));
        }

        let email = self
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .ok_or_else(|| IdentityError::invalid("missing email claim"))?;

        // Some providers send the flag as a string.
        let unverified = match &self.email_verified {
            Some(serde_json::Value::Bool(verified)) => !verified,
            Some(serde_json::Value::String(verified)) => !verified.eq_ignore_ascii_case("true"),
            _ => false,
        };
        if unverified {
            return Err(IdentityError::invalid("email not verified by provider"));
        }

        Ok(IdentityClaims {
            subject: self.sub,
            email,
            given_name: non_empty(self.given_name),
            family_name: non_empty(self.family_name),
            picture: non_empty(self.picture),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
