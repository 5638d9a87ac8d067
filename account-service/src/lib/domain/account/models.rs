use std::fmt;
use std::str::FromStr;

use auth::AuthType;
use auth::IdentityClaims;
use chrono::DateTime;
use chrono::NaiveDate;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::account::errors::EmailError;

/// Account unique identifier type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccountId(pub Uuid);

impl AccountId {
    /// Generate a new random account ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Email address type
///
/// Validated with an RFC 5322 parser and stored trimmed and lower-cased, so
/// lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Create a new validated email address.
    ///
    /// # Arguments
    /// * `email` - Raw email string
    ///
    /// # Returns
    /// Normalized EmailAddress value object
    ///
    /// # Errors
    /// * `InvalidFormat` - Email does not conform to RFC 5322
    pub fn new(email: String) -> Result<Self, EmailError> {
        let normalized = email.trim().to_lowercase();
        email_address::EmailAddress::from_str(&normalized)
            .map(|_| EmailAddress(normalized))
            .map_err(|e| EmailError::InvalidFormat(e.to_string()))
    }

    /// Get email as string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Personal details captured at registration.
///
/// Opaque to authentication: stored and returned, never interpreted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub blood_group: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
}

/// Account that signs in with email and password.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalAccount {
    pub id: AccountId,
    pub email: EmailAddress,
    pub profile: Profile,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Account that signs in through an identity provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalAccount {
    pub id: AccountId,
    pub provider: String,
    pub provider_subject: String,
    pub email: EmailAddress,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub picture_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
}

impl ExternalAccount {
    /// Build a first-login record from verified provider claims.
    pub fn from_identity(
        claims: &IdentityClaims,
        provider: &str,
        email: EmailAddress,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AccountId::new(),
            provider: provider.to_string(),
            provider_subject: claims.subject.clone(),
            email,
            given_name: claims.given_name.clone(),
            family_name: claims.family_name.clone(),
            picture_url: claims.picture.clone(),
            created_at: now,
            last_login: now,
        }
    }
}

/// Command to register a local account with domain types
#[derive(Debug)]
pub struct RegisterCommand {
    pub email: EmailAddress,
    pub password: String,
    pub profile: Profile,
}

impl RegisterCommand {
    /// Construct a new register command.
    ///
    /// # Arguments
    /// * `email` - Validated email address
    /// * `password` - Plain text password (will be hashed by the linker)
    /// * `profile` - Validated profile fields
    pub fn new(email: EmailAddress, password: String, profile: Profile) -> Self {
        Self {
            email,
            password,
            profile,
        }
    }
}

/// Command to sign in with email and password.
///
/// The email is kept raw: a malformed address must fail exactly like an
/// unknown one.
#[derive(Debug)]
pub struct LocalLoginCommand {
    pub email: String,
    pub password: String,
}

/// Bearer token handed out by a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub token_type: &'static str,
    pub user_type: AuthType,
}

impl AccessToken {
    pub fn bearer(token: String, user_type: AuthType) -> Self {
        Self {
            token,
            token_type: "bearer",
            user_type,
        }
    }
}

/// The account behind a session token.
#[derive(Debug, Clone, PartialEq)]
pub enum CurrentUser {
    Local(LocalAccount),
    External(ExternalAccount),
}

impl CurrentUser {
    pub fn email(&self) -> &EmailAddress {
        match self {
            CurrentUser::Local(account) => &account.email,
            CurrentUser::External(account) => &account.email,
        }
    }

    pub fn user_type(&self) -> AuthType {
        match self {
            CurrentUser::Local(_) => AuthType::Local,
            CurrentUser::External(_) => AuthType::External,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_is_normalized() {
        let email = EmailAddress::new("  Alice@Example.COM ".to_string()).unwrap();
        assert_eq!(email.as_str(), "alice@example.com");
        assert_eq!(
            email,
            EmailAddress::new("alice@example.com".to_string()).unwrap()
        );
    }

    #[test]
    fn test_invalid_email_rejected() {
        for raw in ["", "no-at-sign", "@example.com", "a@"] {
            assert!(matches!(
                EmailAddress::new(raw.to_string()),
                Err(EmailError::InvalidFormat(_))
            ));
        }
    }

    #[test]
    fn test_external_account_from_identity() {
        let claims = IdentityClaims {
            subject: "sub-1".to_string(),
            email: "ada@example.com".to_string(),
            given_name: Some("Ada".to_string()),
            family_name: None,
            picture: Some("https://example.com/ada.png".to_string()),
        };
        let now = Utc::now();
        let email = EmailAddress::new(claims.email.clone()).unwrap();

        let account = ExternalAccount::from_identity(&claims, "google", email, now);

        assert_eq!(account.provider, "google");
        assert_eq!(account.provider_subject, "sub-1");
        assert_eq!(account.given_name.as_deref(), Some("Ada"));
        assert_eq!(account.picture_url.as_deref(), Some("https://example.com/ada.png"));
        assert_eq!(account.created_at, now);
        assert_eq!(account.last_login, now);
    }

    #[test]
    fn test_current_user_role() {
        let account = LocalAccount {
            id: AccountId::new(),
            email: EmailAddress::new("a@x.com".to_string()).unwrap(),
            profile: Profile::default(),
            password_hash: "$argon2id$hash".to_string(),
            created_at: Utc::now(),
        };

        let user = CurrentUser::Local(account);
        assert_eq!(user.user_type(), AuthType::Local);
        assert_eq!(user.email().as_str(), "a@x.com");
    }
}
