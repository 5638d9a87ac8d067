use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::account::errors::AuthError;
use crate::account::errors::StoreError;
use crate::domain::account::models::AccessToken;
use crate::domain::account::models::AccountId;
use crate::domain::account::models::CurrentUser;
use crate::domain::account::models::EmailAddress;
use crate::domain::account::models::ExternalAccount;
use crate::domain::account::models::LocalAccount;
use crate::domain::account::models::LocalLoginCommand;
use crate::domain::account::models::RegisterCommand;

/// Port for authentication operations exposed to inbound adapters.
#[async_trait]
pub trait AuthGatewayPort: Send + Sync + 'static {
    /// Register a new local account.
    ///
    /// # Arguments
    /// * `command` - Validated command containing email, password, and profile
    ///
    /// # Returns
    /// Created local account
    ///
    /// # Errors
    /// * `EmailAlreadyRegistered` - A local account already uses this email
    /// * `Storage` - Database operation failed
    async fn register(&self, command: RegisterCommand) -> Result<LocalAccount, AuthError>;

    /// Sign in with email and password.
    ///
    /// # Arguments
    /// * `command` - Raw email and password
    ///
    /// # Returns
    /// Bearer session token for a local user
    ///
    /// # Errors
    /// * `InvalidCredentials` - Unknown email or wrong password, indistinguishably
    /// * `Storage` - Database operation failed
    async fn login_local(&self, command: LocalLoginCommand) -> Result<AccessToken, AuthError>;

    /// Sign in with an identity provider ID token.
    ///
    /// The external account is created on first login and its last login
    /// time refreshed afterwards.
    ///
    /// # Arguments
    /// * `raw_token` - Compact JWS issued by the configured provider
    ///
    /// # Returns
    /// Bearer session token for an external user
    ///
    /// # Errors
    /// * `InvalidExternalToken` - Token failed verification
    /// * `UpstreamTimeout` - Signing keys could not be fetched in time
    /// * `UpstreamUnavailable` - Signing key endpoint failed
    /// * `EmailAlreadyRegistered` - Email is linked to another provider identity
    /// * `Storage` - Database operation failed
    async fn login_external(&self, raw_token: &str) -> Result<AccessToken, AuthError>;

    /// Resolve the account behind a session token.
    ///
    /// # Arguments
    /// * `token` - Session token from the Authorization header
    ///
    /// # Returns
    /// Local or external account named by the token
    ///
    /// # Errors
    /// * `InvalidOrExpiredToken` - Token is forged, malformed, or expired
    /// * `UserNotFound` - Token is valid but the account no longer exists
    /// * `Storage` - Database operation failed
    async fn resolve_current_user(&self, token: &str) -> Result<CurrentUser, AuthError>;
}

/// Persistence operations for local and external accounts.
#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    /// Retrieve local account by email.
    ///
    /// # Arguments
    /// * `email` - Normalized email address
    ///
    /// # Returns
    /// Optional local account (None if not found)
    ///
    /// # Errors
    /// * `Database` - Database operation failed
    async fn find_local_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<LocalAccount>, StoreError>;

    /// Persist new local account.
    ///
    /// # Arguments
    /// * `account` - Local account to create
    ///
    /// # Returns
    /// Created local account
    ///
    /// # Errors
    /// * `DuplicateEmail` - A local account already uses this email
    /// * `Database` - Database operation failed
    async fn insert_local(&self, account: LocalAccount) -> Result<LocalAccount, StoreError>;

    /// Retrieve external account by provider identity.
    ///
    /// # Arguments
    /// * `provider` - Provider name
    /// * `subject` - Provider-issued subject identifier
    ///
    /// # Returns
    /// Optional external account (None if not found)
    ///
    /// # Errors
    /// * `Database` - Database operation failed
    async fn find_external_by_provider_and_subject(
        &self,
        provider: &str,
        subject: &str,
    ) -> Result<Option<ExternalAccount>, StoreError>;

    /// Retrieve external account by email.
    ///
    /// # Arguments
    /// * `email` - Normalized email address
    ///
    /// # Returns
    /// Optional external account (None if not found)
    ///
    /// # Errors
    /// * `Database` - Database operation failed
    async fn find_external_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<ExternalAccount>, StoreError>;

    /// Insert an external account, or refresh the existing one.
    ///
    /// Atomic on (provider, provider_subject): when a row already exists for
    /// the identity it is kept, and only its last login moves forward. Two
    /// concurrent first logins therefore end with one row.
    ///
    /// # Arguments
    /// * `account` - Candidate account built from verified claims
    ///
    /// # Returns
    /// The stored account (existing or newly created)
    ///
    /// # Errors
    /// * `DuplicateEmail` - Email belongs to a different provider identity
    /// * `Database` - Database operation failed
    async fn upsert_external(&self, account: ExternalAccount)
        -> Result<ExternalAccount, StoreError>;

    /// Move an external account's last login forward.
    ///
    /// Never moves it backwards: the stored value becomes max(stored, at).
    ///
    /// # Arguments
    /// * `id` - External account ID
    /// * `at` - Login instant
    ///
    /// # Returns
    /// Updated external account
    ///
    /// # Errors
    /// * `NotFound` - Account does not exist
    /// * `Database` - Database operation failed
    async fn record_external_login(
        &self,
        id: &AccountId,
        at: DateTime<Utc>,
    ) -> Result<ExternalAccount, StoreError>;
}
