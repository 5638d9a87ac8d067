use std::sync::Arc;

use async_trait::async_trait;
use auth::AuthType;
use auth::Clock;
use auth::IdentityTokenVerifier;
use auth::PasswordHasher;
use auth::SessionGrant;
use auth::SessionTokenService;
use tokio::sync::OnceCell;

use crate::account::errors::AuthError;
use crate::account::linker::AccountLinker;
use crate::account::ports::AuthGatewayPort;
use crate::account::ports::UserStore;
use crate::domain::account::models::AccessToken;
use crate::domain::account::models::CurrentUser;
use crate::domain::account::models::EmailAddress;
use crate::domain::account::models::LocalAccount;
use crate::domain::account::models::LocalLoginCommand;
use crate::domain::account::models::RegisterCommand;

/// Verified against when a login names an unknown email, so that both
/// failure paths cost one Argon2 verification.
const TIMING_DECOY_PASSWORD: &str = "timing-decoy-password";

/// Identity provider the gateway accepts ID tokens from.
#[derive(Debug, Clone)]
pub struct ExternalProvider {
    /// Name stored on external accounts and session tokens
    pub name: String,
    /// Our client id at the provider, expected as token audience
    pub client_id: String,
}

/// Domain service implementation for authentication.
///
/// Concrete implementation of AuthGatewayPort with dependency injection.
pub struct AuthGateway<S>
where
    S: UserStore,
{
    store: Arc<S>,
    linker: AccountLinker<S>,
    password_hasher: PasswordHasher,
    identity_verifier: Arc<IdentityTokenVerifier>,
    sessions: Arc<SessionTokenService>,
    provider: ExternalProvider,
    decoy_hash: OnceCell<String>,
}

impl<S> AuthGateway<S>
where
    S: UserStore,
{
    /// Create a new gateway with injected dependencies.
    ///
    /// # Arguments
    /// * `store` - Account persistence implementation
    /// * `identity_verifier` - Provider ID token verifier
    /// * `sessions` - Session token issuer and validator
    /// * `provider` - Accepted identity provider
    /// * `clock` - Time source for account timestamps
    ///
    /// # Returns
    /// Configured gateway instance
    pub fn new(
        store: Arc<S>,
        identity_verifier: Arc<IdentityTokenVerifier>,
        sessions: Arc<SessionTokenService>,
        provider: ExternalProvider,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            linker: AccountLinker::new(Arc::clone(&store), clock),
            store,
            password_hasher: PasswordHasher::new(),
            identity_verifier,
            sessions,
            provider,
            decoy_hash: OnceCell::new(),
        }
    }

    async fn decoy_hash(&self) -> Result<String, AuthError> {
        let hash = self
            .decoy_hash
            .get_or_try_init(|| {
                self.password_hasher
                    .hash_on_worker(TIMING_DECOY_PASSWORD.to_string())
            })
            .await?;
        Ok(hash.clone())
    }

    async fn find_local(
        &self,
        email: Option<&EmailAddress>,
    ) -> Result<Option<LocalAccount>, AuthError> {
        match email {
            Some(email) => Ok(self.store.find_local_by_email(email).await?),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl<S> AuthGatewayPort for AuthGateway<S>
where
    S: UserStore,
{
    async fn register(&self, command: RegisterCommand) -> Result<LocalAccount, AuthError> {
        self.linker.register_local(command).await
    }

    async fn login_local(&self, command: LocalLoginCommand) -> Result<AccessToken, AuthError> {
        let email = EmailAddress::new(command.email).ok();
        let account = self.find_local(email.as_ref()).await?;

        let Some(account) = account else {
            let decoy = self.decoy_hash().await?;
            self.password_hasher
                .verify_on_worker(command.password, decoy)
                .await?;
            tracing::debug!(auth_type = "local", "Login failed");
            return Err(AuthError::InvalidCredentials);
        };

        let verified = self
            .password_hasher
            .verify_on_worker(command.password, account.password_hash.clone())
            .await?;

        if !verified {
            tracing::debug!(account_id = %account.id, auth_type = "local", "Login failed");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.sessions.issue(
            SessionGrant::local(account.email.as_str())
                .with_claim("user_id", account.id.to_string()),
        )?;

        tracing::info!(account_id = %account.id, auth_type = "local", "Login succeeded");

        Ok(AccessToken::bearer(token, AuthType::Local))
    }

    async fn login_external(&self, raw_token: &str) -> Result<AccessToken, AuthError> {
        let claims = self
            .identity_verifier
            .verify(raw_token, &self.provider.client_id)
            .await
            .map_err(|e| {
                tracing::warn!(
                    provider = %self.provider.name,
                    error = %e,
                    "Provider token rejected"
                );
                AuthError::from(e)
            })?;

        let account = self.linker.link_external(&claims, &self.provider.name).await?;

        let token = self.sessions.issue(
            SessionGrant::external(account.email.as_str(), &account.provider)
                .with_claim("user_id", account.id.to_string()),
        )?;

        tracing::info!(
            account_id = %account.id,
            auth_type = "external",
            provider = %account.provider,
            "Login succeeded"
        );

        Ok(AccessToken::bearer(token, AuthType::External))
    }

    async fn resolve_current_user(&self, token: &str) -> Result<CurrentUser, AuthError> {
        let claims = self.sessions.validate_claims(token)?;

        // A token we signed with a subject we cannot parse names nobody.
        let email = EmailAddress::new(claims.sub).map_err(|_| AuthError::UserNotFound)?;

        match claims.auth_type {
            AuthType::Local => self
                .store
                .find_local_by_email(&email)
                .await?
                .map(CurrentUser::Local)
                .ok_or(AuthError::UserNotFound),
            AuthType::External => self
                .store
                .find_external_by_email(&email)
                .await?
                .filter(|account| {
                    claims
                        .provider
                        .as_deref()
                        .map_or(true, |provider| provider == account.provider)
                })
                .map(CurrentUser::External)
                .ok_or(AuthError::UserNotFound),
        }
    }
}
