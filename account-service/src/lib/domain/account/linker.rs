use std::sync::Arc;

use auth::Clock;
use auth::IdentityClaims;
use auth::PasswordHasher;
use chrono::DateTime;
use chrono::Utc;

use crate::account::errors::AuthError;
use crate::account::errors::ProfileError;
use crate::account::errors::StoreError;
use crate::account::ports::UserStore;
use crate::domain::account::models::AccountId;
use crate::domain::account::models::EmailAddress;
use crate::domain::account::models::ExternalAccount;
use crate::domain::account::models::LocalAccount;
use crate::domain::account::models::RegisterCommand;

/// Creates accounts and links provider identities to them.
pub struct AccountLinker<S>
where
    S: UserStore,
{
    store: Arc<S>,
    password_hasher: PasswordHasher,
    clock: Arc<dyn Clock>,
}

impl<S> AccountLinker<S>
where
    S: UserStore,
{
    /// Create a new linker over the given store.
    ///
    /// # Arguments
    /// * `store` - Account persistence implementation
    /// * `clock` - Time source for creation and last login stamps
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            password_hasher: PasswordHasher::new(),
            clock,
        }
    }

    /// Register a local account, hashing the password off the async runtime.
    ///
    /// # Errors
    /// * `MalformedInput` - Password is empty
    /// * `EmailAlreadyRegistered` - A local account already uses this email
    /// * `Storage` - Database operation failed
    pub async fn register_local(
        &self,
        command: RegisterCommand,
    ) -> Result<LocalAccount, AuthError> {
        if command.password.is_empty() {
            return Err(ProfileError::EmptyPassword.into());
        }

        // Skip the hash when the email is visibly taken; the unique
        // constraint still decides races.
        if self
            .store
            .find_local_by_email(&command.email)
            .await?
            .is_some()
        {
            return Err(AuthError::EmailAlreadyRegistered);
        }

        let password_hash = self
            .password_hasher
            .hash_on_worker(command.password)
            .await?;

        let account = LocalAccount {
            id: AccountId::new(),
            email: command.email,
            profile: command.profile,
            password_hash,
            created_at: self.clock.now(),
        };

        let created = self.store.insert_local(account).await?;

        tracing::info!(account_id = %created.id, "Local account registered");

        Ok(created)
    }

    /// Find or create the external account for verified provider claims.
    ///
    /// An existing account keeps its stored profile; only its last login is
    /// moved forward.
    ///
    /// # Errors
    /// * `InvalidExternalToken` - Provider email is not a usable address
    /// * `EmailAlreadyRegistered` - Email is linked to another provider identity
    /// * `Storage` - Database operation failed
    pub async fn link_external(
        &self,
        claims: &IdentityClaims,
        provider: &str,
    ) -> Result<ExternalAccount, AuthError> {
        let email = EmailAddress::new(claims.email.clone()).map_err(|e| {
            tracing::warn!(provider, error = %e, "Provider returned an unusable email");
            AuthError::InvalidExternalToken
        })?;
        let now = self.clock.now();

        if let Some(existing) = self
            .store
            .find_external_by_provider_and_subject(provider, &claims.subject)
            .await?
        {
            let updated = self.store.record_external_login(&existing.id, now).await?;
            tracing::debug!(account_id = %updated.id, provider, "External login recorded");
            return Ok(updated);
        }

        let candidate = ExternalAccount::from_identity(claims, provider, email, now);
        let candidate_id = candidate.id;
        let stored = match self.store.upsert_external(candidate).await {
            Ok(stored) => stored,
            // A concurrent first login of the same identity can commit
            // between our lookup and insert and trip the email constraint.
            Err(StoreError::DuplicateEmail(_)) => {
                return self.recover_from_email_conflict(claims, provider, now).await;
            }
            Err(e) => return Err(e.into()),
        };

        if stored.id == candidate_id {
            tracing::info!(account_id = %stored.id, provider, "External account created");
        } else {
            tracing::debug!(
                account_id = %stored.id,
                provider,
                "External account created concurrently, reusing it"
            );
        }

        Ok(stored)
    }

    async fn recover_from_email_conflict(
        &self,
        claims: &IdentityClaims,
        provider: &str,
        now: DateTime<Utc>,
    ) -> Result<ExternalAccount, AuthError> {
        match self
            .store
            .find_external_by_provider_and_subject(provider, &claims.subject)
            .await?
        {
            Some(winner) => {
                let updated = self.store.record_external_login(&winner.id, now).await?;
                tracing::debug!(
                    account_id = %updated.id,
                    provider,
                    "External account created concurrently, reusing it"
                );
                Ok(updated)
            }
            None => {
                tracing::debug!(provider, "Provider email is linked to another identity");
                Err(AuthError::EmailAlreadyRegistered)
            }
        }
    }
}
