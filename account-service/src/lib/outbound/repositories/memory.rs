use std::collections::HashMap;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::account::errors::StoreError;
use crate::domain::account::models::AccountId;
use crate::domain::account::models::EmailAddress;
use crate::domain::account::models::ExternalAccount;
use crate::domain::account::models::LocalAccount;
use crate::domain::account::ports::UserStore;

#[derive(Default)]
struct Accounts {
    local: HashMap<EmailAddress, LocalAccount>,
    external: HashMap<AccountId, ExternalAccount>,
}

/// Process-local account store.
///
/// Used when no database is configured and in tests. Every operation runs
/// under one lock, which gives it the same uniqueness guarantees as the
/// Postgres constraints.
#[derive(Default)]
pub struct InMemoryUserStore {
    accounts: RwLock<Accounts>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all external accounts.
    pub async fn external_accounts(&self) -> Vec<ExternalAccount> {
        self.accounts.read().await.external.values().cloned().collect()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_local_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<LocalAccount>, StoreError> {
        Ok(self.accounts.read().await.local.get(email).cloned())
    }

    async fn insert_local(&self, account: LocalAccount) -> Result<LocalAccount, StoreError> {
        let mut accounts = self.accounts.write().await;

        if accounts.local.contains_key(&account.email) {
            return Err(StoreError::DuplicateEmail(account.email.to_string()));
        }

        accounts
            .local
            .insert(account.email.clone(), account.clone());

        Ok(account)
    }

    async fn find_external_by_provider_and_subject(
        &self,
        provider: &str,
        subject: &str,
    ) -> Result<Option<ExternalAccount>, StoreError> {
        Ok(self
            .accounts
            .read()
            .await
            .external
            .values()
            .find(|a| a.provider == provider && a.provider_subject == subject)
            .cloned())
    }

    async fn find_external_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<ExternalAccount>, StoreError> {
        Ok(self
            .accounts
            .read()
            .await
            .external
            .values()
            .find(|a| &a.email == email)
            .cloned())
    }

    async fn upsert_external(
        &self,
        account: ExternalAccount,
    ) -> Result<ExternalAccount, StoreError> {
        let mut accounts = self.accounts.write().await;

        if let Some(existing) = accounts.external.values_mut().find(|a| {
            a.provider == account.provider && a.provider_subject == account.provider_subject
        }) {
            existing.last_login = existing.last_login.max(account.last_login);
            return Ok(existing.clone());
        }

        if accounts.external.values().any(|a| a.email == account.email) {
            return Err(StoreError::DuplicateEmail(account.email.to_string()));
        }

        accounts.external.insert(account.id, account.clone());

        Ok(account)
    }

    async fn record_external_login(
        &self,
        id: &AccountId,
        at: DateTime<Utc>,
    ) -> Result<ExternalAccount, StoreError> {
        let mut accounts = self.accounts.write().await;

        let account = accounts
            .external
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        account.last_login = account.last_login.max(at);

        Ok(account.clone())
    }
}
