use async_trait::async_trait;
use chrono::DateTime;
use chrono::NaiveDate;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::account::errors::StoreError;
use crate::domain::account::models::AccountId;
use crate::domain::account::models::EmailAddress;
use crate::domain::account::models::ExternalAccount;
use crate::domain::account::models::LocalAccount;
use crate::domain::account::models::Profile;
use crate::domain::account::ports::UserStore;

const LOCAL_COLUMNS: &str = "id, email, password_hash, first_name, last_name, phone, \
     date_of_birth, age, gender, blood_group, address, city, state, zip_code, \
     emergency_contact_name, emergency_contact_phone, created_at";

const EXTERNAL_COLUMNS: &str = "id, provider, provider_subject, email, given_name, \
     family_name, picture_url, created_at, last_login";

#[derive(sqlx::FromRow)]
struct LocalAccountRow {
    id: Uuid,
    email: String,
    password_hash: String,
    first_name: Option<String>,
    last_name: Option<String>,
    phone: Option<String>,
    date_of_birth: Option<NaiveDate>,
    age: Option<i32>,
    gender: Option<String>,
    blood_group: Option<String>,
    address: Option<String>,
    city: Option<String>,
    state: Option<String>,
    zip_code: Option<String>,
    emergency_contact_name: Option<String>,
    emergency_contact_phone: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<LocalAccountRow> for LocalAccount {
    type Error = StoreError;

    fn try_from(r: LocalAccountRow) -> Result<Self, Self::Error> {
        Ok(LocalAccount {
            id: AccountId(r.id),
            email: stored_email(r.email)?,
            profile: Profile {
                first_name: r.first_name,
                last_name: r.last_name,
                phone: r.phone,
                date_of_birth: r.date_of_birth,
                age: r.age,
                gender: r.gender,
                blood_group: r.blood_group,
                address: r.address,
                city: r.city,
                state: r.state,
                zip_code: r.zip_code,
                emergency_contact_name: r.emergency_contact_name,
                emergency_contact_phone: r.emergency_contact_phone,
            },
            password_hash: r.password_hash,
            created_at: r.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ExternalAccountRow {
    id: Uuid,
    provider: String,
    provider_subject: String,
    email: String,
    given_name: Option<String>,
    family_name: Option<String>,
    picture_url: Option<String>,
    created_at: DateTime<Utc>,
    last_login: DateTime<Utc>,
}

impl TryFrom<ExternalAccountRow> for ExternalAccount {
    type Error = StoreError;

    fn try_from(r: ExternalAccountRow) -> Result<Self, Self::Error> {
        Ok(ExternalAccount {
            id: AccountId(r.id),
            provider: r.provider,
            provider_subject: r.provider_subject,
            email: stored_email(r.email)?,
            given_name: r.given_name,
            family_name: r.family_name,
            picture_url: r.picture_url,
            created_at: r.created_at,
            last_login: r.last_login,
        })
    }
}

fn stored_email(raw: String) -> Result<EmailAddress, StoreError> {
    EmailAddress::new(raw).map_err(|e| StoreError::Database(format!("corrupt email column: {}", e)))
}

fn database_error(e: sqlx::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

/// Map a write failure, recognising the email unique constraints.
fn write_error(e: sqlx::Error, email: &EmailAddress) -> StoreError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation()
            && matches!(
                db_err.constraint(),
                Some("local_accounts_email_key") | Some("external_accounts_email_key")
            )
        {
            return StoreError::DuplicateEmail(email.as_str().to_string());
        }
    }
    database_error(e)
}

pub struct PostgresUserStore {
    pool: PgPool,
}

impl PostgresUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PostgresUserStore {
    async fn find_local_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<LocalAccount>, StoreError> {
        let row = sqlx::query_as::<_, LocalAccountRow>(&format!(
            "SELECT {} FROM local_accounts WHERE email = $1",
            LOCAL_COLUMNS
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        row.map(LocalAccount::try_from).transpose()
    }

    async fn insert_local(&self, account: LocalAccount) -> Result<LocalAccount, StoreError> {
        let profile = &account.profile;

        sqlx::query(&format!(
            "INSERT INTO local_accounts ({}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
            LOCAL_COLUMNS
        ))
        .bind(account.id.0)
        .bind(account.email.as_str())
        .bind(&account.password_hash)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.phone)
        .bind(profile.date_of_birth)
        .bind(profile.age)
        .bind(&profile.gender)
        .bind(&profile.blood_group)
        .bind(&profile.address)
        .bind(&profile.city)
        .bind(&profile.state)
        .bind(&profile.zip_code)
        .bind(&profile.emergency_contact_name)
        .bind(&profile.emergency_contact_phone)
        .bind(account.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, &account.email))?;

        Ok(account)
    }

    async fn find_external_by_provider_and_subject(
        &self,
        provider: &str,
        subject: &str,
    ) -> Result<Option<ExternalAccount>, StoreError> {
        let row = sqlx::query_as::<_, ExternalAccountRow>(&format!(
            "SELECT {} FROM external_accounts WHERE provider = $1 AND provider_subject = $2",
            EXTERNAL_COLUMNS
        ))
        .bind(provider)
        .bind(subject)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        row.map(ExternalAccount::try_from).transpose()
    }

    async fn find_external_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<ExternalAccount>, StoreError> {
        let row = sqlx::query_as::<_, ExternalAccountRow>(&format!(
            "SELECT {} FROM external_accounts WHERE email = $1",
            EXTERNAL_COLUMNS
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        row.map(ExternalAccount::try_from).transpose()
    }

    async fn upsert_external(
        &self,
        account: ExternalAccount,
    ) -> Result<ExternalAccount, StoreError> {
        let row = sqlx::query_as::<_, ExternalAccountRow>(&format!(
            "INSERT INTO external_accounts ({columns}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT ON CONSTRAINT external_accounts_provider_subject_key \
             DO UPDATE SET last_login = GREATEST(external_accounts.last_login, EXCLUDED.last_login) \
             RETURNING {columns}",
            columns = EXTERNAL_COLUMNS
        ))
        .bind(account.id.0)
        .bind(&account.provider)
        .bind(&account.provider_subject)
        .bind(account.email.as_str())
        .bind(&account.given_name)
        .bind(&account.family_name)
        .bind(&account.picture_url)
        .bind(account.created_at)
        .bind(account.last_login)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error(e, &account.email))?;

        ExternalAccount::try_from(row)
    }

    async fn record_external_login(
        &self,
        id: &AccountId,
        at: DateTime<Utc>,
    ) -> Result<ExternalAccount, StoreError> {
        let row = sqlx::query_as::<_, ExternalAccountRow>(&format!(
            "UPDATE external_accounts SET last_login = GREATEST(last_login, $2) \
             WHERE id = $1 RETURNING {}",
            EXTERNAL_COLUMNS
        ))
        .bind(id.0)
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        row.map(ExternalAccount::try_from)
            .transpose()?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}
