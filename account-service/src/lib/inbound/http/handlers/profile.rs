use axum::http::StatusCode;
use axum::Extension;
use chrono::DateTime;
use chrono::NaiveDate;
use chrono::Utc;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::account::models::CurrentUser;

/// Return the account behind the bearer token.
///
/// The account is resolved by the authentication middleware.
pub async fn profile(
    Extension(current_user): Extension<CurrentUser>,
) -> Result<ApiSuccess<ProfileResponseData>, ApiError> {
    Ok(ApiSuccess::new(StatusCode::OK, (&current_user).into()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "user_type", rename_all = "snake_case")]
pub enum ProfileResponseData {
    Local(LocalProfileData),
    External(ExternalProfileData),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalProfileData {
    pub id: String,
    pub email: String,
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
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalProfileData {
    pub id: String,
    pub email: String,
    pub provider: String,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub picture_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
}

impl From<&CurrentUser> for ProfileResponseData {
    fn from(user: &CurrentUser) -> Self {
        match user {
            CurrentUser::Local(account) => {
                let profile = account.profile.clone();
                ProfileResponseData::Local(LocalProfileData {
                    id: account.id.to_string(),
                    email: account.email.as_str().to_string(),
                    first_name: profile.first_name,
                    last_name: profile.last_name,
                    phone: profile.phone,
                    date_of_birth: profile.date_of_birth,
                    age: profile.age,
                    gender: profile.gender,
                    blood_group: profile.blood_group,
                    address: profile.address,
                    city: profile.city,
                    state: profile.state,
                    zip_code: profile.zip_code,
                    emergency_contact_name: profile.emergency_contact_name,
                    emergency_contact_phone: profile.emergency_contact_phone,
                    created_at: account.created_at,
                })
            }
            CurrentUser::External(account) => ProfileResponseData::External(ExternalProfileData {
                id: account.id.to_string(),
                email: account.email.as_str().to_string(),
                provider: account.provider.clone(),
                given_name: account.given_name.clone(),
                family_name: account.family_name.clone(),
                picture_url: account.picture_url.clone(),
                created_at: account.created_at,
                last_login: account.last_login,
            }),
        }
    }
}
