use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use super::ApiError;
use super::ApiSuccess;
use crate::account::errors::EmailError;
use crate::account::errors::ProfileError;
use crate::domain::account::models::EmailAddress;
use crate::domain::account::models::Profile;
use crate::domain::account::models::RegisterCommand;
use crate::inbound::http::router::AppState;

const MAX_FIELD_LENGTH: usize = 255;
const MAX_AGE: i32 = 150;

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<ApiSuccess<RegisterResponseData>, ApiError> {
    state
        .gateway
        .register(body.try_into_command()?)
        .await
        .map_err(ApiError::from)
        .map(|_| {
            ApiSuccess::new(
                StatusCode::CREATED,
                RegisterResponseData {
                    message: "User created".to_string(),
                },
            )
        })
}

/// HTTP request body for registering a local account (raw JSON)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegisterRequest {
    email: String,
    password: String,
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
}

#[derive(Debug, Clone, Error)]
enum ParseRegisterRequestError {
    #[error("Invalid email: {0}")]
    Email(#[from] EmailError),

    #[error("Invalid profile: {0}")]
    Profile(#[from] ProfileError),
}

impl RegisterRequest {
    fn try_into_command(self) -> Result<RegisterCommand, ParseRegisterRequestError> {
        let email = EmailAddress::new(self.email)?;
        if self.password.is_empty() {
            return Err(ProfileError::EmptyPassword.into());
        }
        if let Some(age) = self.age.filter(|age| !(0..=MAX_AGE).contains(age)) {
            return Err(ProfileError::InvalidAge(age).into());
        }

        let profile = Profile {
            first_name: text_field("first_name", self.first_name)?,
            last_name: text_field("last_name", self.last_name)?,
            phone: text_field("phone", self.phone)?,
            date_of_birth: self.date_of_birth,
            age: self.age,
            gender: text_field("gender", self.gender)?,
            blood_group: text_field("blood_group", self.blood_group)?,
            address: text_field("address", self.address)?,
            city: text_field("city", self.city)?,
            state: text_field("state", self.state)?,
            zip_code: text_field("zip_code", self.zip_code)?,
            emergency_contact_name: text_field(
                "emergency_contact_name",
                self.emergency_contact_name,
            )?,
            emergency_contact_phone: text_field(
                "emergency_contact_phone",
                self.emergency_contact_phone,
            )?,
        };

        Ok(RegisterCommand::new(email, self.password, profile))
    }
}

/// Trim a free-text field; blank becomes absent.
fn text_field(field: &'static str, value: Option<String>) -> Result<Option<String>, ProfileError> {
    let Some(value) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    if value.chars().count() > MAX_FIELD_LENGTH {
        return Err(ProfileError::FieldTooLong {
            field,
            max: MAX_FIELD_LENGTH,
        });
    }

    Ok(Some(value))
}

impl From<ParseRegisterRequestError> for ApiError {
    fn from(err: ParseRegisterRequestError) -> Self {
        ApiError::UnprocessableEntity(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterResponseData {
    pub message: String,
}
