use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::account::models::AccessToken;
use crate::domain::account::models::LocalLoginCommand;
use crate::inbound::http::router::AppState;

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequestBody>,
) -> Result<ApiSuccess<TokenResponseData>, ApiError> {
    let command = LocalLoginCommand {
        email: body.email,
        password: body.password,
    };

    state
        .gateway
        .login_local(command)
        .await
        .map_err(ApiError::from)
        .map(|ref token| ApiSuccess::new(StatusCode::OK, token.into()))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginRequestBody {
    email: String,
    password: String,
}

/// Token payload shared by both login routes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenResponseData {
    pub access_token: String,
    pub token_type: String,
    pub user_type: String,
}

impl From<&AccessToken> for TokenResponseData {
    fn from(token: &AccessToken) -> Self {
        Self {
            access_token: token.token.clone(),
            token_type: token.token_type.to_string(),
            user_type: token.user_type.as_str().to_string(),
        }
    }
}
