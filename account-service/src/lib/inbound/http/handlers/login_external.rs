use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::login::TokenResponseData;
use super::ApiError;
use super::ApiSuccess;
use crate::inbound::http::router::AppState;

pub async fn login_external(
    State(state): State<AppState>,
    Json(body): Json<ExternalLoginRequestBody>,
) -> Result<ApiSuccess<TokenResponseData>, ApiError> {
    if body.id_token.trim().is_empty() {
        return Err(ApiError::UnprocessableEntity(
            "id_token must not be empty".to_string(),
        ));
    }

    state
        .gateway
        .login_external(body.id_token.trim())
        .await
        .map_err(ApiError::from)
        .map(|ref token| ApiSuccess::new(StatusCode::OK, token.into()))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExternalLoginRequestBody {
    id_token: String,
}
