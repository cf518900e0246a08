//! Diagnostic PIN-encryption endpoint.
//!
//! Lets operations staff produce an operator-ready ciphertext (for example
//! to provision the retailer PIN held in configuration). Gated by a shared
//! token so it is never an open encryption oracle.

use axum::{Json, extract::State, http::HeaderMap, response::IntoResponse};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::domain::Operator;
use crate::error::AppError;
use crate::validation;

pub const DIAGNOSTICS_TOKEN_HEADER: &str = "x-diagnostics-token";

#[derive(Debug, Deserialize)]
pub struct EncryptPinPayload {
    #[serde(rename = "pinCode")]
    pub pin_code: String,
}

#[derive(Debug, Serialize)]
pub struct EncryptPinResponse {
    #[serde(rename = "encryptedPinCode")]
    pub encrypted_pin_code: String,
}

pub async fn encrypt_pin(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<EncryptPinPayload>,
) -> Result<impl IntoResponse, AppError> {
    let token = headers
        .get(DIAGNOSTICS_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok());

    if token != Some(state.config.diagnostics_token.as_str()) {
        return Err(AppError::Unauthorized(
            "missing or invalid diagnostics token".to_string(),
        ));
    }

    validation::validate_pin(&payload.pin_code).map_err(|e| AppError::Validation(e.to_string()))?;

    let encrypted = state
        .operators
        .gateway(Operator::Orange)
        .prepare_credential(&payload.pin_code)
        .await
        .map_err(AppError::from)?;

    Ok(Json(EncryptPinResponse {
        encrypted_pin_code: encrypted,
    }))
}
