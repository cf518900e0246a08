use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::db::models::ExchangeRecord;
use crate::error::AppError;
use crate::services::InitiateExchange;

#[derive(Debug, Deserialize)]
pub struct ExchangeFundsPayload {
    pub from_operator: String,
    pub to_operator: String,
    pub amount: BigDecimal,
    pub from_phone: String,
    pub to_phone: String,
}

#[derive(Debug, Serialize)]
pub struct ExchangeFundsResponse {
    pub transaction_id: Uuid,
    pub from_operator: String,
    pub to_operator: String,
    pub amount: BigDecimal,
    pub fee: BigDecimal,
    pub total_amount: BigDecimal,
    pub status: String,
}

pub async fn exchange_funds(
    State(state): State<AppState>,
    Json(payload): Json<ExchangeFundsPayload>,
) -> Result<impl IntoResponse, AppError> {
    let record = state
        .exchange
        .initiate(InitiateExchange {
            from_operator: payload.from_operator,
            to_operator: payload.to_operator,
            amount: payload.amount,
            from_phone: payload.from_phone,
            to_phone: payload.to_phone,
        })
        .await?;

    let total_amount = record.total_amount();
    Ok(Json(ExchangeFundsResponse {
        transaction_id: record.id,
        from_operator: record.from_operator,
        to_operator: record.to_operator,
        amount: record.amount,
        fee: record.fee,
        total_amount,
        status: record.status,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ConfirmPayload {
    #[serde(rename = "pinCode")]
    pub pin_code: String,
}

#[derive(Debug, Serialize)]
pub struct ConfirmResponse {
    pub message: String,
    pub data: ConfirmData,
}

#[derive(Debug, Serialize)]
pub struct ConfirmData {
    pub from_operator: String,
    pub to_operator: String,
    pub amount: BigDecimal,
    pub balance_before: Option<BigDecimal>,
    pub balance_after: Option<BigDecimal>,
    pub transaction_id: Uuid,
}

pub async fn confirm_exchange(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ConfirmPayload>,
) -> Result<impl IntoResponse, AppError> {
    let record = state.exchange.confirm(id, &payload.pin_code).await?;

    Ok(Json(ConfirmResponse {
        message: "exchange completed successfully".to_string(),
        data: ConfirmData {
            from_operator: record.from_operator,
            to_operator: record.to_operator,
            amount: record.amount,
            balance_before: record.balance_before,
            balance_after: record.balance_after,
            transaction_id: record.id,
        },
    }))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ExchangeRecord>, AppError> {
    let record = state.exchange.get(id).await?;

    Ok(Json(record))
}
