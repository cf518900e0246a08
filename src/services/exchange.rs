//! Funds-exchange saga coordinator.
//!
//! `initiate` computes the fee and opens a pending ledger entry without
//! touching any operator. `confirm` runs the cross-operator sequence
//! (credential, balance check, withdraw, deposit, confirm withdrawal) as
//! one linear pass with no retries. There is no distributed commit across the
//! two operators; the source operator's two-phase withdraw protocol is the
//! compensation boundary. A withdrawal that was initiated but never
//! confirmed lapses on the operator side, which is why a failed deposit
//! deliberately skips the confirmation step. A confirmation failure after
//! a successful deposit cannot be unwound automatically and is recorded
//! for manual reconciliation.

use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;

use crate::db::models::ExchangeRecord;
use crate::db::queries;
use crate::domain::{self, Operator};
use crate::error::AppError;
use crate::operators::OperatorRegistry;
use crate::validation::{self, ValidationError};

#[derive(Debug)]
pub struct InitiateExchange {
    pub from_operator: String,
    pub to_operator: String,
    pub amount: bigdecimal::BigDecimal,
    pub from_phone: String,
    pub to_phone: String,
}

#[derive(Clone)]
pub struct ExchangeService {
    pool: PgPool,
    operators: OperatorRegistry,
}

impl ExchangeService {
    pub fn new(pool: PgPool, operators: OperatorRegistry) -> Self {
        Self { pool, operators }
    }

    /// Opens a pending exchange: validates the request, fixes the fee, and
    /// persists the ledger entry. No external calls happen here.
    pub async fn initiate(&self, input: InitiateExchange) -> Result<ExchangeRecord, AppError> {
        let mut errors: Vec<ValidationError> = Vec::new();

        let from = validation::validate_operator("from_operator", &input.from_operator)
            .map_err(|e| errors.push(e))
            .ok();
        let to = validation::validate_operator("to_operator", &input.to_operator)
            .map_err(|e| errors.push(e))
            .ok();
        if let (Some(from), Some(to)) = (from, to) {
            if from == to {
                errors.push(ValidationError::new(
                    "to_operator",
                    "must differ from from_operator",
                ));
            }
        }
        if let Err(e) = validation::validate_amount(&input.amount) {
            errors.push(e);
        }
        if let Err(e) = validation::validate_msisdn("from_phone", &input.from_phone) {
            errors.push(e);
        }
        if let Err(e) = validation::validate_msisdn("to_phone", &input.to_phone) {
            errors.push(e);
        }

        if !errors.is_empty() {
            return Err(AppError::Validation(validation::describe(&errors)));
        }

        let from = Operator::from_str(validation::sanitize_string(&input.from_operator).as_str())
            .map_err(|e| AppError::Validation(e.to_string()))?;
        let to = Operator::from_str(validation::sanitize_string(&input.to_operator).as_str())
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let fee = domain::exchange_fee(&input.amount)
            .ok_or_else(|| AppError::Validation("amount: out of supported range".to_string()))?;

        let record = ExchangeRecord::new(
            from,
            to,
            validation::sanitize_string(&input.from_phone),
            validation::sanitize_string(&input.to_phone),
            input.amount,
            fee,
        );

        let inserted = queries::insert_exchange(&self.pool, &record).await?;

        tracing::info!(
            id = %inserted.id,
            from = %inserted.from_operator,
            to = %inserted.to_operator,
            amount = %inserted.amount,
            fee = %inserted.fee,
            "exchange initiated"
        );

        Ok(inserted)
    }

    /// Runs the exchange saga for a pending transaction.
    ///
    /// Claims the row with a pending→processing compare-and-swap before the
    /// first external call, so a second confirm for the same id fails with
    /// `InvalidState` instead of re-running side-effecting calls. Every
    /// failure past the claim lands as one terminal `failed` write whose
    /// message names the leg that broke.
    pub async fn confirm(&self, id: Uuid, pin: &str) -> Result<ExchangeRecord, AppError> {
        validation::validate_pin(pin).map_err(|e| AppError::Validation(e.to_string()))?;

        let record = match queries::claim_pending(&self.pool, id).await? {
            Some(record) => record,
            None => {
                return match queries::get_exchange(&self.pool, id).await? {
                    None => Err(AppError::NotFound(format!("transaction {id} not found"))),
                    Some(existing) => Err(AppError::InvalidState(format!(
                        "transaction {id} is {}; confirm requires a pending transaction",
                        existing.status
                    ))),
                };
            }
        };

        let (from, to) = match self.resolve_operators(&record) {
            Ok(pair) => pair,
            Err(err) => {
                let message = format!("ledger record unreadable: {err}");
                return Err(self.abort(&record, message, err).await);
            }
        };

        // Fixed at initiate time; never recomputed here.
        let total = record.total_amount();
        let source = self.operators.gateway(from);
        let destination = self.operators.gateway(to);

        let credential = match source.prepare_credential(pin).await {
            Ok(credential) => credential,
            Err(err) => {
                let err = AppError::from(err);
                let message = format!("credential preparation for {} failed: {err}", from.label());
                return Err(self.abort(&record, message, err).await);
            }
        };

        let balance_before = match source.check_balance(&record.customer_msisdn, &credential).await
        {
            Ok(balance) => balance,
            Err(err) => {
                let message = format!("balance check on {} failed: {err}", from.label());
                return Err(self.abort(&record, message, AppError::Operator(err)).await);
            }
        };

        queries::record_balance_before(&self.pool, record.id, &balance_before).await?;

        if balance_before < total {
            let err = AppError::InsufficientFunds {
                operator: from.label(),
                available: balance_before.clone(),
                required: total.clone(),
            };
            let message = err.to_string();
            return Err(self.abort(&record, message, err).await);
        }

        let receipt = match source.withdraw(&total, &record.customer_msisdn).await {
            Ok(receipt) => receipt,
            Err(err) => {
                // Nothing left the source account: the withdrawal is only a
                // reservation until confirmed.
                let message = format!("withdrawal initiation on {} failed: {err}", from.label());
                return Err(self.abort(&record, message, AppError::Operator(err)).await);
            }
        };

        if let Err(err) = destination.deposit(&total, &record.receiver_msisdn).await {
            // Confirming the withdrawal here would debit the customer for a
            // deposit that never landed; the unconfirmed reservation lapses
            // on the operator side instead.
            let message = format!(
                "deposit to {} failed: {err}; withdrawal {} on {} left unconfirmed",
                to.label(),
                receipt.reference,
                from.label()
            );
            return Err(self.abort(&record, message, AppError::Operator(err)).await);
        }

        if let Err(err) = source
            .confirm_withdrawal(&receipt.reference, &record.customer_msisdn, &credential)
            .await
        {
            let message = format!(
                "withdrawal confirmation on {} failed after deposit to {} succeeded; \
                 manual reconciliation required for withdrawal {}: {err}",
                from.label(),
                to.label(),
                receipt.reference
            );
            return Err(self.abort(&record, message, AppError::Operator(err)).await);
        }

        let balance_after = &balance_before - &total;
        let completed =
            queries::complete_exchange(&self.pool, record.id, &balance_after, &receipt.reference)
                .await?
                .ok_or_else(|| {
                    AppError::InvalidState(format!(
                        "transaction {} left the processing state mid-flight",
                        record.id
                    ))
                })?;

        tracing::info!(
            id = %completed.id,
            reference = %receipt.reference,
            balance_after = %balance_after,
            "exchange completed"
        );

        Ok(completed)
    }

    pub async fn get(&self, id: Uuid) -> Result<ExchangeRecord, AppError> {
        queries::get_exchange(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("transaction {id} not found")))
    }

    fn resolve_operators(&self, record: &ExchangeRecord) -> Result<(Operator, Operator), AppError> {
        let from = Operator::from_str(&record.from_operator)
            .map_err(|e| AppError::Internal(format!("ledger record {}: {e}", record.id)))?;
        let to = Operator::from_str(&record.to_operator)
            .map_err(|e| AppError::Internal(format!("ledger record {}: {e}", record.id)))?;
        Ok((from, to))
    }

    /// Writes the terminal `failed` state and hands back the error to
    /// propagate. A failure of the terminal write itself takes precedence:
    /// at that point the ledger makes no promise about the row.
    async fn abort(&self, record: &ExchangeRecord, message: String, err: AppError) -> AppError {
        tracing::error!(id = %record.id, error = %message, "exchange failed");

        match queries::fail_exchange(&self.pool, record.id, &message).await {
            Ok(0) => {
                tracing::error!(
                    id = %record.id,
                    "failure write matched no processing row; ledger state is ambiguous"
                );
                err
            }
            Ok(_) => err,
            Err(db_err) => {
                tracing::error!(
                    id = %record.id,
                    error = %db_err,
                    "could not record exchange failure"
                );
                AppError::Database(db_err)
            }
        }
    }
}
