//! Ledger queries.
//!
//! Every mutation is guarded by a `WHERE status = ...` clause: a terminal
//! row (`completed`, `failed`) can never change again, and the
//! pending→processing compare-and-swap in [`claim_pending`] is what makes
//! concurrent confirm calls mutually exclusive.

use sqlx::types::BigDecimal;
use sqlx::{PgPool, Result};
use uuid::Uuid;

use crate::db::models::ExchangeRecord;
use crate::domain::ExchangeStatus;

pub async fn insert_exchange(pool: &PgPool, tx: &ExchangeRecord) -> Result<ExchangeRecord> {
    sqlx::query_as::<_, ExchangeRecord>(
        r#"
        INSERT INTO transactions (
            id, from_operator, to_operator, customer_msisdn, receiver_msisdn,
            amount, fee, status, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(tx.id)
    .bind(&tx.from_operator)
    .bind(&tx.to_operator)
    .bind(&tx.customer_msisdn)
    .bind(&tx.receiver_msisdn)
    .bind(&tx.amount)
    .bind(&tx.fee)
    .bind(&tx.status)
    .bind(tx.created_at)
    .bind(tx.updated_at)
    .fetch_one(pool)
    .await
}

pub async fn get_exchange(pool: &PgPool, id: Uuid) -> Result<Option<ExchangeRecord>> {
    sqlx::query_as::<_, ExchangeRecord>("SELECT * FROM transactions WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Claims a pending exchange for processing. Of two concurrent confirm
/// calls, exactly one gets the row back; the other sees `None`.
pub async fn claim_pending(pool: &PgPool, id: Uuid) -> Result<Option<ExchangeRecord>> {
    sqlx::query_as::<_, ExchangeRecord>(
        r#"
        UPDATE transactions
        SET status = $2, updated_at = NOW()
        WHERE id = $1 AND status = $3
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(ExchangeStatus::Processing.as_str())
    .bind(ExchangeStatus::Pending.as_str())
    .fetch_optional(pool)
    .await
}

/// Records the source balance observed by a successful balance check.
pub async fn record_balance_before(pool: &PgPool, id: Uuid, balance: &BigDecimal) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE transactions
        SET balance_before = $2, updated_at = NOW()
        WHERE id = $1 AND status = $3
        "#,
    )
    .bind(id)
    .bind(balance)
    .bind(ExchangeStatus::Processing.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Terminal write for a fully settled exchange.
pub async fn complete_exchange(
    pool: &PgPool,
    id: Uuid,
    balance_after: &BigDecimal,
    reference: &str,
) -> Result<Option<ExchangeRecord>> {
    sqlx::query_as::<_, ExchangeRecord>(
        r#"
        UPDATE transactions
        SET status = $2, balance_after = $3, transaction_id = $4, updated_at = NOW()
        WHERE id = $1 AND status = $5
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(ExchangeStatus::Completed.as_str())
    .bind(balance_after)
    .bind(reference)
    .bind(ExchangeStatus::Processing.as_str())
    .fetch_optional(pool)
    .await
}

/// Terminal write for an aborted exchange; the message names the leg that
/// failed so operations can reconcile cross-operator state by hand.
pub async fn fail_exchange(pool: &PgPool, id: Uuid, message: &str) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE transactions
        SET status = $2, error_message = $3, updated_at = NOW()
        WHERE id = $1 AND status = $4
        "#,
    )
    .bind(id)
    .bind(ExchangeStatus::Failed.as_str())
    .bind(message)
    .bind(ExchangeStatus::Processing.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
