use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::BigDecimal;
use uuid::Uuid;

use crate::domain::{ExchangeStatus, Operator};

/// One exchange attempt as persisted in the ledger. The row is the single
/// source of truth for the saga's status.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExchangeRecord {
    pub id: Uuid,
    pub from_operator: String,
    pub to_operator: String,
    pub customer_msisdn: String,
    pub receiver_msisdn: String,
    pub amount: BigDecimal,
    pub fee: BigDecimal,
    pub balance_before: Option<BigDecimal>,
    pub balance_after: Option<BigDecimal>,
    pub status: String,
    pub transaction_id: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExchangeRecord {
    pub fn new(
        from_operator: Operator,
        to_operator: Operator,
        customer_msisdn: String,
        receiver_msisdn: String,
        amount: BigDecimal,
        fee: BigDecimal,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            from_operator: from_operator.as_str().to_string(),
            to_operator: to_operator.as_str().to_string(),
            customer_msisdn,
            receiver_msisdn,
            amount,
            fee,
            balance_before: None,
            balance_after: None,
            status: ExchangeStatus::Pending.as_str().to_string(),
            transaction_id: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Amount debited from the source account: principal plus fee.
    pub fn total_amount(&self) -> BigDecimal {
        &self.amount + &self.fee
    }
}
