//! Operator gateway boundary.
//!
//! One implementation per mobile-money operator. All protocol divergence
//! (endpoint shapes, response field names, PIN encryption requirements)
//! stays behind this interface; the orchestrator never branches on which
//! operator it is talking to.

pub mod orange;
pub mod wave;

pub use orange::OrangeGateway;
pub use wave::WaveGateway;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

use crate::config::Config;
use crate::crypto::CryptoError;
use crate::domain::Operator;
use crate::utils::sanitize::sanitize_json;

#[derive(Error, Debug)]
pub enum OperatorError {
    #[error("{operator} request failed: {source}")]
    Transport {
        operator: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operator} returned status {status}: {body}")]
    UnexpectedStatus {
        operator: &'static str,
        status: u16,
        body: String,
    },

    #[error("{operator} response missing field `{field}`: {body}")]
    MissingField {
        operator: &'static str,
        field: &'static str,
        body: String,
    },

    #[error("{operator} returned an unparseable response body: {body}")]
    InvalidBody {
        operator: &'static str,
        body: String,
    },

    #[error("{operator} circuit breaker is open")]
    CircuitOpen { operator: &'static str },
}

/// Failure preparing the transmission credential: either the key fetch
/// (operator side) or the encryption itself.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error(transparent)]
    Operator(#[from] OperatorError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Withdrawal reference, normalized across operator response shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawalReceipt {
    pub reference: String,
}

/// Capability set every operator exposes. Each call is one synchronous
/// request with no retries; the caller decides what a failure means.
#[async_trait]
pub trait OperatorGateway: Send + Sync {
    fn operator(&self) -> Operator;

    /// Turns the customer PIN into whatever this operator accepts on the
    /// wire. Orange mandates RSA encryption under a freshly fetched public
    /// key; Wave takes the PIN as-is.
    async fn prepare_credential(&self, pin: &str) -> Result<String, GatewayError>;

    async fn check_balance(
        &self,
        msisdn: &str,
        credential: &str,
    ) -> Result<BigDecimal, OperatorError>;

    /// Initiates a withdrawal. The amount is reserved on the operator side
    /// until `confirm_withdrawal` lands; an unconfirmed withdrawal lapses.
    async fn withdraw(
        &self,
        amount: &BigDecimal,
        msisdn: &str,
    ) -> Result<WithdrawalReceipt, OperatorError>;

    async fn confirm_withdrawal(
        &self,
        reference: &str,
        msisdn: &str,
        credential: &str,
    ) -> Result<(), OperatorError>;

    async fn deposit(&self, amount: &BigDecimal, msisdn: &str) -> Result<(), OperatorError>;
}

/// Holds the configured gateway per operator.
#[derive(Clone)]
pub struct OperatorRegistry {
    orange: Arc<OrangeGateway>,
    wave: Arc<WaveGateway>,
}

impl OperatorRegistry {
    pub fn new(config: &Config) -> Self {
        Self {
            orange: Arc::new(OrangeGateway::new(config.orange.clone())),
            wave: Arc::new(WaveGateway::new(config.wave.clone())),
        }
    }

    pub fn gateway(&self, operator: Operator) -> Arc<dyn OperatorGateway> {
        match operator {
            Operator::Orange => self.orange.clone(),
            Operator::Wave => self.wave.clone(),
        }
    }
}

pub(crate) fn parse_success(
    operator: &'static str,
    status: u16,
    body: String,
) -> Result<Value, OperatorError> {
    if !(200..300).contains(&status) {
        return Err(OperatorError::UnexpectedStatus {
            operator,
            status,
            body,
        });
    }

    if body.trim().is_empty() {
        // Acknowledgement endpoints answer with an empty body.
        return Ok(Value::Null);
    }

    serde_json::from_str(&body).map_err(|_| OperatorError::InvalidBody { operator, body })
}

pub(crate) fn require_str(
    payload: &Value,
    operator: &'static str,
    field: &'static str,
) -> Result<String, OperatorError> {
    match payload.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(OperatorError::MissingField {
            operator,
            field,
            body: payload.to_string(),
        }),
    }
}

pub(crate) fn require_decimal(
    payload: &Value,
    operator: &'static str,
    field: &'static str,
) -> Result<BigDecimal, OperatorError> {
    let raw = match payload.get(field) {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => {
            return Err(OperatorError::MissingField {
                operator,
                field,
                body: payload.to_string(),
            });
        }
    };

    BigDecimal::from_str(&raw).map_err(|_| OperatorError::InvalidBody {
        operator,
        body: payload.to_string(),
    })
}

pub(crate) fn log_rejection(
    operator: &'static str,
    action: &'static str,
    payload: &Value,
    err: &OperatorError,
) {
    tracing::error!(
        operator,
        action,
        payload = %sanitize_json(payload),
        error = %err,
        "operator call failed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_success_rejects_error_status() {
        let result = parse_success("Orange", 503, "unavailable".to_string());
        assert!(matches!(
            result,
            Err(OperatorError::UnexpectedStatus { status: 503, .. })
        ));
    }

    #[test]
    fn parse_success_accepts_empty_ack_body() {
        let result = parse_success("Orange", 200, "".to_string());
        assert_eq!(result.unwrap(), Value::Null);
    }

    #[test]
    fn parse_success_rejects_non_json_body() {
        let result = parse_success("Wave", 200, "<html>".to_string());
        assert!(matches!(result, Err(OperatorError::InvalidBody { .. })));
    }

    #[test]
    fn require_str_accepts_numeric_identifiers() {
        let payload = json!({ "transaction_id": 987 });
        assert_eq!(
            require_str(&payload, "Wave", "transaction_id").unwrap(),
            "987"
        );
    }

    #[test]
    fn require_str_reports_missing_field() {
        let payload = json!({ "status": "ok" });
        let err = require_str(&payload, "Orange", "transactionId").unwrap_err();
        assert!(matches!(
            err,
            OperatorError::MissingField {
                field: "transactionId",
                ..
            }
        ));
        assert!(err.to_string().contains("Orange"));
    }

    #[test]
    fn require_decimal_accepts_numbers_and_strings() {
        let payload = json!({ "value": 10000, "balance": "2500.50" });
        assert_eq!(
            require_decimal(&payload, "Orange", "value").unwrap(),
            BigDecimal::from(10000)
        );
        assert_eq!(
            require_decimal(&payload, "Wave", "balance").unwrap(),
            BigDecimal::from_str("2500.50").unwrap()
        );
    }
}
