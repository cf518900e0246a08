//! Gateway for the Wave mobile-money API.
//!
//! Wave uses a pooled manager account: deposits and withdrawals are
//! authorized with the configured manager credentials, and the customer PIN
//! travels in the clear over Wave's own channel (no encryption step).

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::{Config as CircuitConfig, Error as FailsafeError, StateMachine, backoff, failure_policy};
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;

use super::{GatewayError, OperatorError, OperatorGateway, WithdrawalReceipt};
use crate::config::WaveConfig;
use crate::domain::Operator;

const OPERATOR: &str = "Wave";

#[derive(Clone)]
pub struct WaveGateway {
    client: Client,
    config: WaveConfig,
    circuit_breaker: StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>,
}

impl WaveGateway {
    pub fn new(config: WaveConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        let backoff = backoff::equal_jittered(Duration::from_secs(60), Duration::from_secs(120));
        let policy = failure_policy::consecutive_failures(3, backoff);
        let circuit_breaker = CircuitConfig::new().failure_policy(policy).build();

        WaveGateway {
            client,
            config,
            circuit_breaker,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<(u16, String), OperatorError> {
        let result = self
            .circuit_breaker
            .call(async move {
                let response = request.send().await.map_err(|e| OperatorError::Transport {
                    operator: OPERATOR,
                    source: e,
                })?;

                let status = response.status().as_u16();
                let body = response.text().await.map_err(|e| OperatorError::Transport {
                    operator: OPERATOR,
                    source: e,
                })?;

                Ok::<_, OperatorError>((status, body))
            })
            .await;

        match result {
            Ok(pair) => Ok(pair),
            Err(FailsafeError::Rejected) => Err(OperatorError::CircuitOpen { operator: OPERATOR }),
            Err(FailsafeError::Inner(e)) => Err(e),
        }
    }

    async fn post(
        &self,
        action: &'static str,
        path: &str,
        payload: Value,
    ) -> Result<Value, OperatorError> {
        let request = self.client.post(self.url(path)).json(&payload);

        let (status, body) = self.send(request).await?;
        match super::parse_success(OPERATOR, status, body) {
            Ok(value) => Ok(value),
            Err(err) => {
                super::log_rejection(OPERATOR, action, &payload, &err);
                Err(err)
            }
        }
    }
}

#[async_trait]
impl OperatorGateway for WaveGateway {
    fn operator(&self) -> Operator {
        Operator::Wave
    }

    async fn prepare_credential(&self, pin: &str) -> Result<String, GatewayError> {
        // Wave accepts the PIN as-is on its own channel.
        Ok(pin.to_string())
    }

    async fn check_balance(
        &self,
        msisdn: &str,
        credential: &str,
    ) -> Result<BigDecimal, OperatorError> {
        let payload = json!({
            "client_phone": msisdn,
            "pin": credential,
        });

        let response = self.post("balance", "/balance", payload).await?;
        super::require_decimal(&response, OPERATOR, "balance")
    }

    async fn withdraw(
        &self,
        amount: &BigDecimal,
        msisdn: &str,
    ) -> Result<WithdrawalReceipt, OperatorError> {
        let payload = json!({
            "client_phone": msisdn,
            "amount": amount.to_string(),
            "manager_phone": self.config.manager_msisdn,
            "manager_pin": self.config.manager_pin,
        });

        let response = self.post("withdraw", "/withdraw", payload).await?;
        let reference = super::require_str(&response, OPERATOR, "transaction_id")?;

        Ok(WithdrawalReceipt { reference })
    }

    async fn confirm_withdrawal(
        &self,
        reference: &str,
        msisdn: &str,
        credential: &str,
    ) -> Result<(), OperatorError> {
        let payload = json!({
            "client_phone": msisdn,
            "pin": credential,
        });

        let path = format!("/withdraw/{reference}/confirm");
        self.post("confirm", &path, payload).await?;

        Ok(())
    }

    async fn deposit(&self, amount: &BigDecimal, msisdn: &str) -> Result<(), OperatorError> {
        let payload = json!({
            "manager_phone": self.config.manager_msisdn,
            "amount": amount.to_string(),
            "manager_pin": self.config.manager_pin,
            "client_phone": msisdn,
        });

        let response = self.post("deposit", "/deposit", payload).await?;
        if response.get("transaction").is_none() {
            return Err(OperatorError::MissingField {
                operator: OPERATOR,
                field: "transaction",
                body: response.to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn gateway(base_url: String) -> WaveGateway {
        WaveGateway::new(WaveConfig {
            base_url,
            manager_msisdn: "780000000".to_string(),
            manager_pin: "0000".to_string(),
        })
    }

    #[tokio::test]
    async fn prepare_credential_passes_pin_through() {
        let credential = gateway("http://127.0.0.1:1".to_string())
            .prepare_credential("1234")
            .await
            .unwrap();

        assert_eq!(credential, "1234");
    }

    #[tokio::test]
    async fn check_balance_parses_balance_field() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/balance")
            .with_status(200)
            .with_body(r#"{"balance": "2500.50"}"#)
            .create_async()
            .await;

        let balance = gateway(server.url())
            .check_balance("781234567", "1234")
            .await
            .unwrap();

        assert_eq!(balance, BigDecimal::from_str("2500.50").unwrap());
    }

    #[tokio::test]
    async fn withdraw_normalizes_snake_case_reference() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/withdraw")
            .with_status(200)
            .with_body(r#"{"transaction_id": "WV-777"}"#)
            .create_async()
            .await;

        let receipt = gateway(server.url())
            .withdraw(&BigDecimal::from_str("1010").unwrap(), "781234567")
            .await
            .unwrap();

        assert_eq!(receipt.reference, "WV-777");
    }

    #[tokio::test]
    async fn withdraw_accepts_numeric_reference() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/withdraw")
            .with_status(200)
            .with_body(r#"{"transaction_id": 4452}"#)
            .create_async()
            .await;

        let receipt = gateway(server.url())
            .withdraw(&BigDecimal::from_str("1010").unwrap(), "781234567")
            .await
            .unwrap();

        assert_eq!(receipt.reference, "4452");
    }

    #[tokio::test]
    async fn deposit_requires_transaction_object() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/deposit")
            .with_status(200)
            .with_body(r#"{"message": "deposit recorded"}"#)
            .create_async()
            .await;

        let result = gateway(server.url())
            .deposit(&BigDecimal::from_str("505").unwrap(), "781234567")
            .await;

        assert!(matches!(
            result,
            Err(OperatorError::MissingField {
                field: "transaction",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn deposit_succeeds_with_transaction_details() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/deposit")
            .with_status(200)
            .with_body(
                r#"{"message": "deposit successful", "transaction": {"id": 987, "amount": "505"}}"#,
            )
            .create_async()
            .await;

        gateway(server.url())
            .deposit(&BigDecimal::from_str("505").unwrap(), "781234567")
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn deposit_surfaces_operator_error_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/deposit")
            .with_status(422)
            .with_body(r#"{"message": "account blocked"}"#)
            .create_async()
            .await;

        let err = gateway(server.url())
            .deposit(&BigDecimal::from_str("505").unwrap(), "781234567")
            .await
            .unwrap_err();

        match err {
            OperatorError::UnexpectedStatus { status, body, .. } => {
                assert_eq!(status, 422);
                assert!(body.contains("account blocked"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
