//! Gateway for the Orange mobile-money API.
//!
//! Orange refuses cleartext PINs: every credential-bearing call carries the
//! PIN encrypted under the operator's published RSA key. Withdrawals are
//! two-phase: `/cashouts` reserves the amount, `/transactions/{id}/confirm`
//! debits it.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::Utc;
use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::{Config as CircuitConfig, Error as FailsafeError, StateMachine, backoff, failure_policy};
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use uuid::Uuid;

use super::{GatewayError, OperatorError, OperatorGateway, WithdrawalReceipt};
use crate::config::OrangeConfig;
use crate::crypto;
use crate::domain::Operator;

const OPERATOR: &str = "Orange";
const WALLET: &str = "PRINCIPAL";
const ID_TYPE: &str = "MSISDN";
const CURRENCY: &str = "XOF";

#[derive(Clone)]
pub struct OrangeGateway {
    client: Client,
    config: OrangeConfig,
    circuit_breaker: StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>,
}

impl OrangeGateway {
    pub fn new(config: OrangeConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        let backoff = backoff::equal_jittered(Duration::from_secs(60), Duration::from_secs(120));
        let policy = failure_policy::consecutive_failures(3, backoff);
        let circuit_breaker = CircuitConfig::new().failure_policy(policy).build();

        OrangeGateway {
            client,
            config,
            circuit_breaker,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Fetches the operator's current PIN-encryption key. Never cached:
    /// the operator rotates keys.
    pub async fn fetch_public_key(&self) -> Result<String, OperatorError> {
        let request = self
            .client
            .get(self.url("/publicKeys"))
            .bearer_auth(&self.config.access_token);

        let (status, body) = self.send(request).await?;
        let payload = super::parse_success(OPERATOR, status, body)?;
        super::require_str(&payload, OPERATOR, "key")
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
        let request = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.config.access_token)
            .json(&payload);

        let (status, body) = self.send(request).await?;
        match super::parse_success(OPERATOR, status, body) {
            Ok(value) => Ok(value),
            Err(err) => {
                super::log_rejection(OPERATOR, action, &payload, &err);
                Err(err)
            }
        }
    }

    /// Envelope shared by the cashout and cashin endpoints: the customer
    /// side of the movement plus the configured retailer partner account.
    fn transfer_payload(&self, amount: &BigDecimal, msisdn: &str) -> Value {
        json!({
            "amount": {
                "unit": CURRENCY,
                "value": amount.to_string(),
            },
            "customer": {
                "id": msisdn,
                "idType": ID_TYPE,
                "walletType": WALLET,
            },
            "partner": {
                "id": self.config.retailer_msisdn,
                "idType": ID_TYPE,
                "walletType": WALLET,
                "encryptedPinCode": self.config.retailer_pin,
            },
            "receiveNotification": true,
            "reference": Uuid::new_v4().to_string(),
            "requestDate": Utc::now().to_rfc3339(),
        })
    }
}

#[async_trait]
impl OperatorGateway for OrangeGateway {
    fn operator(&self) -> Operator {
        Operator::Orange
    }

    async fn prepare_credential(&self, pin: &str) -> Result<String, GatewayError> {
        let key_material = self.fetch_public_key().await?;
        let encrypted = crypto::encrypt_pin(pin, &key_material)?;
        Ok(encrypted)
    }

    async fn check_balance(
        &self,
        msisdn: &str,
        credential: &str,
    ) -> Result<BigDecimal, OperatorError> {
        let payload = json!({
            "id": msisdn,
            "encryptedPinCode": credential,
            "wallet": WALLET,
            "idType": ID_TYPE,
        });

        let response = self
            .post("balance", "/account/customer/balance", payload)
            .await?;
        super::require_decimal(&response, OPERATOR, "value")
    }

    async fn withdraw(
        &self,
        amount: &BigDecimal,
        msisdn: &str,
    ) -> Result<WithdrawalReceipt, OperatorError> {
        let payload = self.transfer_payload(amount, msisdn);

        let response = self.post("cashout", "/cashouts", payload).await?;
        let reference = super::require_str(&response, OPERATOR, "transactionId")?;

        Ok(WithdrawalReceipt { reference })
    }

    async fn confirm_withdrawal(
        &self,
        reference: &str,
        msisdn: &str,
        credential: &str,
    ) -> Result<(), OperatorError> {
        let payload = json!({
            "id": msisdn,
            "idType": ID_TYPE,
            "encryptedPinCode": credential,
        });

        let path = format!("/transactions/{reference}/confirm");
        self.post("confirm", &path, payload).await?;

        Ok(())
    }

    async fn deposit(&self, amount: &BigDecimal, msisdn: &str) -> Result<(), OperatorError> {
        let payload = self.transfer_payload(amount, msisdn);

        self.post("cashin", "/cashins", payload).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn gateway(base_url: String) -> OrangeGateway {
        OrangeGateway::new(OrangeConfig {
            base_url,
            access_token: "test-token".to_string(),
            retailer_msisdn: "770000000".to_string(),
            retailer_pin: "pre-encrypted".to_string(),
        })
    }

    #[tokio::test]
    async fn check_balance_parses_value_field() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/account/customer/balance")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"value": 10000}"#)
            .create_async()
            .await;

        let balance = gateway(server.url())
            .check_balance("771234567", "ciphertext")
            .await
            .unwrap();

        assert_eq!(balance, BigDecimal::from(10000));
    }

    #[tokio::test]
    async fn check_balance_surfaces_missing_value() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/account/customer/balance")
            .with_status(200)
            .with_body(r#"{"status": "OK"}"#)
            .create_async()
            .await;

        let result = gateway(server.url())
            .check_balance("771234567", "ciphertext")
            .await;

        assert!(matches!(
            result,
            Err(OperatorError::MissingField { field: "value", .. })
        ));
    }

    #[tokio::test]
    async fn check_balance_surfaces_error_status_with_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/account/customer/balance")
            .with_status(401)
            .with_body(r#"{"error": "invalid token"}"#)
            .create_async()
            .await;

        let err = gateway(server.url())
            .check_balance("771234567", "ciphertext")
            .await
            .unwrap_err();

        match err {
            OperatorError::UnexpectedStatus { status, body, .. } => {
                assert_eq!(status, 401);
                assert!(body.contains("invalid token"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn withdraw_normalizes_transaction_id_field() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/cashouts")
            .with_status(200)
            .with_body(r#"{"transactionId": "OM-12345"}"#)
            .create_async()
            .await;

        let receipt = gateway(server.url())
            .withdraw(&BigDecimal::from_str("505").unwrap(), "771234567")
            .await
            .unwrap();

        assert_eq!(receipt.reference, "OM-12345");
    }

    #[tokio::test]
    async fn withdraw_fails_on_missing_reference() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/cashouts")
            .with_status(200)
            .with_body(r#"{"status": "ACCEPTED"}"#)
            .create_async()
            .await;

        let result = gateway(server.url())
            .withdraw(&BigDecimal::from_str("505").unwrap(), "771234567")
            .await;

        assert!(matches!(
            result,
            Err(OperatorError::MissingField {
                field: "transactionId",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn confirm_withdrawal_hits_transaction_path() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/transactions/OM-12345/confirm")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        gateway(server.url())
            .confirm_withdrawal("OM-12345", "771234567", "ciphertext")
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn deposit_accepts_empty_ack() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/cashins")
            .with_status(201)
            .create_async()
            .await;

        gateway(server.url())
            .deposit(&BigDecimal::from_str("505").unwrap(), "761112233")
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn fetch_public_key_returns_key_material() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/publicKeys")
            .with_status(200)
            .with_body(r#"{"keyId": "k1", "keyType": "RSA", "keySize": 2048, "key": "QUJDRA=="}"#)
            .create_async()
            .await;

        let key = gateway(server.url()).fetch_public_key().await.unwrap();

        assert_eq!(key, "QUJDRA==");
    }
}
