//! External payment gateway.
//!
//! The booking engine only needs to know whether an intent succeeded and how
//! to request a refund. Every call is time-boxed by [`with_timeout`].

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    Succeeded,
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    Canceled,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub status: IntentStatus,
    #[serde(default)]
    pub client_secret: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("payment gateway timed out")]
    Timeout,
    #[error("payment gateway rejected the request: {0}")]
    Rejected(String),
    #[error("payment gateway unreachable: {0}")]
    Transport(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(&self, amount: i64, currency: &str) -> Result<PaymentIntent, GatewayError>;

    async fn retrieve_intent(&self, intent_ref: &str) -> Result<PaymentIntent, GatewayError>;

    /// Refund `amount` against a settled intent. Returns the gateway's refund id.
    async fn refund(&self, intent_ref: &str, amount: i64) -> Result<String, GatewayError>;
}

/// Run a gateway call, mapping an elapsed deadline to [`GatewayError::Timeout`].
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, GatewayError>
where
    F: Future<Output = Result<T, GatewayError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::Timeout),
    }
}

/// Gateway speaking a Stripe-shaped JSON REST API.
#[derive(Clone)]
pub struct RestPaymentGateway {
    client: reqwest::Client,
    base_url: String,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
struct RefundResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl RestPaymentGateway {
    pub fn new(base_url: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, GatewayError> {
        let response = request
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorEnvelope>().await {
                Ok(envelope) => envelope.error.message,
                Err(_) => format!("HTTP {}", status),
            };
            return Err(GatewayError::Rejected(message));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::Transport(format!("Invalid gateway response: {}", e)))
    }
}

#[async_trait]
impl PaymentGateway for RestPaymentGateway {
    async fn create_intent(&self, amount: i64, currency: &str) -> Result<PaymentIntent, GatewayError> {
        let request = self
            .client
            .post(format!("{}/v1/payment_intents", self.base_url))
            .json(&json!({ "amount": amount, "currency": currency }));

        self.send(request).await
    }

    async fn retrieve_intent(&self, intent_ref: &str) -> Result<PaymentIntent, GatewayError> {
        let request = self
            .client
            .get(format!("{}/v1/payment_intents/{}", self.base_url, intent_ref));

        self.send(request).await
    }

    async fn refund(&self, intent_ref: &str, amount: i64) -> Result<String, GatewayError> {
        let request = self
            .client
            .post(format!("{}/v1/refunds", self.base_url))
            .json(&json!({ "payment_intent": intent_ref, "amount": amount }));

        let refund: RefundResponse = self.send(request).await?;
        Ok(refund.id)
    }
}
