//! Payment provider for toll payments
//!
//! Without a configured secret key the service answers payment requests
//! with a simulated client secret; with one it creates a payment intent
//! through the provider's REST API.

use crate::config::PaymentsConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Payment intent to create
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentIntent {
    /// Amount in minor units (pence, cents)
    pub amount_minor: i64,
    /// Lower-case ISO currency code
    pub currency: String,
    pub metadata: BTreeMap<String, String>,
}

impl PaymentIntent {
    /// Build an intent for `amount` major units of `currency` paid to `gate`.
    /// Caller metadata is applied after `gate`, so it may override it.
    pub fn for_gate(
        gate: &str,
        amount: f64,
        currency: &str,
        metadata: &serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        let mut map = BTreeMap::new();
        map.insert("gate".to_string(), gate.to_string());
        for (key, value) in metadata {
            let value = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            map.insert(key.clone(), value);
        }

        Self {
            amount_minor: (amount * 100.0).round() as i64,
            currency: currency.to_lowercase(),
            metadata: map,
        }
    }
}

/// Creates payment intents
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create an intent and return its client secret
    async fn create_intent(&self, intent: &PaymentIntent) -> Result<String>;
}

/// Stripe payment intents API
pub struct StripePayments {
    client: reqwest::Client,
    api_base: String,
    secret_key: String,
}

#[derive(Deserialize)]
struct IntentResponse {
    client_secret: Option<String>,
}

#[derive(Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Deserialize)]
struct StripeError {
    message: String,
}

impl StripePayments {
    pub fn new(api_base: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        }
    }

    /// Provider from configuration, if a secret key is set
    pub fn from_config(config: &PaymentsConfig) -> Option<Self> {
        config
            .secret_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(|key| Self::new(config.api_base.clone(), key))
    }
}

#[async_trait]
impl PaymentProvider for StripePayments {
    async fn create_intent(&self, intent: &PaymentIntent) -> Result<String> {
        let mut form = vec![
            ("amount".to_string(), intent.amount_minor.to_string()),
            ("currency".to_string(), intent.currency.clone()),
        ];
        for (key, value) in &intent.metadata {
            form.push((format!("metadata[{}]", key), value.clone()));
        }

        let url = format!("{}/v1/payment_intents", self.api_base);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::Payment(format!("Failed to reach payment provider: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<StripeErrorResponse>().await {
                Ok(body) => body.error.message,
                Err(_) => format!("payment provider returned {}", status),
            };
            return Err(Error::Payment(message));
        }

        let body: IntentResponse = response
            .json()
            .await
            .map_err(|e| Error::Payment(format!("Failed to parse payment intent: {}", e)))?;
        body.client_secret
            .ok_or_else(|| Error::Payment("payment intent has no client secret".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Form;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use std::collections::HashMap;

    #[test]
    fn test_intent_from_gate() {
        let mut metadata = serde_json::Map::new();
        metadata.insert("order".to_string(), serde_json::json!(17));
        metadata.insert("note".to_string(), serde_json::json!("tip"));

        let intent = PaymentIntent::for_gate("learn", 3.456, "GBP", &metadata);
        assert_eq!(intent.amount_minor, 346);
        assert_eq!(intent.currency, "gbp");
        assert_eq!(intent.metadata["gate"], "learn");
        assert_eq!(intent.metadata["order"], "17");
        assert_eq!(intent.metadata["note"], "tip");
    }

    #[test]
    fn test_from_config_requires_key() {
        let mut config = PaymentsConfig::default();
        assert!(StripePayments::from_config(&config).is_none());
        config.secret_key = Some("  ".to_string());
        assert!(StripePayments::from_config(&config).is_none());
        config.secret_key = Some("sk_test_123".to_string());
        assert!(StripePayments::from_config(&config).is_some());
    }

    async fn spawn(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_create_intent_posts_form() {
        let app = Router::new().route(
            "/v1/payment_intents",
            post(
                |headers: HeaderMap, Form(form): Form<HashMap<String, String>>| async move {
                    assert_eq!(
                        headers.get("authorization").unwrap(),
                        "Bearer sk_test_123"
                    );
                    assert_eq!(form["amount"], "300");
                    assert_eq!(form["currency"], "gbp");
                    assert_eq!(form["metadata[gate]"], "planmore");
                    Json(serde_json::json!({"id": "pi_1", "client_secret": "pi_1_secret"}))
                },
            ),
        );
        let base = spawn(app).await;

        let provider = StripePayments::new(base, "sk_test_123");
        let intent = PaymentIntent::for_gate("planmore", 3.0, "GBP", &Default::default());
        assert_eq!(provider.create_intent(&intent).await.unwrap(), "pi_1_secret");
    }

    #[tokio::test]
    async fn test_provider_error_message() {
        let app = Router::new().route(
            "/v1/payment_intents",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({"error": {"message": "Amount must be at least 30 pence"}})),
                )
            }),
        );
        let base = spawn(app).await;

        let provider = StripePayments::new(base, "sk_test_123");
        let intent = PaymentIntent::for_gate("planmore", 0.01, "GBP", &Default::default());
        let err = provider.create_intent(&intent).await.unwrap_err();
        assert!(err.to_string().contains("Amount must be at least 30 pence"));
    }
}
