// NOTE: async-stripe is compiled with a minimal feature set (runtime-tokio-hyper,
// checkout, webhook-events, and connect to satisfy webhook payload types).
// Touching APIs outside those features requires updating Cargo.toml explicitly
// so we keep compile times and binary size in check.
use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum StripeServiceError {
    #[error("stripe api error: {0}")]
    Api(String),
    #[error("webhook verification failed: {0}")]
    Webhook(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("serialization error: {0}")]
    Serde(String),
    #[error("other error: {0}")]
    Other(String),
}

impl From<stripe::StripeError> for StripeServiceError {
    fn from(err: stripe::StripeError) -> Self {
        StripeServiceError::Api(err.to_string())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateCheckoutSessionRequest {
    pub success_url: String,
    pub cancel_url: String,
    pub price_id: String,
    pub customer: String,
    pub client_reference_id: Option<String>,
    pub metadata: Option<BTreeMap<String, String>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

/// A verified webhook event: id, type discriminator, and the raw payload the
/// typed `BillingEvent` parser consumes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    pub r#type: String,
    pub payload: serde_json::Value,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubscriptionInfo {
    pub id: String,
    pub status: String,
    /// Unix timestamp (seconds) when the current period ends
    pub current_period_end: i64,
    pub cancel_at_period_end: bool,
    /// Price id of the first subscription item
    pub price_id: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub id: String,
    pub email: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

#[async_trait]
pub trait StripeService: Send + Sync {
    async fn create_customer(
        &self,
        email: &str,
        name: Option<&str>,
        metadata: BTreeMap<String, String>,
    ) -> Result<String, StripeServiceError>;

    async fn create_checkout_session(
        &self,
        req: CreateCheckoutSessionRequest,
    ) -> Result<CheckoutSession, StripeServiceError>;

    fn verify_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<StripeEvent, StripeServiceError>;

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<SubscriptionInfo, StripeServiceError>;

    async fn get_customer(&self, customer_id: &str) -> Result<CustomerInfo, StripeServiceError>;

    async fn list_checkout_line_items(
        &self,
        session_id: &str,
    ) -> Result<Vec<String>, StripeServiceError>;
}

mod live;
mod mock;

#[allow(unused_imports)]
pub use live::LiveStripeService;
#[allow(unused_imports)]
pub use mock::MockStripeService;
