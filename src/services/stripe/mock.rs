#![allow(dead_code)]
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

use super::{
    CheckoutSession, CreateCheckoutSessionRequest, CustomerInfo, StripeEvent, StripeService,
    StripeServiceError, SubscriptionInfo,
};

#[derive(Clone, Default)]
pub struct MockStripeService {
    pub created_customers: Arc<Mutex<Vec<CustomerInfo>>>,
    pub created_sessions: Arc<Mutex<Vec<CheckoutSession>>>,
    pub last_create_requests: Arc<Mutex<Vec<CreateCheckoutSessionRequest>>>,
    pub customers: Arc<Mutex<HashMap<String, CustomerInfo>>>,
    pub subscriptions: Arc<Mutex<HashMap<String, SubscriptionInfo>>>,
    pub line_items: Arc<Mutex<HashMap<String, Vec<String>>>>,
    pub fail_create_customer: Arc<Mutex<bool>>,
    pub fail_create_session: Arc<Mutex<bool>>,
    pub fail_get_subscription: Arc<Mutex<bool>>,
}

impl MockStripeService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_customer(self, id: &str, metadata: BTreeMap<String, String>) -> Self {
        self.customers.lock().unwrap().insert(
            id.to_string(),
            CustomerInfo {
                id: id.to_string(),
                email: None,
                metadata,
            },
        );
        self
    }

    pub fn with_subscription(self, info: SubscriptionInfo) -> Self {
        self.subscriptions
            .lock()
            .unwrap()
            .insert(info.id.clone(), info);
        self
    }

    pub fn with_line_items(self, session_id: &str, price_ids: &[&str]) -> Self {
        self.line_items.lock().unwrap().insert(
            session_id.to_string(),
            price_ids.iter().map(|s| s.to_string()).collect(),
        );
        self
    }
}

fn make_id(prefix: &str) -> String {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    format!("{}_{}", prefix, ts)
}

#[async_trait]
impl StripeService for MockStripeService {
    async fn create_customer(
        &self,
        email: &str,
        _name: Option<&str>,
        metadata: BTreeMap<String, String>,
    ) -> Result<String, StripeServiceError> {
        if *self.fail_create_customer.lock().unwrap() {
            return Err(StripeServiceError::Api("mock customer failure".into()));
        }
        let id = make_id("cus_test");
        let customer = CustomerInfo {
            id: id.clone(),
            email: Some(email.to_string()),
            metadata,
        };
        self.created_customers.lock().unwrap().push(customer.clone());
        self.customers.lock().unwrap().insert(id.clone(), customer);
        Ok(id)
    }

    async fn create_checkout_session(
        &self,
        req: CreateCheckoutSessionRequest,
    ) -> Result<CheckoutSession, StripeServiceError> {
        if *self.fail_create_session.lock().unwrap() {
            return Err(StripeServiceError::Api("mock session failure".into()));
        }
        // capture the request
        self.last_create_requests.lock().unwrap().push(req.clone());

        let session = CheckoutSession {
            id: make_id("cs_test"),
            url: Some("https://example.test/checkout".into()),
        };
        self.created_sessions.lock().unwrap().push(session.clone());
        Ok(session)
    }

    fn verify_webhook(
        &self,
        payload: &[u8],
        _signature_header: &str,
    ) -> Result<StripeEvent, StripeServiceError> {
        let val: serde_json::Value = serde_json::from_slice(payload)
            .map_err(|e| StripeServiceError::Serde(e.to_string()))?;
        let id = match val.get("id").and_then(|v| v.as_str()) {
            Some(s) => s.to_string(),
            None => make_id("evt"),
        };
        let ty = val
            .get("type")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string();
        Ok(StripeEvent {
            id,
            r#type: ty,
            payload: val,
        })
    }

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<SubscriptionInfo, StripeServiceError> {
        if *self.fail_get_subscription.lock().unwrap() {
            return Err(StripeServiceError::Api("mock subscription failure".into()));
        }
        self.subscriptions
            .lock()
            .unwrap()
            .get(subscription_id)
            .cloned()
            .ok_or_else(|| {
                StripeServiceError::NotFound(format!("subscription {} not found", subscription_id))
            })
    }

    async fn get_customer(&self, customer_id: &str) -> Result<CustomerInfo, StripeServiceError> {
        self.customers
            .lock()
            .unwrap()
            .get(customer_id)
            .cloned()
            .ok_or_else(|| {
                StripeServiceError::NotFound(format!("customer {} not found", customer_id))
            })
    }

    async fn list_checkout_line_items(
        &self,
        session_id: &str,
    ) -> Result<Vec<String>, StripeServiceError> {
        Ok(self
            .line_items
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }
}
