use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::{
    CheckoutSession, CreateCheckoutSessionRequest, CustomerInfo, StripeEvent, StripeService,
    StripeServiceError, SubscriptionInfo,
};

type HmacSha256 = Hmac<Sha256>;

/// Maximum accepted age of a webhook signature timestamp, in seconds.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

pub struct LiveStripeService {
    client: stripe::Client,
    webhook_secret: String,
}

impl LiveStripeService {
    pub fn new(secret_key: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
        let client = stripe::Client::new(secret_key);
        Self {
            client,
            webhook_secret: webhook_secret.into(),
        }
    }

    pub fn from_settings(settings: &crate::config::StripeSettings) -> Self {
        Self::new(settings.secret_key.clone(), settings.webhook_secret.clone())
    }
}

/// Verify a `Stripe-Signature` header against the exact raw body.
///
/// The header carries a unix timestamp and one or more `v1` HMAC-SHA256
/// signatures over `"{timestamp}.{body}"`. Comparison is constant-time and the
/// timestamp must be within `SIGNATURE_TOLERANCE_SECS` of `now` to keep
/// replayed deliveries out.
pub(crate) fn verify_signature(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    now: i64,
) -> Result<(), StripeServiceError> {
    let mut timestamp: Option<i64> = None;
    let mut v1_signatures: Vec<Vec<u8>> = Vec::new();

    for part in signature_header.split(',') {
        let kv: Vec<&str> = part.splitn(2, '=').collect();
        if kv.len() != 2 {
            continue;
        }
        match kv[0].trim() {
            "t" => timestamp = kv[1].parse().ok(),
            "v1" => {
                if let Ok(bytes) = hex::decode(kv[1]) {
                    v1_signatures.push(bytes);
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| StripeServiceError::Webhook("missing timestamp in signature header".into()))?;
    if v1_signatures.is_empty() {
        return Err(StripeServiceError::Webhook(
            "missing v1 signature in signature header".into(),
        ));
    }

    if (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(StripeServiceError::Webhook(
            "signature timestamp outside tolerance".into(),
        ));
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| StripeServiceError::Webhook(e.to_string()))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = mac.finalize().into_bytes();

    let matched = v1_signatures
        .iter()
        .any(|candidate| expected.ct_eq(candidate.as_slice()).into());
    if matched {
        Ok(())
    } else {
        Err(StripeServiceError::Webhook("signature mismatch".into()))
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[async_trait]
impl StripeService for LiveStripeService {
    async fn create_customer(
        &self,
        email: &str,
        name: Option<&str>,
        metadata: std::collections::BTreeMap<String, String>,
    ) -> Result<String, StripeServiceError> {
        let mut params = stripe::CreateCustomer::new();
        params.email = Some(email);
        if let Some(name) = name {
            params.name = Some(name);
        }
        if !metadata.is_empty() {
            params.metadata = Some(metadata.into_iter().collect());
        }
        let customer = stripe::Customer::create(&self.client, params).await?;
        Ok(customer.id.to_string())
    }

    async fn create_checkout_session(
        &self,
        req: CreateCheckoutSessionRequest,
    ) -> Result<CheckoutSession, StripeServiceError> {
        let mut params = stripe::CreateCheckoutSession::new();
        params.mode = Some(stripe::CheckoutSessionMode::Subscription);
        params.success_url = Some(&req.success_url);
        params.cancel_url = Some(&req.cancel_url);
        if let Some(ref id) = req.client_reference_id {
            params.client_reference_id = Some(id);
        }
        let cid = req
            .customer
            .parse::<stripe::CustomerId>()
            .map_err(|e| StripeServiceError::Other(e.to_string()))?;
        params.customer = Some(cid);
        if let Some(ref meta) = req.metadata {
            params.metadata = Some(meta.iter().map(|(k, v)| (k.clone(), v.clone())).collect());
        }
        params.line_items = Some(vec![stripe::CreateCheckoutSessionLineItems {
            price: Some(req.price_id.clone()),
            quantity: Some(1),
            ..Default::default()
        }]);

        let session = stripe::CheckoutSession::create(&self.client, params).await?;
        Ok(CheckoutSession {
            id: session.id.to_string(),
            url: session.url.clone(),
        })
    }

    fn verify_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<StripeEvent, StripeServiceError> {
        verify_signature(payload, signature_header, &self.webhook_secret, unix_now())?;

        let value: serde_json::Value = serde_json::from_slice(payload)
            .map_err(|e| StripeServiceError::Serde(e.to_string()))?;
        let id = value
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| StripeServiceError::Serde("event missing id".into()))?
            .to_string();
        let r#type = value
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or_else(|| StripeServiceError::Serde("event missing type".into()))?
            .to_string();

        Ok(StripeEvent {
            id,
            r#type,
            payload: value,
        })
    }

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<SubscriptionInfo, StripeServiceError> {
        let sub_id = subscription_id
            .parse::<stripe::SubscriptionId>()
            .map_err(|e| StripeServiceError::Other(e.to_string()))?;
        let sub = stripe::Subscription::retrieve(&self.client, &sub_id, &[]).await?;

        let price_id = sub
            .items
            .data
            .first()
            .and_then(|item| item.price.as_ref())
            .map(|price| price.id.to_string());

        Ok(SubscriptionInfo {
            id: sub.id.to_string(),
            status: sub.status.to_string(),
            current_period_end: sub.current_period_end,
            cancel_at_period_end: sub.cancel_at_period_end,
            price_id,
        })
    }

    async fn get_customer(&self, customer_id: &str) -> Result<CustomerInfo, StripeServiceError> {
        let cust_id = customer_id
            .parse::<stripe::CustomerId>()
            .map_err(|e| StripeServiceError::Other(e.to_string()))?;
        let customer = stripe::Customer::retrieve(&self.client, &cust_id, &[]).await?;

        Ok(CustomerInfo {
            id: customer.id.to_string(),
            email: customer.email.clone(),
            metadata: customer
                .metadata
                .clone()
                .unwrap_or_default()
                .into_iter()
                .collect(),
        })
    }

    async fn list_checkout_line_items(
        &self,
        session_id: &str,
    ) -> Result<Vec<String>, StripeServiceError> {
        let id = session_id
            .parse::<stripe::CheckoutSessionId>()
            .map_err(|e| StripeServiceError::Other(e.to_string()))?;
        let session =
            stripe::CheckoutSession::retrieve(&self.client, &id, &["line_items"]).await?;

        Ok(session
            .line_items
            .map(|items| {
                items
                    .data
                    .into_iter()
                    .filter_map(|item| item.price.map(|price| price.id.to_string()))
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test123secret456";

    fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        let sig = hex::encode(mac.finalize().into_bytes());
        format!("t={},v1={}", timestamp, sig)
    }

    #[test]
    fn accepts_a_valid_signature() {
        let payload = br#"{"id":"evt_1","type":"invoice.payment_failed"}"#;
        let now = 1_700_000_000;
        let header = sign(payload, SECRET, now);
        assert!(verify_signature(payload, &header, SECRET, now).is_ok());
    }

    #[test]
    fn rejects_every_single_byte_mutation_of_the_body() {
        let payload = br#"{"id":"evt_1","type":"invoice.payment_failed"}"#.to_vec();
        let now = 1_700_000_000;
        let header = sign(&payload, SECRET, now);

        for i in 0..payload.len() {
            let mut mutated = payload.clone();
            mutated[i] ^= 0x01;
            assert!(
                verify_signature(&mutated, &header, SECRET, now).is_err(),
                "mutation at byte {} was accepted",
                i
            );
        }
    }

    #[test]
    fn rejects_a_signature_made_with_a_different_secret() {
        let payload = b"{}";
        let now = 1_700_000_000;
        let header = sign(payload, "whsec_other", now);
        assert!(verify_signature(payload, &header, SECRET, now).is_err());
    }

    #[test]
    fn rejects_a_stale_timestamp() {
        let payload = b"{}";
        let now = 1_700_000_000;
        let header = sign(payload, SECRET, now - SIGNATURE_TOLERANCE_SECS - 1);
        assert!(verify_signature(payload, &header, SECRET, now).is_err());
    }

    #[test]
    fn rejects_headers_without_timestamp_or_signature() {
        let payload = b"{}";
        assert!(verify_signature(payload, "v1=abcdef", SECRET, 0).is_err());
        assert!(verify_signature(payload, "t=123", SECRET, 123).is_err());
        assert!(verify_signature(payload, "garbage", SECRET, 0).is_err());
    }

    #[test]
    fn accepts_when_any_v1_entry_matches() {
        let payload = b"{\"id\":\"evt_2\"}";
        let now = 1_700_000_000;
        let good = sign(payload, SECRET, now);
        let good_sig = good.split("v1=").nth(1).unwrap();
        let header = format!("t={},v1={},v1={}", now, "00".repeat(32), good_sig);
        assert!(verify_signature(payload, &header, SECRET, now).is_ok());
    }
}
