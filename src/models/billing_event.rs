use serde::Deserialize;

use crate::services::stripe::StripeEvent;

/// `data.object` of a `checkout.session.*` event.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSessionObject {
    pub id: String,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub subscription: Option<String>,
}

/// `data.object` of an `invoice.*` event. Invoices only reference their
/// subscription; full subscription state must be fetched from Stripe.
#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceObject {
    #[serde(default)]
    pub subscription: Option<String>,
}

/// `data.object` of a `customer.subscription.*` event.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionObject {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub cancel_at_period_end: Option<bool>,
    #[serde(default)]
    pub items: Option<SubscriptionItems>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionItems {
    #[serde(default)]
    pub data: Vec<SubscriptionItemEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionItemEntry {
    #[serde(default)]
    pub price: Option<PriceRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceRef {
    pub id: String,
}

impl SubscriptionObject {
    /// Price id of the first subscription item, when the payload carries one.
    pub fn price_id(&self) -> Option<&str> {
        self.items
            .as_ref()?
            .data
            .first()?
            .price
            .as_ref()
            .map(|p| p.id.as_str())
    }
}

/// The billing lifecycle events the reconciler understands, parsed out of a
/// verified Stripe event. Unknown types land in `Unrecognized` and are
/// acknowledged without any write.
#[derive(Debug, Clone)]
pub enum BillingEvent {
    CheckoutCompleted(CheckoutSessionObject),
    InvoicePaymentSucceeded(InvoiceObject),
    InvoicePaymentFailed(InvoiceObject),
    SubscriptionUpdated(SubscriptionObject),
    SubscriptionDeleted(SubscriptionObject),
    Unrecognized { event_type: String },
}

impl BillingEvent {
    pub fn from_event(event: &StripeEvent) -> Result<Self, serde_json::Error> {
        let object = event
            .payload
            .get("data")
            .and_then(|data| data.get("object"))
            .cloned()
            .unwrap_or(serde_json::Value::Null);

        match event.r#type.as_str() {
            "checkout.session.completed" => {
                Ok(BillingEvent::CheckoutCompleted(serde_json::from_value(object)?))
            }
            "invoice.payment_succeeded" => {
                Ok(BillingEvent::InvoicePaymentSucceeded(serde_json::from_value(object)?))
            }
            "invoice.payment_failed" => {
                Ok(BillingEvent::InvoicePaymentFailed(serde_json::from_value(object)?))
            }
            "customer.subscription.updated" => {
                Ok(BillingEvent::SubscriptionUpdated(serde_json::from_value(object)?))
            }
            "customer.subscription.deleted" => {
                Ok(BillingEvent::SubscriptionDeleted(serde_json::from_value(object)?))
            }
            other => Ok(BillingEvent::Unrecognized {
                event_type: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stripe_event(event_type: &str, object: serde_json::Value) -> StripeEvent {
        StripeEvent {
            id: "evt_test".into(),
            r#type: event_type.into(),
            payload: serde_json::json!({ "data": { "object": object } }),
        }
    }

    #[test]
    fn parses_checkout_session_completed() {
        let evt = stripe_event(
            "checkout.session.completed",
            serde_json::json!({ "id": "cs_1", "customer": "cus_1", "subscription": "sub_1" }),
        );
        match BillingEvent::from_event(&evt).unwrap() {
            BillingEvent::CheckoutCompleted(session) => {
                assert_eq!(session.id, "cs_1");
                assert_eq!(session.customer.as_deref(), Some("cus_1"));
                assert_eq!(session.subscription.as_deref(), Some("sub_1"));
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn parses_subscription_updated_with_items() {
        let evt = stripe_event(
            "customer.subscription.updated",
            serde_json::json!({
                "id": "sub_1",
                "status": "trialing",
                "current_period_end": 1767225600,
                "cancel_at_period_end": false,
                "items": { "data": [ { "price": { "id": "price_studio" } } ] }
            }),
        );
        match BillingEvent::from_event(&evt).unwrap() {
            BillingEvent::SubscriptionUpdated(sub) => {
                assert_eq!(sub.status.as_deref(), Some("trialing"));
                assert_eq!(sub.current_period_end, Some(1767225600));
                assert_eq!(sub.price_id(), Some("price_studio"));
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn unknown_event_types_fall_through_to_unrecognized() {
        let evt = stripe_event("customer.source.expiring", serde_json::json!({}));
        match BillingEvent::from_event(&evt).unwrap() {
            BillingEvent::Unrecognized { event_type } => {
                assert_eq!(event_type, "customer.source.expiring");
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn recognized_event_with_wrong_shape_is_an_error() {
        let evt = stripe_event("checkout.session.completed", serde_json::json!("not-an-object"));
        assert!(BillingEvent::from_event(&evt).is_err());
    }
}
