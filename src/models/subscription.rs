use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

pub const SUBSCRIPTION_STATUS_ACTIVE: &str = "active";
pub const SUBSCRIPTION_STATUS_PAST_DUE: &str = "past_due";
pub const SUBSCRIPTION_STATUS_CANCELED: &str = "canceled";

/// One row per Stripe subscription. `stripe_subscription_id` is unique and is
/// the idempotency key for every reconciliation write; rows are never
/// hard-deleted, cancellation is a status transition.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SubscriptionRecord {
    pub id: Uuid,
    pub empresa_id: Uuid,
    pub stripe_customer_id: String,
    pub stripe_subscription_id: String,
    pub plan: String,
    pub current_period_end: OffsetDateTime,
    pub status: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Insert shape for the first `checkout.session.completed` upsert.
#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub empresa_id: Uuid,
    pub stripe_customer_id: String,
    pub stripe_subscription_id: String,
    pub plan: String,
    pub current_period_end: OffsetDateTime,
    pub status: String,
}

/// Partial update applied by the later lifecycle events. `None` leaves the
/// column untouched; `current_period_end` only ever moves forward.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionPatch {
    pub plan: Option<String>,
    pub current_period_end: Option<OffsetDateTime>,
    pub status: Option<String>,
}

impl SubscriptionPatch {
    pub fn status(status: &str) -> Self {
        SubscriptionPatch {
            status: Some(status.to_string()),
            ..Default::default()
        }
    }
}
