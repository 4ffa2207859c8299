use async_trait::async_trait;
use uuid::Uuid;

use crate::models::subscription::{NewSubscription, SubscriptionPatch, SubscriptionRecord};

/// All writes go through the Stripe subscription id, which carries a unique
/// constraint; redelivered events therefore land on the same row.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn upsert_by_stripe_subscription_id(
        &self,
        record: &NewSubscription,
    ) -> Result<SubscriptionRecord, sqlx::Error>;

    /// Returns `None` when no row exists for the given subscription id.
    async fn update_by_stripe_subscription_id(
        &self,
        stripe_subscription_id: &str,
        patch: SubscriptionPatch,
    ) -> Result<Option<SubscriptionRecord>, sqlx::Error>;

    async fn find_by_stripe_subscription_id(
        &self,
        stripe_subscription_id: &str,
    ) -> Result<Option<SubscriptionRecord>, sqlx::Error>;

    async fn find_by_empresa(
        &self,
        empresa_id: Uuid,
    ) -> Result<Option<SubscriptionRecord>, sqlx::Error>;
}
