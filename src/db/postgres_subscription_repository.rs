use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::subscription::{NewSubscription, SubscriptionPatch, SubscriptionRecord};

use super::subscription_repository::SubscriptionRepository;

pub struct PostgresSubscriptionRepository {
    pub pool: PgPool,
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn upsert_by_stripe_subscription_id(
        &self,
        record: &NewSubscription,
    ) -> Result<SubscriptionRecord, sqlx::Error> {
        // GREATEST keeps the period end monotonic when a stale checkout event
        // lands after an invoice has already advanced it.
        sqlx::query_as::<_, SubscriptionRecord>(
            r#"
            INSERT INTO subscriptions
                (id, empresa_id, stripe_customer_id, stripe_subscription_id,
                 plan, current_period_end, status, created_at, updated_at)
            VALUES (gen_random_uuid(), $1, $2, $3, $4, $5, $6, now(), now())
            ON CONFLICT (stripe_subscription_id) DO UPDATE
            SET empresa_id = EXCLUDED.empresa_id,
                stripe_customer_id = EXCLUDED.stripe_customer_id,
                plan = EXCLUDED.plan,
                current_period_end = GREATEST(subscriptions.current_period_end, EXCLUDED.current_period_end),
                status = EXCLUDED.status,
                updated_at = now()
            RETURNING id, empresa_id, stripe_customer_id, stripe_subscription_id,
                      plan, current_period_end, status, created_at, updated_at
            "#,
        )
        .bind(record.empresa_id)
        .bind(&record.stripe_customer_id)
        .bind(&record.stripe_subscription_id)
        .bind(&record.plan)
        .bind(record.current_period_end)
        .bind(&record.status)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_by_stripe_subscription_id(
        &self,
        stripe_subscription_id: &str,
        patch: SubscriptionPatch,
    ) -> Result<Option<SubscriptionRecord>, sqlx::Error> {
        sqlx::query_as::<_, SubscriptionRecord>(
            r#"
            UPDATE subscriptions
            SET plan = COALESCE($2, plan),
                status = COALESCE($3, status),
                current_period_end = CASE
                    WHEN $4::timestamptz IS NULL THEN current_period_end
                    ELSE GREATEST(current_period_end, $4::timestamptz)
                END,
                updated_at = now()
            WHERE stripe_subscription_id = $1
            RETURNING id, empresa_id, stripe_customer_id, stripe_subscription_id,
                      plan, current_period_end, status, created_at, updated_at
            "#,
        )
        .bind(stripe_subscription_id)
        .bind(patch.plan)
        .bind(patch.status)
        .bind(patch.current_period_end)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_by_stripe_subscription_id(
        &self,
        stripe_subscription_id: &str,
    ) -> Result<Option<SubscriptionRecord>, sqlx::Error> {
        sqlx::query_as::<_, SubscriptionRecord>(
            r#"
            SELECT id, empresa_id, stripe_customer_id, stripe_subscription_id,
                   plan, current_period_end, status, created_at, updated_at
            FROM subscriptions
            WHERE stripe_subscription_id = $1
            "#,
        )
        .bind(stripe_subscription_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_by_empresa(
        &self,
        empresa_id: Uuid,
    ) -> Result<Option<SubscriptionRecord>, sqlx::Error> {
        sqlx::query_as::<_, SubscriptionRecord>(
            r#"
            SELECT id, empresa_id, stripe_customer_id, stripe_subscription_id,
                   plan, current_period_end, status, created_at, updated_at
            FROM subscriptions
            WHERE empresa_id = $1
            ORDER BY updated_at DESC
            LIMIT 1
            "#,
        )
        .bind(empresa_id)
        .fetch_optional(&self.pool)
        .await
    }
}
