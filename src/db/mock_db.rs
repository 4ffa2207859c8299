#![allow(dead_code)]
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::empresa::Empresa;
use crate::models::subscription::{NewSubscription, SubscriptionPatch, SubscriptionRecord};
use crate::models::user::User;

use super::empresa_repository::EmpresaRepository;
use super::subscription_repository::SubscriptionRepository;
use super::user_repository::UserRepository;

#[derive(Default)]
pub struct MockDb {
    pub email_taken: bool,
    pub should_fail: bool,
    pub find_user_result: Option<User>,
    pub created_users: Mutex<Vec<(String, String, Uuid)>>,
}

#[async_trait]
impl UserRepository for MockDb {
    async fn is_email_taken(&self, _email: &str) -> Result<bool, sqlx::Error> {
        if self.should_fail {
            return Err(sqlx::Error::Protocol("Mock DB failure".into()));
        }
        Ok(self.email_taken)
    }

    async fn create_admin_user(
        &self,
        email: &str,
        password_hash: &str,
        empresa_id: Uuid,
    ) -> Result<Uuid, sqlx::Error> {
        if self.should_fail {
            return Err(sqlx::Error::Protocol("Mock DB failure".into()));
        }
        self.created_users.lock().unwrap().push((
            email.to_string(),
            password_hash.to_string(),
            empresa_id,
        ));
        Ok(Uuid::new_v4())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        if self.should_fail {
            return Err(sqlx::Error::Protocol("Mock DB failure".into()));
        }
        Ok(self
            .find_user_result
            .clone()
            .filter(|user| user.email.eq_ignore_ascii_case(email)))
    }
}

#[derive(Clone, Default)]
pub struct MockEmpresaRepository {
    pub empresas: Arc<Mutex<Vec<Empresa>>>,
    pub deleted: Arc<Mutex<Vec<Uuid>>>,
    pub should_fail: bool,
}

#[async_trait]
impl EmpresaRepository for MockEmpresaRepository {
    async fn create_empresa(&self, name: &str) -> Result<Empresa, sqlx::Error> {
        if self.should_fail {
            return Err(sqlx::Error::Protocol("Mock DB failure".into()));
        }
        let now = OffsetDateTime::now_utc();
        let empresa = Empresa {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.empresas.lock().unwrap().push(empresa.clone());
        Ok(empresa)
    }

    async fn find_empresa(&self, empresa_id: Uuid) -> Result<Option<Empresa>, sqlx::Error> {
        Ok(self
            .empresas
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.id == empresa_id)
            .cloned())
    }

    async fn delete_empresa(&self, empresa_id: Uuid) -> Result<(), sqlx::Error> {
        self.empresas.lock().unwrap().retain(|e| e.id != empresa_id);
        self.deleted.lock().unwrap().push(empresa_id);
        Ok(())
    }
}

/// In-memory subscription store mirroring the Postgres semantics, including
/// the monotonic `current_period_end` guard.
#[derive(Clone, Default)]
pub struct MockSubscriptionRepository {
    pub rows: Arc<Mutex<Vec<SubscriptionRecord>>>,
    pub write_calls: Arc<Mutex<usize>>,
    pub should_fail: bool,
}

impl MockSubscriptionRepository {
    pub fn seed(self, record: SubscriptionRecord) -> Self {
        self.rows.lock().unwrap().push(record);
        self
    }
}

#[async_trait]
impl SubscriptionRepository for MockSubscriptionRepository {
    async fn upsert_by_stripe_subscription_id(
        &self,
        record: &NewSubscription,
    ) -> Result<SubscriptionRecord, sqlx::Error> {
        if self.should_fail {
            return Err(sqlx::Error::Protocol("Mock DB failure".into()));
        }
        *self.write_calls.lock().unwrap() += 1;

        let mut rows = self.rows.lock().unwrap();
        let now = OffsetDateTime::now_utc();
        if let Some(row) = rows
            .iter_mut()
            .find(|r| r.stripe_subscription_id == record.stripe_subscription_id)
        {
            row.empresa_id = record.empresa_id;
            row.stripe_customer_id = record.stripe_customer_id.clone();
            row.plan = record.plan.clone();
            row.current_period_end = row.current_period_end.max(record.current_period_end);
            row.status = record.status.clone();
            row.updated_at = now;
            Ok(row.clone())
        } else {
            let row = SubscriptionRecord {
                id: Uuid::new_v4(),
                empresa_id: record.empresa_id,
                stripe_customer_id: record.stripe_customer_id.clone(),
                stripe_subscription_id: record.stripe_subscription_id.clone(),
                plan: record.plan.clone(),
                current_period_end: record.current_period_end,
                status: record.status.clone(),
                created_at: now,
                updated_at: now,
            };
            rows.push(row.clone());
            Ok(row)
        }
    }

    async fn update_by_stripe_subscription_id(
        &self,
        stripe_subscription_id: &str,
        patch: SubscriptionPatch,
    ) -> Result<Option<SubscriptionRecord>, sqlx::Error> {
        if self.should_fail {
            return Err(sqlx::Error::Protocol("Mock DB failure".into()));
        }
        *self.write_calls.lock().unwrap() += 1;

        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows
            .iter_mut()
            .find(|r| r.stripe_subscription_id == stripe_subscription_id)
        else {
            return Ok(None);
        };

        if let Some(plan) = patch.plan {
            row.plan = plan;
        }
        if let Some(status) = patch.status {
            row.status = status;
        }
        if let Some(period_end) = patch.current_period_end {
            row.current_period_end = row.current_period_end.max(period_end);
        }
        row.updated_at = OffsetDateTime::now_utc();
        Ok(Some(row.clone()))
    }

    async fn find_by_stripe_subscription_id(
        &self,
        stripe_subscription_id: &str,
    ) -> Result<Option<SubscriptionRecord>, sqlx::Error> {
        if self.should_fail {
            return Err(sqlx::Error::Protocol("Mock DB failure".into()));
        }
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.stripe_subscription_id == stripe_subscription_id)
            .cloned())
    }

    async fn find_by_empresa(
        &self,
        empresa_id: Uuid,
    ) -> Result<Option<SubscriptionRecord>, sqlx::Error> {
        if self.should_fail {
            return Err(sqlx::Error::Protocol("Mock DB failure".into()));
        }
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.empresa_id == empresa_id)
            .max_by_key(|r| r.updated_at)
            .cloned())
    }
}
