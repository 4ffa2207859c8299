use async_trait::async_trait;
use uuid::Uuid;

use crate::models::user::User;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn is_email_taken(&self, email: &str) -> Result<bool, sqlx::Error>;
    async fn create_admin_user(
        &self,
        email: &str,
        password_hash: &str,
        empresa_id: Uuid,
    ) -> Result<Uuid, sqlx::Error>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error>;
}
