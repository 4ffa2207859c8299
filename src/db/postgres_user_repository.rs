use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::user::User;

use super::user_repository::UserRepository;

pub struct PostgresUserRepository {
    pub pool: PgPool,
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn is_email_taken(&self, email: &str) -> Result<bool, sqlx::Error> {
        let exists = sqlx::query_scalar::<_, i64>("SELECT 1 FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .is_some();

        Ok(exists)
    }

    async fn create_admin_user(
        &self,
        email: &str,
        password_hash: &str,
        empresa_id: Uuid,
    ) -> Result<Uuid, sqlx::Error> {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO users (id, email, password_hash, empresa_id, role, created_at)
            VALUES (gen_random_uuid(), $1, $2, $3, 'admin', now())
            RETURNING id
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(empresa_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, empresa_id, role, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }
}
