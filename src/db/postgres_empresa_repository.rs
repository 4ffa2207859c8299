use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::empresa::Empresa;

use super::empresa_repository::EmpresaRepository;

pub struct PostgresEmpresaRepository {
    pub pool: PgPool,
}

#[async_trait]
impl EmpresaRepository for PostgresEmpresaRepository {
    async fn create_empresa(&self, name: &str) -> Result<Empresa, sqlx::Error> {
        sqlx::query_as::<_, Empresa>(
            r#"
            INSERT INTO empresas (id, name, created_at, updated_at)
            VALUES (gen_random_uuid(), $1, now(), now())
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
    }

    async fn find_empresa(&self, empresa_id: Uuid) -> Result<Option<Empresa>, sqlx::Error> {
        sqlx::query_as::<_, Empresa>(
            r#"
            SELECT id, name, created_at, updated_at
            FROM empresas
            WHERE id = $1
            "#,
        )
        .bind(empresa_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_empresa(&self, empresa_id: Uuid) -> Result<(), sqlx::Error> {
        // users.empresa_id cascades, so a failed registration leaves nothing behind
        sqlx::query("DELETE FROM empresas WHERE id = $1")
            .bind(empresa_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
