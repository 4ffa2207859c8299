use async_trait::async_trait;
use uuid::Uuid;

use crate::models::empresa::Empresa;

#[async_trait]
pub trait EmpresaRepository: Send + Sync {
    async fn create_empresa(&self, name: &str) -> Result<Empresa, sqlx::Error>;
    async fn find_empresa(&self, empresa_id: Uuid) -> Result<Option<Empresa>, sqlx::Error>;
    /// Registration cleanup only; reconciliation never deletes tenants.
    async fn delete_empresa(&self, empresa_id: Uuid) -> Result<(), sqlx::Error>;
}
