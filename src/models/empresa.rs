use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// A customer organization. Owns at most one subscription row and one or
/// more admin users.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Empresa {
    pub id: Uuid,
    pub name: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}
