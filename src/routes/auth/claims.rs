use serde::{Deserialize, Serialize};

use crate::models::user::UserRole;

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Claims {
    pub id: String, // user UUID
    pub email: String,
    pub empresa_id: String,
    pub role: Option<UserRole>,
    pub exp: usize, // expiration (as UNIX timestamp)
}
