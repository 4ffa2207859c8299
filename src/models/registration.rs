use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize)]
pub struct RegistrationPayload {
    pub empresa_name: String,
    pub email: String,
    pub password: String,
    pub plan: String,
}
