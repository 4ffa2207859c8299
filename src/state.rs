use std::sync::Arc;

use crate::config::Config;
use crate::db::{
    empresa_repository::EmpresaRepository, subscription_repository::SubscriptionRepository,
    user_repository::UserRepository,
};
use crate::services::smtp_mailer::Mailer;
use crate::services::stripe::StripeService;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn UserRepository>,
    pub empresa_repo: Arc<dyn EmpresaRepository>,
    pub subscription_repo: Arc<dyn SubscriptionRepository>,
    pub mailer: Arc<dyn Mailer>,
    pub stripe: Arc<dyn StripeService>,
    pub config: Arc<Config>,
}
