pub mod auth;
pub mod billing;
pub mod registration;
pub mod stripe;
