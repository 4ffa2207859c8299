pub mod empresa_repository;
pub mod mock_db;
pub mod postgres_empresa_repository;
pub mod postgres_subscription_repository;
pub mod postgres_user_repository;
pub mod subscription_repository;
pub mod user_repository;
