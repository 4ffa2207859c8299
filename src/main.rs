mod config;
mod db;
mod models;
mod responses;
mod routes;
mod services;
mod state;
pub mod utils;

use std::{net::SocketAddr, sync::Arc};

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::HeaderValue;
use axum::http::Method;
use axum::{
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use db::postgres_empresa_repository::PostgresEmpresaRepository;
use db::postgres_subscription_repository::PostgresSubscriptionRepository;
use db::postgres_user_repository::PostgresUserRepository;
use db::{
    empresa_repository::EmpresaRepository, subscription_repository::SubscriptionRepository,
    user_repository::UserRepository,
};
use responses::JsonResponse;
use routes::auth::handle_login;
use routes::billing::get_subscription;
use routes::registration::handle_registration;
use routes::stripe::webhook;
use services::smtp_mailer::SmtpMailer;
use services::stripe::LiveStripeService;
use state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let rate_limit_ms: u64 = std::env::var("RATE_LIMITER_MILLISECONDS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        // Default: 200ms/token (~5 req/sec)
        .unwrap_or(200);
    let rate_limit_burst: u32 = std::env::var("RATE_LIMITER_BURST")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(20);
    let global_governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(rate_limit_ms)
            .burst_size(rate_limit_burst)
            .use_headers()
            .error_handler(|_err| {
                JsonResponse::too_many_requests(
                    "Too many requests. Please wait a moment and try again.",
                )
                .into_response()
            })
            .finish()
            .unwrap(),
    );

    // Stricter limiter for credential and signup endpoints
    let rate_limit_auth_s: u64 = std::env::var("RATE_LIMITER_AUTH_SECONDS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(1);
    let rate_limit_auth_burst: u32 = std::env::var("RATE_LIMITER_AUTH_BURST")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(10);
    let auth_governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(rate_limit_auth_s)
            .burst_size(rate_limit_auth_burst)
            .use_headers()
            .error_handler(|_err| {
                JsonResponse::too_many_requests(
                    "Too many requests. Please wait a moment and try again.",
                )
                .into_response()
            })
            .finish()
            .unwrap(),
    );

    // Background task to cleanup old rate-limiter entries
    let governor_limiter = global_governor_conf.limiter().clone();
    std::thread::spawn(move || {
        let interval = std::time::Duration::from_secs(60);
        loop {
            std::thread::sleep(interval);
            governor_limiter.retain_recent();
        }
    });

    let config = Arc::new(Config::from_env());

    let pg_pool = establish_connection(&config.database_url).await;
    let user_repo = Arc::new(PostgresUserRepository {
        pool: pg_pool.clone(),
    }) as Arc<dyn UserRepository>;
    let empresa_repo = Arc::new(PostgresEmpresaRepository {
        pool: pg_pool.clone(),
    }) as Arc<dyn EmpresaRepository>;
    let subscription_repo = Arc::new(PostgresSubscriptionRepository {
        pool: pg_pool.clone(),
    }) as Arc<dyn SubscriptionRepository>;

    let mailer = Arc::new(SmtpMailer::new().expect("Failed to initialize mailer"));
    let stripe = Arc::new(LiveStripeService::from_settings(&config.stripe));

    let state = AppState {
        db: user_repo,
        empresa_repo,
        subscription_repo,
        mailer,
        stripe,
        config: config.clone(),
    };

    let cors = CorsLayer::new()
        .allow_origin(config.frontend_origin.parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true);

    let auth_routes = Router::new()
        .route("/login", post(handle_login))
        .layer(GovernorLayer {
            config: auth_governor_conf.clone(),
        });

    let registration_routes = Router::new()
        .route("/registration", post(handle_registration))
        .layer(GovernorLayer {
            config: auth_governor_conf.clone(),
        });

    let billing_routes = Router::new().route("/subscription", get(get_subscription));

    // Stripe calls this directly; no CSRF, no auth, no strict limiter
    let webhook_routes = Router::new().route("/payment", post(webhook));

    let app = Router::new()
        .route("/", get(root))
        .nest("/api/auth", auth_routes)
        .nest("/api", registration_routes)
        .nest("/api/billing", billing_routes)
        .nest("/api/webhooks", webhook_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(GovernorLayer {
            config: global_governor_conf.clone(),
        })
        .layer(cors);

    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));

    let listener = TcpListener::bind(addr).await.unwrap();
    println!("Running at http://{}", addr);
    axum::serve(listener, make_service).await.unwrap();
}

/// A simple root route.
async fn root() -> Response {
    JsonResponse::success("Hello, Estudio!").into_response()
}

/// Establish a connection to the database and verify it.
async fn establish_connection(database_url: &str) -> PgPool {
    let pool = PgPool::connect(database_url)
        .await
        .expect("Failed to connect to the database");

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .expect("Failed to verify database connection");

    info!("Successfully connected to the database");
    pool
}
