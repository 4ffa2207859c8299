use std::collections::BTreeMap;

use axum::{
    extract::{Json, State},
    response::{IntoResponse, Response},
};
use serde_json::json;
use uuid::Uuid;

use crate::models::{plan::PlanTier, registration::RegistrationPayload};
use crate::responses::JsonResponse;
use crate::services::stripe::CreateCheckoutSessionRequest;
use crate::state::AppState;
use crate::utils::password::hash_password;

/// Customer metadata key linking a Stripe customer back to its empresa. The
/// webhook reconciler resolves tenants through this key.
pub const EMPRESA_METADATA_KEY: &str = "empresa_id";

/// POST /api/registration
///
/// Creates the empresa, its first admin user, a Stripe customer, and a
/// subscription checkout session, returning the checkout URL. Steps after the
/// empresa insert clean up on failure so a rejected registration leaves no
/// partial tenant behind.
pub async fn handle_registration(
    State(state): State<AppState>,
    Json(payload): Json<RegistrationPayload>,
) -> Response {
    let empresa_name = payload.empresa_name.trim().to_string();
    let email = payload.email.trim().to_lowercase();

    if empresa_name.is_empty() || email.is_empty() || payload.password.is_empty() {
        return JsonResponse::bad_request("Missing required registration fields").into_response();
    }

    // Validate the plan before creating anything.
    let plan = match PlanTier::parse(&payload.plan) {
        Some(plan) => plan,
        None => return JsonResponse::bad_request("Unknown plan").into_response(),
    };
    let price_id = plan.price_id(&state.config.stripe).to_string();

    if let Ok(true) = state.db.is_email_taken(&email).await {
        return JsonResponse::conflict("User already registered").into_response();
    }

    let password_hash = match hash_password(&payload.password) {
        Ok(hash) => hash,
        Err(_) => return JsonResponse::server_error("Password hashing failed").into_response(),
    };

    let empresa = match state.empresa_repo.create_empresa(&empresa_name).await {
        Ok(empresa) => empresa,
        Err(e) => {
            eprintln!("Failed to insert empresa: {:?}", e);
            return JsonResponse::bad_request("Could not create account").into_response();
        }
    };

    if let Err(e) = state
        .db
        .create_admin_user(&email, &password_hash, empresa.id)
        .await
    {
        eprintln!("Failed to insert admin user: {:?}", e);
        cleanup_empresa(&state, empresa.id).await;
        return JsonResponse::bad_request("Could not create account").into_response();
    }

    let metadata: BTreeMap<String, String> = [(
        EMPRESA_METADATA_KEY.to_string(),
        empresa.id.to_string(),
    )]
    .into_iter()
    .collect();

    let customer_id = match state
        .stripe
        .create_customer(&email, Some(&empresa_name), metadata.clone())
        .await
    {
        Ok(id) => id,
        Err(e) => {
            eprintln!("Failed to create payment customer: {:?}", e);
            cleanup_empresa(&state, empresa.id).await;
            return JsonResponse::bad_request("Could not create account").into_response();
        }
    };

    let session_req = CreateCheckoutSessionRequest {
        success_url: format!("{}/registro/completado", state.config.frontend_origin),
        cancel_url: format!("{}/registro/cancelado", state.config.frontend_origin),
        price_id,
        customer: customer_id,
        client_reference_id: Some(empresa.id.to_string()),
        metadata: Some(metadata),
    };

    let session = match state.stripe.create_checkout_session(session_req).await {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Failed to create checkout session: {:?}", e);
            cleanup_empresa(&state, empresa.id).await;
            return JsonResponse::bad_request("Could not create account").into_response();
        }
    };

    let checkout_url = match session.url {
        Some(url) => url,
        None => {
            eprintln!("Checkout session {} returned no redirect url", session.id);
            cleanup_empresa(&state, empresa.id).await;
            return JsonResponse::bad_request("Could not create account").into_response();
        }
    };

    // Best-effort; the admin can always reach checkout from the returned URL.
    if let Err(err) = state
        .mailer
        .send_welcome_email(&email, &empresa_name, &checkout_url)
        .await
    {
        eprintln!("Failed to send welcome email: {}", err);
    }

    Json(json!({
        "success": true,
        "empresa_id": empresa.id,
        "checkout_url": checkout_url
    }))
    .into_response()
}

async fn cleanup_empresa(state: &AppState, empresa_id: Uuid) {
    if let Err(e) = state.empresa_repo.delete_empresa(empresa_id).await {
        eprintln!("Failed to clean up empresa {}: {:?}", empresa_id, e);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        extract::Request,
        http::StatusCode,
        routing::post,
        Router,
    };
    use tower::ServiceExt;

    use crate::{
        config::{Config, StripeSettings},
        db::mock_db::{MockDb, MockEmpresaRepository, MockSubscriptionRepository},
        services::{smtp_mailer::MockMailer, stripe::MockStripeService},
        state::AppState,
    };

    use super::*;

    fn test_config() -> Arc<Config> {
        Arc::new(Config {
            database_url: String::new(),
            frontend_origin: "https://estudio.example.com".into(),
            stripe: StripeSettings {
                secret_key: "sk_test_stub".into(),
                webhook_secret: "whsec_stub".into(),
                price_starter: "price_starter".into(),
                price_studio: "price_studio".into(),
                price_agency: "price_agency".into(),
            },
            auth_cookie_secure: true,
        })
    }

    struct TestHarness {
        app: Router,
        db: Arc<MockDb>,
        empresa_repo: Arc<MockEmpresaRepository>,
        stripe: Arc<MockStripeService>,
        mailer: Arc<MockMailer>,
    }

    fn build_harness(db: MockDb, stripe: MockStripeService) -> TestHarness {
        let db = Arc::new(db);
        let empresa_repo = Arc::new(MockEmpresaRepository::default());
        let stripe = Arc::new(stripe);
        let mailer = Arc::new(MockMailer::default());
        let state = AppState {
            db: db.clone(),
            empresa_repo: empresa_repo.clone(),
            subscription_repo: Arc::new(MockSubscriptionRepository::default()),
            mailer: mailer.clone(),
            stripe: stripe.clone(),
            config: test_config(),
        };

        TestHarness {
            app: Router::new()
                .route("/registration", post(handle_registration))
                .with_state(state),
            db,
            empresa_repo,
            stripe,
            mailer,
        }
    }

    fn payload(plan: &str) -> RegistrationPayload {
        RegistrationPayload {
            empresa_name: "Acme SL".into(),
            email: "owner@acme.example".into(),
            password: "correct horse battery".into(),
            plan: plan.into(),
        }
    }

    async fn post_registration(
        app: Router,
        payload: &RegistrationPayload,
    ) -> axum::response::Response {
        app.oneshot(
            Request::post("/registration")
                .header("Content-Type", "application/json")
                .body(Body::from(serde_json::to_vec(payload).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn registration_happy_path_returns_checkout_url() {
        let harness = build_harness(MockDb::default(), MockStripeService::new());

        let res = post_registration(harness.app.clone(), &payload("starter")).await;
        assert_eq!(res.status(), StatusCode::OK);

        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["checkout_url"], "https://example.test/checkout");

        // Empresa and admin user were provisioned
        let empresas = harness.empresa_repo.empresas.lock().unwrap().clone();
        assert_eq!(empresas.len(), 1);
        assert_eq!(empresas[0].name, "Acme SL");
        let users = harness.db.created_users.lock().unwrap().clone();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].0, "owner@acme.example");
        assert_eq!(users[0].2, empresas[0].id);

        // Stripe customer carries the empresa linkage and the session sells
        // the configured starter price
        let customers = harness.stripe.created_customers.lock().unwrap().clone();
        assert_eq!(customers.len(), 1);
        assert_eq!(
            customers[0].metadata.get(EMPRESA_METADATA_KEY),
            Some(&empresas[0].id.to_string())
        );
        let requests = harness.stripe.last_create_requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].price_id, "price_starter");
        assert_eq!(
            requests[0].client_reference_id.as_deref(),
            Some(empresas[0].id.to_string().as_str())
        );

        // Welcome email recorded
        let emails = harness.mailer.sent_welcome_emails.lock().unwrap().clone();
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].0, "owner@acme.example");
    }

    #[tokio::test]
    async fn registration_with_unknown_plan_creates_nothing() {
        let harness = build_harness(MockDb::default(), MockStripeService::new());

        let res = post_registration(harness.app.clone(), &payload("enterprise")).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        assert!(harness.empresa_repo.empresas.lock().unwrap().is_empty());
        assert!(harness.db.created_users.lock().unwrap().is_empty());
        assert!(harness.stripe.created_customers.lock().unwrap().is_empty());
        assert!(harness.stripe.created_sessions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn registration_with_taken_email_conflicts() {
        let harness = build_harness(
            MockDb {
                email_taken: true,
                ..Default::default()
            },
            MockStripeService::new(),
        );

        let res = post_registration(harness.app.clone(), &payload("studio")).await;
        assert_eq!(res.status(), StatusCode::CONFLICT);
        assert!(harness.empresa_repo.empresas.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn registration_cleans_up_empresa_when_customer_creation_fails() {
        let stripe = MockStripeService::new();
        *stripe.fail_create_customer.lock().unwrap() = true;
        let harness = build_harness(MockDb::default(), stripe);

        let res = post_registration(harness.app.clone(), &payload("starter")).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        assert!(harness.empresa_repo.empresas.lock().unwrap().is_empty());
        assert_eq!(harness.empresa_repo.deleted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn registration_cleans_up_empresa_when_session_creation_fails() {
        let stripe = MockStripeService::new();
        *stripe.fail_create_session.lock().unwrap() = true;
        let harness = build_harness(MockDb::default(), stripe);

        let res = post_registration(harness.app.clone(), &payload("agency")).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(harness.empresa_repo.empresas.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn registration_succeeds_even_when_welcome_email_fails() {
        let db = MockDb::default();
        let harness = {
            let db = Arc::new(db);
            let empresa_repo = Arc::new(MockEmpresaRepository::default());
            let stripe = Arc::new(MockStripeService::new());
            let mailer = Arc::new(MockMailer {
                fail_send: true,
                ..Default::default()
            });
            let state = AppState {
                db: db.clone(),
                empresa_repo: empresa_repo.clone(),
                subscription_repo: Arc::new(MockSubscriptionRepository::default()),
                mailer: mailer.clone(),
                stripe: stripe.clone(),
                config: test_config(),
            };
            TestHarness {
                app: Router::new()
                    .route("/registration", post(handle_registration))
                    .with_state(state),
                db,
                empresa_repo,
                stripe,
                mailer,
            }
        };

        let res = post_registration(harness.app.clone(), &payload("starter")).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(harness.empresa_repo.empresas.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn registration_rejects_missing_fields() {
        let harness = build_harness(MockDb::default(), MockStripeService::new());

        let mut bad = payload("starter");
        bad.email = "   ".into();
        let res = post_registration(harness.app.clone(), &bad).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(harness.empresa_repo.empresas.lock().unwrap().is_empty());
    }
}
