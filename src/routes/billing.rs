use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::responses::JsonResponse;
use crate::routes::auth::session::AuthSession;
use crate::state::AppState;

// GET /api/billing/subscription
pub async fn get_subscription(
    State(app_state): State<AppState>,
    AuthSession(claims): AuthSession,
) -> Response {
    let empresa_id = match Uuid::parse_str(&claims.empresa_id) {
        Ok(id) => id,
        Err(_) => return JsonResponse::unauthorized("Invalid session").into_response(),
    };

    let empresa = match app_state.empresa_repo.find_empresa(empresa_id).await {
        Ok(empresa) => empresa,
        Err(err) => {
            error!(?err, %empresa_id, "failed to load empresa");
            return JsonResponse::server_error("Database error").into_response();
        }
    };

    match app_state.subscription_repo.find_by_empresa(empresa_id).await {
        Ok(Some(subscription)) => Json(json!({
            "success": true,
            "empresa": empresa,
            "subscription": subscription
        }))
        .into_response(),
        Ok(None) => JsonResponse::not_found("No subscription on file").into_response(),
        Err(err) => {
            error!(?err, %empresa_id, "failed to load subscription");
            JsonResponse::server_error("Database error").into_response()
        }
    }
}
