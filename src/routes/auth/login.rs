use axum::{
    extract::{Json, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, to_value};

use crate::routes::auth::claims::Claims;
use crate::{
    responses::JsonResponse,
    state::AppState,
    utils::{jwt::create_jwt, password::verify_password},
};

#[derive(Deserialize, Serialize)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
    pub remember: bool,
}

pub async fn handle_login(
    State(app_state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Response {
    let email = payload.email.trim().to_lowercase();
    let user = match app_state.db.find_user_by_email(&email).await {
        Ok(Some(record)) => record,
        Ok(None) => return JsonResponse::unauthorized("Invalid credentials").into_response(),
        Err(e) => {
            eprintln!("DB error: {:?}", e);
            return JsonResponse::server_error("Database error").into_response();
        }
    };

    match verify_password(&payload.password, &user.password_hash) {
        Ok(true) => {
            let expires_in = if payload.remember {
                Duration::days(30)
            } else {
                Duration::days(7)
            };

            let claims = Claims {
                id: user.id.to_string(),
                email: user.email.clone(),
                empresa_id: user.empresa_id.to_string(),
                role: user.role,
                exp: (Utc::now() + expires_in).timestamp() as usize,
            };

            match create_jwt(&claims) {
                Ok(token) => {
                    let cookie = Cookie::build(("auth_token", token))
                        .http_only(true)
                        .secure(app_state.config.auth_cookie_secure)
                        .same_site(SameSite::Lax)
                        .path("/")
                        .max_age(time::Duration::seconds(expires_in.num_seconds()))
                        .build();

                    let mut headers = HeaderMap::new();
                    headers.insert(
                        header::SET_COOKIE,
                        HeaderValue::from_str(&cookie.to_string()).unwrap(),
                    );
                    let user_json = to_value(&user).expect("User serialization failed");
                    (
                        StatusCode::OK,
                        headers,
                        Json(json!({
                            "success": true,
                            "user": user_json
                        })),
                    )
                        .into_response()
                }
                Err(e) => {
                    eprintln!("JWT error: {:?}", e);
                    JsonResponse::server_error("Token generation failed").into_response()
                }
            }
        }
        Ok(false) => JsonResponse::unauthorized("Invalid credentials").into_response(),
        Err(e) => {
            eprintln!("Password verification error: {:?}", e);
            JsonResponse::server_error("Internal error").into_response()
        }
    }
}
