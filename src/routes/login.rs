// routes/login.rs
// POST /login { "email": "...", "code": "123456" } -> session cookie + { "ok": true }

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{HeaderValue, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    error::ApiResult,
    session::SESSION_COOKIE_NAME,
    state::{AppState, create_session, find_user},
    totp::verify_code,
};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub code: String,
}

pub(super) fn session_cookie(token: &str, max_age: u64) -> String {
    format!("{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}")
}

/// Checks the current TOTP code (±1 step) and opens a session.
pub async fn login(
    State(st): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<Response> {
    let Some(user) = find_user(&st, &body.email).await? else {
        warn!(email = %body.email, "login for unknown user");
        return Ok((StatusCode::UNAUTHORIZED, Json(serde_json::json!({ "ok": false }))).into_response());
    };

    if !verify_code(&user.email, &user.secret, body.code.trim())? {
        warn!(email = %user.email, "login with wrong code");
        return Ok((StatusCode::UNAUTHORIZED, Json(serde_json::json!({ "ok": false }))).into_response());
    }

    let token = create_session(&st, &user.email).await?;
    info!(email = %user.email, "user signed in");

    let mut response = Json(serde_json::json!({ "ok": true, "token": &token })).into_response();
    if let Ok(value) = HeaderValue::from_str(&session_cookie(&token, st.settings.session_ttl_seconds)) {
        response.headers_mut().append(SET_COOKIE, value);
    }
    Ok(response)
}
