// routes/logout.rs
// POST /logout -> removes the session entry and expires the cookie.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderValue, header::SET_COOKIE},
    response::{IntoResponse, Response},
};

use crate::{
    error::ApiResult,
    session::SessionUser,
    state::{AppState, delete_session},
};

use super::{helpers::ok, login::session_cookie};

pub async fn logout(State(st): State<Arc<AppState>>, session: SessionUser) -> ApiResult<Response> {
    delete_session(&st, session.token()).await?;

    let mut response = ok().into_response();
    if let Ok(value) = HeaderValue::from_str(&session_cookie("", 0)) {
        response.headers_mut().append(SET_COOKIE, value);
    }
    Ok(response)
}
