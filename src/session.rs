// session.rs
// Session middleware protecting the API and extractor for the signed-in user.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{
        HeaderMap,
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use mongodb::bson::oid::ObjectId;
use tracing::error;

use crate::{
    error::ApiError,
    state::{AppState, AuthUser, find_user_by_session},
};

pub const SESSION_COOKIE_NAME: &str = "session";

#[derive(Clone)]
pub struct SessionData {
    pub user: AuthUser,
    pub token: String,
}

/// Resolves the session cookie (or a bearer token) to a user and stores it
/// in the request extensions. Unknown or expired tokens get a 401.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    let tokens = session_tokens(request.headers());
    if tokens.is_empty() {
        return Err(ApiError::Unauthorized.into_response());
    }

    // Several cookies may share the name; the first live one wins.
    for token in tokens {
        match find_user_by_session(&state, &token).await {
            Ok(Some(user)) => {
                request.extensions_mut().insert(SessionData { user, token });
                return Ok(next.run(request).await);
            }
            Ok(None) => continue,
            Err(err) => {
                error!(error = %err, "session lookup failed");
                return Err(ApiError::Internal(err).into_response());
            }
        }
    }
    Err(ApiError::Unauthorized.into_response())
}

pub struct SessionUser(pub SessionData);

impl SessionUser {
    pub fn user(&self) -> &AuthUser {
        &self.0.user
    }

    pub fn token(&self) -> &str {
        &self.0.token
    }

    /// Owner uid stamped on the user's buildings.
    pub fn user_id(&self) -> &ObjectId {
        &self.0.user.id
    }
}

#[allow(refining_impl_trait)]
impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> BoxFuture<'static, Result<Self, Self::Rejection>> {
        let data = parts.extensions.get::<SessionData>().cloned();
        Box::pin(async move {
            data.map(SessionUser)
                .ok_or_else(|| ApiError::Unauthorized.into_response())
        })
    }
}

/// Bearer token first, then every cookie named [`SESSION_COOKIE_NAME`].
fn session_tokens(headers: &HeaderMap) -> Vec<String> {
    let mut tokens = Vec::new();
    if let Some(token) = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        tokens.push(token.to_owned());
    }
    tokens.extend(extract_cookies(headers, SESSION_COOKIE_NAME));
    tokens
}

fn extract_cookies(headers: &HeaderMap, name: &str) -> Vec<String> {
    headers
        .get_all(COOKIE)
        .into_iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key.trim() == name && !value.trim().is_empty()).then(|| value.trim().to_owned())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_then_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.append(COOKIE, HeaderValue::from_static("theme=dark; session=one"));
        headers.append(COOKIE, HeaderValue::from_static("session=two"));
        assert_eq!(session_tokens(&headers), vec!["abc", "one", "two"]);
    }

    #[test]
    fn ignores_other_cookies_and_blank_values() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("sessionx=1; session="));
        assert!(session_tokens(&headers).is_empty());
    }
}
