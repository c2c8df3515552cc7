// error.rs
// Domain rule violations and the JSON error response returned by handlers.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Rule violations raised by the calculators and the persistence layer.
///
/// The state layer returns `anyhow::Result`; these travel inside the
/// `anyhow::Error` so handlers can downcast and pick a status code.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DomainError {
    #[error("{0}")]
    Validation(String),

    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    #[error("{0}")]
    Conflict(String),

    #[error("invalid quarter label: {0:?} (expected \"Q<1-4> <year>\")")]
    InvalidQuarter(String),

    #[error("invalid range selector: {0:?}")]
    InvalidRange(String),

    #[error("apportionment failed: {0}")]
    Apportionment(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        DomainError::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        DomainError::Conflict(msg.into())
    }

    pub fn not_found(entity: &'static str) -> Self {
        DomainError::NotFound { entity }
    }
}

/// Error returned from HTTP handlers.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    Forbidden,
    Domain(DomainError),
    Internal(anyhow::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Domain(err) => match err {
                DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
                DomainError::Conflict(_) => StatusCode::CONFLICT,
                DomainError::Validation(_)
                | DomainError::InvalidQuarter(_)
                | DomainError::InvalidRange(_)
                | DomainError::Apportionment(_) => StatusCode::BAD_REQUEST,
            },
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<DomainError>() {
            Ok(domain) => ApiError::Domain(domain),
            Err(other) => ApiError::Internal(other),
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Unauthorized => "unauthorized".to_string(),
            ApiError::Forbidden => "forbidden".to_string(),
            ApiError::Domain(err) => err.to_string(),
            ApiError::Internal(err) => {
                tracing::error!(error = ?err, "request failed");
                "internal error".to_string()
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_survive_anyhow_round_trip() {
        let err: anyhow::Error = DomainError::conflict("level still has units").into();
        let api = ApiError::from(err);
        assert_eq!(api.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn plain_errors_become_internal() {
        let api = ApiError::from(anyhow::anyhow!("socket closed"));
        assert_eq!(api.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn context_does_not_hide_domain_error() {
        use anyhow::Context;
        let res: anyhow::Result<()> =
            Err(DomainError::not_found("unit")).context("loading unit statement");
        let api = ApiError::from(res.unwrap_err());
        assert_eq!(api.status(), StatusCode::NOT_FOUND);
    }
}
