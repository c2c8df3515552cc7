use std::str::FromStr;

use axum::{Json, http::StatusCode, response::IntoResponse};
use chrono::{NaiveDate, Utc};
use mongodb::bson::{DateTime, oid::ObjectId};
use serde::Serialize;
use tracing::error;

use crate::{
    error::{ApiError, DomainError},
    models::Building,
    session::SessionUser,
    state::{AppState, bson_to_date, get_building_by_id},
};

pub(super) fn parse_object_id(value: &str, label: &str) -> Result<ObjectId, ApiError> {
    ObjectId::from_str(value.trim())
        .map_err(|_| DomainError::validation(format!("invalid {label}")).into())
}

/// Blank or missing values become `None`.
pub(super) fn parse_opt_object_id(
    value: Option<&str>,
    label: &str,
) -> Result<Option<ObjectId>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => parse_object_id(v, label).map(Some),
        None => Ok(None),
    }
}

pub(super) fn parse_object_ids(values: &[String], label: &str) -> Result<Vec<ObjectId>, ApiError> {
    values.iter().map(|v| parse_object_id(v, label)).collect()
}

pub(super) fn parse_date(value: &str, label: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        DomainError::validation(format!("{label} must be a date (YYYY-MM-DD)")).into()
    })
}

pub(super) fn parse_opt_date(value: Option<&str>, label: &str) -> Result<Option<NaiveDate>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => parse_date(v, label).map(Some),
        None => Ok(None),
    }
}

/// Server's UTC calendar date, used as "today" for range selectors.
pub(super) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub(super) fn hex(id: Option<ObjectId>) -> String {
    id.map(|id| id.to_hex()).unwrap_or_default()
}

pub(super) fn opt_hex(id: Option<ObjectId>) -> Option<String> {
    id.map(|id| id.to_hex())
}

pub(super) fn iso_date(value: DateTime) -> String {
    bson_to_date(value).format("%Y-%m-%d").to_string()
}

pub(super) fn created(id: ObjectId) -> impl IntoResponse {
    (
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": id.to_hex() })),
    )
}

pub(super) fn ok() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}

/// Logs a rejected or failed write with the document path, the operation
/// and the attempted payload, then converts the error for the response.
pub(super) fn write_failed<P: Serialize>(
    path: &str,
    operation: &str,
    payload: &P,
    err: impl Into<ApiError>,
) -> ApiError {
    let err = err.into();
    let payload = serde_json::to_string(payload).unwrap_or_default();
    match &err {
        ApiError::Internal(source) => {
            error!(path, operation, payload = %payload, error = ?source, "write failed")
        }
        other => {
            error!(path, operation, payload = %payload, status = %other.status(), error = ?other, "write rejected")
        }
    }
    err
}

/// Building owned by the session user, including binned ones.
pub(super) async fn owned_building(
    state: &AppState,
    session: &SessionUser,
    id: &str,
) -> Result<(ObjectId, Building), ApiError> {
    let id = parse_object_id(id, "building id")?;
    let building = get_building_by_id(state, &id)
        .await?
        .ok_or(DomainError::not_found("building"))?;
    if &building.owner_uid != session.user_id() {
        return Err(ApiError::Forbidden);
    }
    Ok((id, building))
}

/// Like [`owned_building`], but binned buildings are hidden.
pub(super) async fn active_building(
    state: &AppState,
    session: &SessionUser,
    id: &str,
) -> Result<(ObjectId, Building), ApiError> {
    let (id, building) = owned_building(state, session, id).await?;
    if building.is_deleted {
        return Err(DomainError::not_found("building").into());
    }
    Ok((id, building))
}
