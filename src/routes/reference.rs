// routes/reference.rs
// Global lists: unit types, payable categories, utility types, payment methods.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, ApiResult, DomainError},
    models::ReferenceKind,
    session::SessionUser,
    state::{
        AppState, ReferenceEntry, ReferenceInput, create_reference, delete_reference,
        list_reference, update_reference,
    },
};

use super::helpers::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceForm {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    factor: Option<f64>,
    #[serde(default)]
    is_multi_level: Option<bool>,
}

impl From<ReferenceForm> for ReferenceInput {
    fn from(form: ReferenceForm) -> Self {
        ReferenceInput {
            name: form.name,
            description: form.description,
            factor: form.factor,
            is_multi_level: form.is_multi_level,
        }
    }
}

#[derive(Serialize)]
pub struct ReferenceRow {
    id: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    factor: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_multi_level: Option<bool>,
}

impl From<ReferenceEntry> for ReferenceRow {
    fn from(e: ReferenceEntry) -> Self {
        ReferenceRow {
            id: e.id.to_hex(),
            name: e.name,
            description: e.description,
            factor: e.factor,
            is_multi_level: e.is_multi_level,
        }
    }
}

fn parse_kind(kind: &str) -> Result<ReferenceKind, ApiError> {
    ReferenceKind::parse(kind).ok_or_else(|| DomainError::not_found("reference list").into())
}

pub async fn reference_index(
    _session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
) -> ApiResult<Json<Vec<ReferenceRow>>> {
    let kind = parse_kind(&kind)?;
    let entries = list_reference(&state, kind).await?;
    Ok(Json(entries.into_iter().map(ReferenceRow::from).collect()))
}

pub async fn reference_create(
    _session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Json(form): Json<ReferenceForm>,
) -> ApiResult<impl IntoResponse> {
    let parsed = parse_kind(&kind)?;
    let id = create_reference(&state, parsed, form.clone().into())
        .await
        .map_err(|e| write_failed(parsed.collection(), "create", &form, e))?;
    Ok(created(id))
}

pub async fn reference_update(
    _session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, String)>,
    Json(form): Json<ReferenceForm>,
) -> ApiResult<impl IntoResponse> {
    let parsed = parse_kind(&kind)?;
    let id = parse_object_id(&id, "reference id")?;
    let path = format!("{}/{}", parsed.collection(), id.to_hex());
    update_reference(&state, parsed, &id, form.clone().into())
        .await
        .map_err(|e| write_failed(&path, "update", &form, e))?;
    Ok(ok())
}

pub async fn reference_delete(
    _session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let parsed = parse_kind(&kind)?;
    let id = parse_object_id(&id, "reference id")?;
    let path = format!("{}/{}", parsed.collection(), id.to_hex());
    delete_reference(&state, parsed, &id)
        .await
        .map_err(|e| write_failed(&path, "delete", &(), e))?;
    Ok(ok())
}
