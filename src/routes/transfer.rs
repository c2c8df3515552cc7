use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{
    error::ApiResult,
    session::SessionUser,
    state::{AppState, BuildingExport, export_building, import_building},
};

use super::helpers::*;

pub async fn buildings_export(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<BuildingExport>> {
    let (_, building) = active_building(&state, &session_user, &id).await?;
    Ok(Json(export_building(&state, &building).await?))
}

/// Creates a new building for the session user from an exported document.
pub async fn buildings_import(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Json(document): Json<BuildingExport>,
) -> ApiResult<impl IntoResponse> {
    let id = import_building(&state, session_user.user_id(), document.clone())
        .await
        .map_err(|e| write_failed("buildings", "import", &document, e))?;
    Ok(created(id))
}
