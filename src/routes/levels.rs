use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiResult, DomainError},
    models::{Level, LevelType},
    session::SessionUser,
    state::{
        AppState, LevelInput, building_path, create_level, delete_level, get_level_by_id,
        list_levels, update_level,
    },
};

use super::helpers::*;

#[derive(Debug, Serialize, Deserialize)]
pub struct LevelForm {
    name: String,
    level_type: String,
    #[serde(default)]
    floor_number: Option<i32>,
    #[serde(default)]
    local_common_area: f64,
}

impl LevelForm {
    fn to_input(&self) -> ApiResult<LevelInput> {
        let level_type = LevelType::parse(&self.level_type).ok_or_else(|| {
            DomainError::validation(format!("unknown level type {:?}", self.level_type))
        })?;
        Ok(LevelInput {
            name: self.name.clone(),
            level_type,
            floor_number: self.floor_number,
            local_common_area: self.local_common_area,
        })
    }
}

#[derive(Serialize)]
pub struct LevelRow {
    id: String,
    name: String,
    level_type: &'static str,
    floor_number: Option<i32>,
    local_common_area: f64,
}

impl From<Level> for LevelRow {
    fn from(l: Level) -> Self {
        LevelRow {
            id: hex(l.id),
            name: l.name,
            level_type: l.level_type.as_str(),
            floor_number: l.floor_number,
            local_common_area: l.local_common_area,
        }
    }
}

pub async fn levels_index(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<LevelRow>>> {
    let (building_id, _) = active_building(&state, &session_user, &id).await?;
    let levels = list_levels(&state, &building_id).await?;
    Ok(Json(levels.into_iter().map(LevelRow::from).collect()))
}

pub async fn levels_show(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((id, level_id)): Path<(String, String)>,
) -> ApiResult<Json<LevelRow>> {
    let (building_id, _) = active_building(&state, &session_user, &id).await?;
    let level_id = parse_object_id(&level_id, "level id")?;
    let level = get_level_by_id(&state, &building_id, &level_id)
        .await?
        .ok_or(DomainError::not_found("level"))?;
    Ok(Json(LevelRow::from(level)))
}

pub async fn levels_create(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(form): Json<LevelForm>,
) -> ApiResult<impl IntoResponse> {
    let (building_id, _) = active_building(&state, &session_user, &id).await?;
    let path = building_path(&building_id, "levels");
    let input = form
        .to_input()
        .map_err(|e| write_failed(&path, "create", &form, e))?;
    let level_id = create_level(&state, &building_id, input)
        .await
        .map_err(|e| write_failed(&path, "create", &form, e))?;
    Ok(created(level_id))
}

pub async fn levels_update(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((id, level_id)): Path<(String, String)>,
    Json(form): Json<LevelForm>,
) -> ApiResult<impl IntoResponse> {
    let (building_id, _) = active_building(&state, &session_user, &id).await?;
    let level_id = parse_object_id(&level_id, "level id")?;
    let path = format!("{}/{}", building_path(&building_id, "levels"), level_id.to_hex());
    let input = form
        .to_input()
        .map_err(|e| write_failed(&path, "update", &form, e))?;
    update_level(&state, &building_id, &level_id, input)
        .await
        .map_err(|e| write_failed(&path, "update", &form, e))?;
    Ok(ok())
}

pub async fn levels_delete(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((id, level_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let (building_id, _) = active_building(&state, &session_user, &id).await?;
    let level_id = parse_object_id(&level_id, "level id")?;
    let path = format!("{}/{}", building_path(&building_id, "levels"), level_id.to_hex());
    delete_level(&state, &building_id, &level_id)
        .await
        .map_err(|e| write_failed(&path, "delete", &(), e))?;
    Ok(ok())
}
