// routes/buildings.rs
// Building CRUD, recycle bin and default level generation.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::ApiResult,
    models::Building,
    session::SessionUser,
    state::{
        AppState, BuildingInput, building_path, create_building, generate_default_levels,
        list_active_buildings, list_deleted_buildings, purge_building, restore_building,
        soft_delete_building, update_building,
    },
};

use super::helpers::*;

#[derive(Debug, Serialize, Deserialize)]
pub struct BuildingForm {
    name: String,
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    has_basement: bool,
    #[serde(default)]
    basement_count: u32,
    #[serde(default)]
    has_mezzanine: bool,
    #[serde(default)]
    mezzanine_count: u32,
    #[serde(default)]
    has_penthouse: bool,
    #[serde(default)]
    has_rooftop: bool,
    #[serde(default)]
    typical_floor_count: u32,
    financial_start_date: String,
    #[serde(default)]
    enabled_unit_type_ids: Vec<String>,
    #[serde(default)]
    annual_budget: Option<f64>,
    #[serde(default)]
    global_common_area: f64,
}

impl BuildingForm {
    fn to_input(&self) -> ApiResult<BuildingInput> {
        Ok(BuildingInput {
            name: self.name.clone(),
            address: self.address.clone(),
            has_basement: self.has_basement,
            basement_count: self.basement_count,
            has_mezzanine: self.has_mezzanine,
            mezzanine_count: self.mezzanine_count,
            has_penthouse: self.has_penthouse,
            has_rooftop: self.has_rooftop,
            typical_floor_count: self.typical_floor_count,
            financial_start_date: parse_date(&self.financial_start_date, "financial start date")?,
            enabled_unit_type_ids: parse_object_ids(&self.enabled_unit_type_ids, "unit type id")?,
            annual_budget: self.annual_budget,
            global_common_area: self.global_common_area,
        })
    }
}

#[derive(Serialize)]
pub struct BuildingRow {
    id: String,
    name: String,
    address: Option<String>,
    has_basement: bool,
    basement_count: u32,
    has_mezzanine: bool,
    mezzanine_count: u32,
    has_penthouse: bool,
    has_rooftop: bool,
    typical_floor_count: u32,
    financial_start_date: String,
    enabled_unit_type_ids: Vec<String>,
    annual_budget: Option<f64>,
    global_common_area: f64,
    is_deleted: bool,
    deleted_at: Option<String>,
}

impl From<Building> for BuildingRow {
    fn from(b: Building) -> Self {
        BuildingRow {
            id: hex(b.id),
            name: b.name,
            address: b.address,
            has_basement: b.has_basement,
            basement_count: b.basement_count,
            has_mezzanine: b.has_mezzanine,
            mezzanine_count: b.mezzanine_count,
            has_penthouse: b.has_penthouse,
            has_rooftop: b.has_rooftop,
            typical_floor_count: b.typical_floor_count,
            financial_start_date: iso_date(b.financial_start_date),
            enabled_unit_type_ids: b.enabled_unit_type_ids.iter().map(|id| id.to_hex()).collect(),
            annual_budget: b.annual_budget,
            global_common_area: b.global_common_area,
            is_deleted: b.is_deleted,
            deleted_at: b.deleted_at.map(|d| d.to_chrono().to_rfc3339()),
        }
    }
}

pub async fn buildings_index(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<BuildingRow>>> {
    let buildings = list_active_buildings(&state, session_user.user_id()).await?;
    Ok(Json(buildings.into_iter().map(BuildingRow::from).collect()))
}

pub async fn buildings_recycle_bin(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<BuildingRow>>> {
    let buildings = list_deleted_buildings(&state, session_user.user_id()).await?;
    Ok(Json(buildings.into_iter().map(BuildingRow::from).collect()))
}

pub async fn buildings_show(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<BuildingRow>> {
    let (_, building) = owned_building(&state, &session_user, &id).await?;
    Ok(Json(BuildingRow::from(building)))
}

pub async fn buildings_create(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Json(form): Json<BuildingForm>,
) -> ApiResult<impl IntoResponse> {
    let input = form
        .to_input()
        .map_err(|e| write_failed("buildings", "create", &form, e))?;
    let id = create_building(&state, session_user.user_id(), input)
        .await
        .map_err(|e| write_failed("buildings", "create", &form, e))?;
    Ok(created(id))
}

pub async fn buildings_update(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(form): Json<BuildingForm>,
) -> ApiResult<impl IntoResponse> {
    let (building_id, _) = active_building(&state, &session_user, &id).await?;
    let path = format!("buildings/{}", building_id.to_hex());
    let input = form
        .to_input()
        .map_err(|e| write_failed(&path, "update", &form, e))?;
    update_building(&state, &building_id, input)
        .await
        .map_err(|e| write_failed(&path, "update", &form, e))?;
    Ok(ok())
}

/// Soft delete: the building moves to the recycle bin.
pub async fn buildings_delete(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let (building_id, _) = active_building(&state, &session_user, &id).await?;
    soft_delete_building(&state, &building_id)
        .await
        .map_err(|e| write_failed(&format!("buildings/{id}"), "soft_delete", &(), e))?;
    Ok(ok())
}

pub async fn buildings_restore(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let (building_id, _) = owned_building(&state, &session_user, &id).await?;
    restore_building(&state, &building_id)
        .await
        .map_err(|e| write_failed(&format!("buildings/{id}"), "restore", &(), e))?;
    Ok(ok())
}

pub async fn buildings_purge(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let (building_id, _) = owned_building(&state, &session_user, &id).await?;
    purge_building(&state, &building_id)
        .await
        .map_err(|e| write_failed(&format!("buildings/{id}"), "purge", &(), e))?;
    Ok(ok())
}

pub async fn levels_generate(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let (building_id, building) = active_building(&state, &session_user, &id).await?;
    let created = generate_default_levels(&state, &building)
        .await
        .map_err(|e| write_failed(&building_path(&building_id, "levels"), "generate", &(), e))?;
    Ok(Json(serde_json::json!({
        "created": created.iter().map(|id| id.to_hex()).collect::<Vec<_>>(),
    })))
}
