// routes/units.rs
// Unit CRUD plus attach/detach of child units.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiResult, DomainError},
    models::Unit,
    session::SessionUser,
    state::{
        AppState, UnitInput, attach_child, building_path, create_unit, delete_unit, detach_child,
        get_unit_by_id, list_units, update_unit,
    },
};

use super::helpers::*;

#[derive(Debug, Serialize, Deserialize)]
pub struct UnitForm {
    unit_number: String,
    unit_type_id: String,
    level_id: String,
    size: f64,
    #[serde(default)]
    quarterly_maintenance_fee: Option<f64>,
    #[serde(default)]
    owner_id: Option<String>,
    #[serde(default)]
    parent_unit_id: Option<String>,
}

impl UnitForm {
    fn to_input(&self) -> ApiResult<UnitInput> {
        Ok(UnitInput {
            unit_number: self.unit_number.clone(),
            unit_type_id: parse_object_id(&self.unit_type_id, "unit type id")?,
            level_id: parse_object_id(&self.level_id, "level id")?,
            size: self.size,
            quarterly_maintenance_fee: self.quarterly_maintenance_fee,
            owner_id: parse_opt_object_id(self.owner_id.as_deref(), "owner id")?,
            parent_unit_id: parse_opt_object_id(self.parent_unit_id.as_deref(), "parent unit id")?,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AttachForm {
    parent_unit_id: String,
}

#[derive(Serialize)]
pub struct UnitRow {
    id: String,
    unit_number: String,
    unit_type_id: String,
    level_id: String,
    size: f64,
    quarterly_maintenance_fee: Option<f64>,
    owner_id: Option<String>,
    parent_unit_id: Option<String>,
    child_unit_ids: Vec<String>,
}

impl From<Unit> for UnitRow {
    fn from(u: Unit) -> Self {
        UnitRow {
            id: hex(u.id),
            unit_number: u.unit_number,
            unit_type_id: u.unit_type_id.to_hex(),
            level_id: u.level_id.to_hex(),
            size: u.size,
            quarterly_maintenance_fee: u.quarterly_maintenance_fee,
            owner_id: opt_hex(u.owner_id),
            parent_unit_id: opt_hex(u.parent_unit_id),
            child_unit_ids: u.child_unit_ids.iter().map(|id| id.to_hex()).collect(),
        }
    }
}

pub async fn units_index(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<UnitRow>>> {
    let (building_id, _) = active_building(&state, &session_user, &id).await?;
    let mut units = list_units(&state, &building_id).await?;
    units.sort_by(|a, b| a.unit_number.cmp(&b.unit_number));
    Ok(Json(units.into_iter().map(UnitRow::from).collect()))
}

pub async fn units_show(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((id, unit_id)): Path<(String, String)>,
) -> ApiResult<Json<UnitRow>> {
    let (building_id, _) = active_building(&state, &session_user, &id).await?;
    let unit_id = parse_object_id(&unit_id, "unit id")?;
    let unit = get_unit_by_id(&state, &building_id, &unit_id)
        .await?
        .ok_or(DomainError::not_found("unit"))?;
    Ok(Json(UnitRow::from(unit)))
}

pub async fn units_create(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(form): Json<UnitForm>,
) -> ApiResult<impl IntoResponse> {
    let (building_id, building) = active_building(&state, &session_user, &id).await?;
    let path = building_path(&building_id, "units");
    let input = form
        .to_input()
        .map_err(|e| write_failed(&path, "create", &form, e))?;
    let unit_id = create_unit(&state, &building, input)
        .await
        .map_err(|e| write_failed(&path, "create", &form, e))?;
    Ok(created(unit_id))
}

pub async fn units_update(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((id, unit_id)): Path<(String, String)>,
    Json(form): Json<UnitForm>,
) -> ApiResult<impl IntoResponse> {
    let (building_id, building) = active_building(&state, &session_user, &id).await?;
    let unit_id = parse_object_id(&unit_id, "unit id")?;
    let path = format!("{}/{}", building_path(&building_id, "units"), unit_id.to_hex());
    let input = form
        .to_input()
        .map_err(|e| write_failed(&path, "update", &form, e))?;
    update_unit(&state, &building, &unit_id, input)
        .await
        .map_err(|e| write_failed(&path, "update", &form, e))?;
    Ok(ok())
}

pub async fn units_delete(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((id, unit_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let (building_id, _) = active_building(&state, &session_user, &id).await?;
    let unit_id = parse_object_id(&unit_id, "unit id")?;
    let path = format!("{}/{}", building_path(&building_id, "units"), unit_id.to_hex());
    delete_unit(&state, &building_id, &unit_id)
        .await
        .map_err(|e| write_failed(&path, "delete", &(), e))?;
    Ok(ok())
}

pub async fn units_attach(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((id, unit_id)): Path<(String, String)>,
    Json(form): Json<AttachForm>,
) -> ApiResult<impl IntoResponse> {
    let (building_id, _) = active_building(&state, &session_user, &id).await?;
    let child_id = parse_object_id(&unit_id, "unit id")?;
    let parent_id = parse_object_id(&form.parent_unit_id, "parent unit id")?;
    let path = format!("{}/{}", building_path(&building_id, "units"), child_id.to_hex());
    attach_child(&state, &building_id, &child_id, &parent_id)
        .await
        .map_err(|e| write_failed(&path, "attach", &form, e))?;
    Ok(ok())
}

pub async fn units_detach(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((id, unit_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let (building_id, _) = active_building(&state, &session_user, &id).await?;
    let child_id = parse_object_id(&unit_id, "unit id")?;
    let path = format!("{}/{}", building_path(&building_id, "units"), child_id.to_hex());
    detach_child(&state, &building_id, &child_id)
        .await
        .map_err(|e| write_failed(&path, "detach", &(), e))?;
    Ok(ok())
}
