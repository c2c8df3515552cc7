use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiResult, DomainError},
    models::Owner,
    session::SessionUser,
    state::{
        AppState, OwnerInput, building_path, create_owner, delete_owner, get_owner_by_id,
        list_owners, update_owner,
    },
};

use super::helpers::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerForm {
    name: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    national_id: Option<String>,
    #[serde(default)]
    notes: Option<String>,
}

impl From<OwnerForm> for OwnerInput {
    fn from(form: OwnerForm) -> Self {
        OwnerInput {
            name: form.name,
            email: form.email,
            phone: form.phone,
            national_id: form.national_id,
            notes: form.notes,
        }
    }
}

#[derive(Serialize)]
pub struct OwnerRow {
    id: String,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    national_id: Option<String>,
    notes: Option<String>,
}

impl From<Owner> for OwnerRow {
    fn from(o: Owner) -> Self {
        OwnerRow {
            id: hex(o.id),
            name: o.name,
            email: o.email,
            phone: o.phone,
            national_id: o.national_id,
            notes: o.notes,
        }
    }
}

pub async fn owners_index(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<OwnerRow>>> {
    let (building_id, _) = active_building(&state, &session_user, &id).await?;
    let owners = list_owners(&state, &building_id).await?;
    Ok(Json(owners.into_iter().map(OwnerRow::from).collect()))
}

pub async fn owners_show(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((id, owner_id)): Path<(String, String)>,
) -> ApiResult<Json<OwnerRow>> {
    let (building_id, _) = active_building(&state, &session_user, &id).await?;
    let owner_id = parse_object_id(&owner_id, "owner id")?;
    let owner = get_owner_by_id(&state, &building_id, &owner_id)
        .await?
        .ok_or(DomainError::not_found("owner"))?;
    Ok(Json(OwnerRow::from(owner)))
}

pub async fn owners_create(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(form): Json<OwnerForm>,
) -> ApiResult<impl IntoResponse> {
    let (building_id, _) = active_building(&state, &session_user, &id).await?;
    let owner_id = create_owner(&state, &building_id, form.clone().into())
        .await
        .map_err(|e| write_failed(&building_path(&building_id, "owners"), "create", &form, e))?;
    Ok(created(owner_id))
}

pub async fn owners_update(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((id, owner_id)): Path<(String, String)>,
    Json(form): Json<OwnerForm>,
) -> ApiResult<impl IntoResponse> {
    let (building_id, _) = active_building(&state, &session_user, &id).await?;
    let owner_id = parse_object_id(&owner_id, "owner id")?;
    let path = format!("{}/{}", building_path(&building_id, "owners"), owner_id.to_hex());
    update_owner(&state, &building_id, &owner_id, form.clone().into())
        .await
        .map_err(|e| write_failed(&path, "update", &form, e))?;
    Ok(ok())
}

pub async fn owners_delete(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((id, owner_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let (building_id, _) = active_building(&state, &session_user, &id).await?;
    let owner_id = parse_object_id(&owner_id, "owner id")?;
    let path = format!("{}/{}", building_path(&building_id, "owners"), owner_id.to_hex());
    delete_owner(&state, &building_id, &owner_id)
        .await
        .map_err(|e| write_failed(&path, "delete", &(), e))?;
    Ok(ok())
}
