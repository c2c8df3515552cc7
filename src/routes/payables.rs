use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiResult, DomainError},
    models::Payable,
    session::SessionUser,
    state::{
        AppState, PayableInput, building_path, create_payable, delete_payable,
        get_payable_by_id, list_payables, update_payable,
    },
};

use super::helpers::*;

#[derive(Debug, Serialize, Deserialize)]
pub struct PayableForm {
    category_id: String,
    #[serde(default)]
    employee_id: Option<String>,
    #[serde(default)]
    service_provider_id: Option<String>,
    #[serde(default)]
    utility_type_id: Option<String>,
    amount: f64,
    date: String,
    #[serde(default)]
    vendor: Option<String>,
    #[serde(default, skip_serializing)]
    receipt: Option<String>,
    #[serde(default)]
    notes: Option<String>,
}

impl PayableForm {
    fn to_input(&self) -> ApiResult<PayableInput> {
        Ok(PayableInput {
            category_id: parse_object_id(&self.category_id, "category id")?,
            employee_id: parse_opt_object_id(self.employee_id.as_deref(), "employee id")?,
            service_provider_id: parse_opt_object_id(
                self.service_provider_id.as_deref(),
                "service provider id",
            )?,
            utility_type_id: parse_opt_object_id(
                self.utility_type_id.as_deref(),
                "utility type id",
            )?,
            amount: self.amount,
            date: parse_date(&self.date, "payable date")?,
            vendor: self.vendor.clone(),
            receipt: self.receipt.clone(),
            notes: self.notes.clone(),
        })
    }
}

#[derive(Serialize)]
pub struct PayableRow {
    id: String,
    category_id: String,
    employee_id: Option<String>,
    service_provider_id: Option<String>,
    utility_type_id: Option<String>,
    amount: f64,
    date: String,
    vendor: Option<String>,
    receipt: Option<String>,
    notes: Option<String>,
}

impl From<Payable> for PayableRow {
    fn from(p: Payable) -> Self {
        PayableRow {
            id: hex(p.id),
            category_id: p.category_id.to_hex(),
            employee_id: opt_hex(p.employee_id),
            service_provider_id: opt_hex(p.service_provider_id),
            utility_type_id: opt_hex(p.utility_type_id),
            amount: p.amount,
            date: iso_date(p.date),
            vendor: p.vendor,
            receipt: p.receipt,
            notes: p.notes,
        }
    }
}

pub async fn payables_index(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<PayableRow>>> {
    let (building_id, _) = active_building(&state, &session_user, &id).await?;
    let mut payables = list_payables(&state, &building_id).await?;
    payables.sort_by_key(|p| std::cmp::Reverse(p.date));
    Ok(Json(payables.into_iter().map(PayableRow::from).collect()))
}

pub async fn payables_show(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((id, payable_id)): Path<(String, String)>,
) -> ApiResult<Json<PayableRow>> {
    let (building_id, _) = active_building(&state, &session_user, &id).await?;
    let payable_id = parse_object_id(&payable_id, "payable id")?;
    let payable = get_payable_by_id(&state, &building_id, &payable_id)
        .await?
        .ok_or(DomainError::not_found("payable"))?;
    Ok(Json(PayableRow::from(payable)))
}

pub async fn payables_create(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(form): Json<PayableForm>,
) -> ApiResult<impl IntoResponse> {
    let (building_id, _) = active_building(&state, &session_user, &id).await?;
    let path = building_path(&building_id, "payables");
    let input = form
        .to_input()
        .map_err(|e| write_failed(&path, "create", &form, e))?;
    let payable_id = create_payable(&state, &building_id, input)
        .await
        .map_err(|e| write_failed(&path, "create", &form, e))?;
    Ok(created(payable_id))
}

pub async fn payables_update(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((id, payable_id)): Path<(String, String)>,
    Json(form): Json<PayableForm>,
) -> ApiResult<impl IntoResponse> {
    let (building_id, _) = active_building(&state, &session_user, &id).await?;
    let payable_id = parse_object_id(&payable_id, "payable id")?;
    let path = format!("{}/{}", building_path(&building_id, "payables"), payable_id.to_hex());
    let input = form
        .to_input()
        .map_err(|e| write_failed(&path, "update", &form, e))?;
    update_payable(&state, &building_id, &payable_id, input)
        .await
        .map_err(|e| write_failed(&path, "update", &form, e))?;
    Ok(ok())
}

pub async fn payables_delete(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((id, payable_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let (building_id, _) = active_building(&state, &session_user, &id).await?;
    let payable_id = parse_object_id(&payable_id, "payable id")?;
    let path = format!("{}/{}", building_path(&building_id, "payables"), payable_id.to_hex());
    delete_payable(&state, &building_id, &payable_id)
        .await
        .map_err(|e| write_failed(&path, "delete", &(), e))?;
    Ok(ok())
}
