use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiResult, DomainError},
    models::Payment,
    session::SessionUser,
    state::{
        AppState, PaymentInput, building_path, create_payment, delete_payment,
        get_payment_by_id, list_payments, update_payment,
    },
};

use super::helpers::*;

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentForm {
    unit_id: String,
    quarter: String,
    amount: f64,
    date: String,
    #[serde(default)]
    payment_method_id: Option<String>,
    /// Receipt image as a data URL; left out of logged payloads.
    #[serde(default, skip_serializing)]
    receipt: Option<String>,
    #[serde(default)]
    notes: Option<String>,
}

impl PaymentForm {
    fn to_input(&self) -> ApiResult<PaymentInput> {
        Ok(PaymentInput {
            unit_id: parse_object_id(&self.unit_id, "unit id")?,
            quarter: self.quarter.clone(),
            amount: self.amount,
            date: parse_date(&self.date, "payment date")?,
            payment_method_id: parse_opt_object_id(
                self.payment_method_id.as_deref(),
                "payment method id",
            )?,
            receipt: self.receipt.clone(),
            notes: self.notes.clone(),
        })
    }
}

#[derive(Serialize)]
pub struct PaymentRow {
    id: String,
    unit_id: String,
    quarter: String,
    amount: f64,
    date: String,
    payment_method_id: Option<String>,
    receipt: Option<String>,
    notes: Option<String>,
}

impl From<Payment> for PaymentRow {
    fn from(p: Payment) -> Self {
        PaymentRow {
            id: hex(p.id),
            unit_id: p.unit_id.to_hex(),
            quarter: p.quarter,
            amount: p.amount,
            date: iso_date(p.date),
            payment_method_id: opt_hex(p.payment_method_id),
            receipt: p.receipt,
            notes: p.notes,
        }
    }
}

pub async fn payments_index(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<PaymentRow>>> {
    let (building_id, _) = active_building(&state, &session_user, &id).await?;
    let mut payments = list_payments(&state, &building_id).await?;
    payments.sort_by_key(|p| std::cmp::Reverse(p.date));
    Ok(Json(payments.into_iter().map(PaymentRow::from).collect()))
}

pub async fn payments_show(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((id, payment_id)): Path<(String, String)>,
) -> ApiResult<Json<PaymentRow>> {
    let (building_id, _) = active_building(&state, &session_user, &id).await?;
    let payment_id = parse_object_id(&payment_id, "payment id")?;
    let payment = get_payment_by_id(&state, &building_id, &payment_id)
        .await?
        .ok_or(DomainError::not_found("payment"))?;
    Ok(Json(PaymentRow::from(payment)))
}

pub async fn payments_create(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(form): Json<PaymentForm>,
) -> ApiResult<impl IntoResponse> {
    let (building_id, _) = active_building(&state, &session_user, &id).await?;
    let path = building_path(&building_id, "payments");
    let input = form
        .to_input()
        .map_err(|e| write_failed(&path, "create", &form, e))?;
    let payment_id = create_payment(&state, &building_id, input)
        .await
        .map_err(|e| write_failed(&path, "create", &form, e))?;
    Ok(created(payment_id))
}

pub async fn payments_update(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((id, payment_id)): Path<(String, String)>,
    Json(form): Json<PaymentForm>,
) -> ApiResult<impl IntoResponse> {
    let (building_id, _) = active_building(&state, &session_user, &id).await?;
    let payment_id = parse_object_id(&payment_id, "payment id")?;
    let path = format!("{}/{}", building_path(&building_id, "payments"), payment_id.to_hex());
    let input = form
        .to_input()
        .map_err(|e| write_failed(&path, "update", &form, e))?;
    update_payment(&state, &building_id, &payment_id, input)
        .await
        .map_err(|e| write_failed(&path, "update", &form, e))?;
    Ok(ok())
}

pub async fn payments_delete(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((id, payment_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let (building_id, _) = active_building(&state, &session_user, &id).await?;
    let payment_id = parse_object_id(&payment_id, "payment id")?;
    let path = format!("{}/{}", building_path(&building_id, "payments"), payment_id.to_hex());
    delete_payment(&state, &building_id, &payment_id)
        .await
        .map_err(|e| write_failed(&path, "delete", &(), e))?;
    Ok(ok())
}
