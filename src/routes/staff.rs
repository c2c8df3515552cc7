// routes/staff.rs
// Employees (with salary history) and service providers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiResult, DomainError},
    models::{Employee, SalaryHistory, ServiceProvider},
    session::SessionUser,
    state::{
        AppState, EmployeeInput, SalaryChange, ServiceProviderInput, building_path,
        create_employee, create_service_provider, delete_employee, delete_service_provider,
        get_employee_by_id, get_service_provider_by_id, list_employees, list_salary_history,
        list_service_providers, record_salary_change, update_employee, update_service_provider,
    },
};

use super::helpers::*;

#[derive(Debug, Serialize, Deserialize)]
pub struct EmployeeForm {
    name: String,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    salary: f64,
    #[serde(default)]
    hire_date: Option<String>,
    #[serde(default = "default_active")]
    is_active: bool,
}

fn default_active() -> bool {
    true
}

impl EmployeeForm {
    fn to_input(&self) -> ApiResult<EmployeeInput> {
        Ok(EmployeeInput {
            name: self.name.clone(),
            role: self.role.clone(),
            phone: self.phone.clone(),
            salary: self.salary,
            hire_date: parse_opt_date(self.hire_date.as_deref(), "hire date")?,
            is_active: self.is_active,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SalaryChangeForm {
    salary: f64,
    effective_date: String,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceProviderForm {
    name: String,
    #[serde(default)]
    service_type: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    contract_amount: Option<f64>,
    #[serde(default)]
    notes: Option<String>,
}

impl From<ServiceProviderForm> for ServiceProviderInput {
    fn from(form: ServiceProviderForm) -> Self {
        ServiceProviderInput {
            name: form.name,
            service_type: form.service_type,
            phone: form.phone,
            email: form.email,
            contract_amount: form.contract_amount,
            notes: form.notes,
        }
    }
}

#[derive(Serialize)]
pub struct EmployeeRow {
    id: String,
    name: String,
    role: Option<String>,
    phone: Option<String>,
    salary: f64,
    hire_date: Option<String>,
    is_active: bool,
}

impl From<Employee> for EmployeeRow {
    fn from(e: Employee) -> Self {
        EmployeeRow {
            id: hex(e.id),
            name: e.name,
            role: e.role,
            phone: e.phone,
            salary: e.salary,
            hire_date: e.hire_date.map(iso_date),
            is_active: e.is_active,
        }
    }
}

#[derive(Serialize)]
pub struct SalaryHistoryRow {
    id: String,
    employee_id: String,
    previous_salary: Option<f64>,
    salary: f64,
    effective_date: String,
    notes: Option<String>,
}

impl From<SalaryHistory> for SalaryHistoryRow {
    fn from(h: SalaryHistory) -> Self {
        SalaryHistoryRow {
            id: hex(h.id),
            employee_id: h.employee_id.to_hex(),
            previous_salary: h.previous_salary,
            salary: h.salary,
            effective_date: iso_date(h.effective_date),
            notes: h.notes,
        }
    }
}

#[derive(Serialize)]
pub struct ServiceProviderRow {
    id: String,
    name: String,
    service_type: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    contract_amount: Option<f64>,
    notes: Option<String>,
}

impl From<ServiceProvider> for ServiceProviderRow {
    fn from(p: ServiceProvider) -> Self {
        ServiceProviderRow {
            id: hex(p.id),
            name: p.name,
            service_type: p.service_type,
            phone: p.phone,
            email: p.email,
            contract_amount: p.contract_amount,
            notes: p.notes,
        }
    }
}

fn employee_path(building_id: &ObjectId, employee: &str) -> String {
    format!("{}/{}", building_path(building_id, "employees"), employee)
}

pub async fn employees_index(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<EmployeeRow>>> {
    let (building_id, _) = active_building(&state, &session_user, &id).await?;
    let employees = list_employees(&state, &building_id).await?;
    Ok(Json(employees.into_iter().map(EmployeeRow::from).collect()))
}

pub async fn employees_show(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((id, employee_id)): Path<(String, String)>,
) -> ApiResult<Json<EmployeeRow>> {
    let (building_id, _) = active_building(&state, &session_user, &id).await?;
    let employee_id = parse_object_id(&employee_id, "employee id")?;
    let employee = get_employee_by_id(&state, &building_id, &employee_id)
        .await?
        .ok_or(DomainError::not_found("employee"))?;
    Ok(Json(EmployeeRow::from(employee)))
}

pub async fn employees_create(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(form): Json<EmployeeForm>,
) -> ApiResult<impl IntoResponse> {
    let (building_id, _) = active_building(&state, &session_user, &id).await?;
    let path = building_path(&building_id, "employees");
    let input = form
        .to_input()
        .map_err(|e| write_failed(&path, "create", &form, e))?;
    let employee_id = create_employee(&state, &building_id, input)
        .await
        .map_err(|e| write_failed(&path, "create", &form, e))?;
    Ok(created(employee_id))
}

pub async fn employees_update(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((id, employee_id)): Path<(String, String)>,
    Json(form): Json<EmployeeForm>,
) -> ApiResult<impl IntoResponse> {
    let (building_id, _) = active_building(&state, &session_user, &id).await?;
    let employee_id = parse_object_id(&employee_id, "employee id")?;
    let path = employee_path(&building_id, &employee_id.to_hex());
    let input = form
        .to_input()
        .map_err(|e| write_failed(&path, "update", &form, e))?;
    update_employee(&state, &building_id, &employee_id, input)
        .await
        .map_err(|e| write_failed(&path, "update", &form, e))?;
    Ok(ok())
}

pub async fn employees_delete(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((id, employee_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let (building_id, _) = active_building(&state, &session_user, &id).await?;
    let employee_id = parse_object_id(&employee_id, "employee id")?;
    let path = employee_path(&building_id, &employee_id.to_hex());
    delete_employee(&state, &building_id, &employee_id)
        .await
        .map_err(|e| write_failed(&path, "delete", &(), e))?;
    Ok(ok())
}

pub async fn salary_history_index(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((id, employee_id)): Path<(String, String)>,
) -> ApiResult<Json<Vec<SalaryHistoryRow>>> {
    let (building_id, _) = active_building(&state, &session_user, &id).await?;
    let employee_id = parse_object_id(&employee_id, "employee id")?;
    if get_employee_by_id(&state, &building_id, &employee_id)
        .await?
        .is_none()
    {
        return Err(DomainError::not_found("employee").into());
    }
    let history = list_salary_history(&state, &building_id, &employee_id).await?;
    Ok(Json(history.into_iter().map(SalaryHistoryRow::from).collect()))
}

/// Appends to the history; entries are never edited or removed one by one.
pub async fn salary_history_create(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((id, employee_id)): Path<(String, String)>,
    Json(form): Json<SalaryChangeForm>,
) -> ApiResult<impl IntoResponse> {
    let (building_id, _) = active_building(&state, &session_user, &id).await?;
    let employee_id = parse_object_id(&employee_id, "employee id")?;
    let path = format!("{}/salary_history", employee_path(&building_id, &employee_id.to_hex()));
    let effective_date = parse_date(&form.effective_date, "effective date")
        .map_err(|e| write_failed(&path, "create", &form, e))?;
    let entry = record_salary_change(
        &state,
        &building_id,
        &employee_id,
        SalaryChange {
            salary: form.salary,
            effective_date,
            notes: form.notes.clone(),
        },
    )
    .await
    .map_err(|e| write_failed(&path, "create", &form, e))?;
    Ok(created(entry))
}

pub async fn service_providers_index(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<ServiceProviderRow>>> {
    let (building_id, _) = active_building(&state, &session_user, &id).await?;
    let providers = list_service_providers(&state, &building_id).await?;
    Ok(Json(providers.into_iter().map(ServiceProviderRow::from).collect()))
}

pub async fn service_providers_show(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((id, provider_id)): Path<(String, String)>,
) -> ApiResult<Json<ServiceProviderRow>> {
    let (building_id, _) = active_building(&state, &session_user, &id).await?;
    let provider_id = parse_object_id(&provider_id, "service provider id")?;
    let provider = get_service_provider_by_id(&state, &building_id, &provider_id)
        .await?
        .ok_or(DomainError::not_found("service provider"))?;
    Ok(Json(ServiceProviderRow::from(provider)))
}

pub async fn service_providers_create(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(form): Json<ServiceProviderForm>,
) -> ApiResult<impl IntoResponse> {
    let (building_id, _) = active_building(&state, &session_user, &id).await?;
    let path = building_path(&building_id, "service_providers");
    let provider_id = create_service_provider(&state, &building_id, form.clone().into())
        .await
        .map_err(|e| write_failed(&path, "create", &form, e))?;
    Ok(created(provider_id))
}

pub async fn service_providers_update(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((id, provider_id)): Path<(String, String)>,
    Json(form): Json<ServiceProviderForm>,
) -> ApiResult<impl IntoResponse> {
    let (building_id, _) = active_building(&state, &session_user, &id).await?;
    let provider_id = parse_object_id(&provider_id, "service provider id")?;
    let path = format!(
        "{}/{}",
        building_path(&building_id, "service_providers"),
        provider_id.to_hex()
    );
    update_service_provider(&state, &building_id, &provider_id, form.clone().into())
        .await
        .map_err(|e| write_failed(&path, "update", &form, e))?;
    Ok(ok())
}

pub async fn service_providers_delete(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((id, provider_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let (building_id, _) = active_building(&state, &session_user, &id).await?;
    let provider_id = parse_object_id(&provider_id, "service provider id")?;
    let path = format!(
        "{}/{}",
        building_path(&building_id, "service_providers"),
        provider_id.to_hex()
    );
    delete_service_provider(&state, &building_id, &provider_id)
        .await
        .map_err(|e| write_failed(&path, "delete", &(), e))?;
    Ok(ok())
}
