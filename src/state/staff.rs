// Employees, their salary history and service providers.

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use mongodb::bson::{doc, oid::ObjectId};
use tracing::info;

use crate::{
    error::DomainError,
    models::{Employee, SalaryHistory, ServiceProvider},
};

use super::{AppState, clean_opt, date_to_bson, find_all, now};

#[derive(Debug, Clone)]
pub struct EmployeeInput {
    pub name: String,
    pub role: Option<String>,
    pub phone: Option<String>,
    pub salary: f64,
    pub hire_date: Option<NaiveDate>,
    pub is_active: bool,
}

impl EmployeeInput {
    fn normalized(mut self) -> Result<Self, DomainError> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err(DomainError::validation("employee name is required"));
        }
        check_salary(self.salary)?;
        self.role = clean_opt(self.role);
        self.phone = clean_opt(self.phone);
        Ok(self)
    }
}

#[derive(Debug, Clone)]
pub struct SalaryChange {
    pub salary: f64,
    pub effective_date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ServiceProviderInput {
    pub name: String,
    pub service_type: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub contract_amount: Option<f64>,
    pub notes: Option<String>,
}

impl ServiceProviderInput {
    fn normalized(self) -> Result<Self, DomainError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("service provider name is required"));
        }
        if let Some(amount) = self.contract_amount {
            if !amount.is_finite() || amount < 0.0 {
                return Err(DomainError::validation("contract amount must be non-negative"));
            }
        }
        Ok(ServiceProviderInput {
            name,
            service_type: clean_opt(self.service_type),
            phone: clean_opt(self.phone),
            email: clean_opt(self.email).map(|e| e.to_lowercase()),
            contract_amount: self.contract_amount,
            notes: clean_opt(self.notes),
        })
    }
}

fn check_salary(salary: f64) -> Result<(), DomainError> {
    if !salary.is_finite() || salary < 0.0 {
        return Err(DomainError::validation("salary must be non-negative"));
    }
    Ok(())
}

pub async fn list_employees(state: &AppState, building_id: &ObjectId) -> Result<Vec<Employee>> {
    find_all(&state.employees, doc! { "building_id": building_id }).await
}

pub async fn get_employee_by_id(
    state: &AppState,
    building_id: &ObjectId,
    id: &ObjectId,
) -> Result<Option<Employee>> {
    state
        .employees
        .find_one(doc! { "_id": id, "building_id": building_id })
        .await
        .map_err(Into::into)
}

async fn append_salary_history(
    state: &AppState,
    building_id: &ObjectId,
    employee_id: &ObjectId,
    previous_salary: Option<f64>,
    change: SalaryChange,
) -> Result<ObjectId> {
    let res = state
        .salary_history
        .insert_one(SalaryHistory {
            id: None,
            building_id: *building_id,
            employee_id: *employee_id,
            previous_salary,
            salary: change.salary,
            effective_date: date_to_bson(change.effective_date),
            notes: clean_opt(change.notes),
            created_at: Some(now()),
        })
        .await?;
    res.inserted_id
        .as_object_id()
        .context("salary history insert missing _id")
}

/// Creates the employee and records the starting salary.
pub async fn create_employee(
    state: &AppState,
    building_id: &ObjectId,
    input: EmployeeInput,
) -> Result<ObjectId> {
    let input = input.normalized()?;
    let res = state
        .employees
        .insert_one(Employee {
            id: None,
            building_id: *building_id,
            name: input.name,
            role: input.role,
            phone: input.phone,
            salary: input.salary,
            hire_date: input.hire_date.map(date_to_bson),
            is_active: input.is_active,
            created_at: Some(now()),
            updated_at: None,
        })
        .await?;
    let id = res
        .inserted_id
        .as_object_id()
        .context("employee insert missing _id")?;

    append_salary_history(
        state,
        building_id,
        &id,
        None,
        SalaryChange {
            salary: input.salary,
            effective_date: input.hire_date.unwrap_or_else(|| Utc::now().date_naive()),
            notes: Some("starting salary".into()),
        },
    )
    .await?;
    Ok(id)
}

/// Updates the employee; a changed salary is appended to the history
/// effective today.
pub async fn update_employee(
    state: &AppState,
    building_id: &ObjectId,
    id: &ObjectId,
    input: EmployeeInput,
) -> Result<()> {
    let input = input.normalized()?;
    let existing = get_employee_by_id(state, building_id, id)
        .await?
        .ok_or(DomainError::not_found("employee"))?;

    state
        .employees
        .update_one(
            doc! { "_id": id, "building_id": building_id },
            doc! { "$set": {
                "name": input.name.clone(),
                "role": input.role.clone(),
                "phone": input.phone.clone(),
                "salary": input.salary,
                "hire_date": input.hire_date.map(date_to_bson),
                "is_active": input.is_active,
                "updated_at": now(),
            } },
        )
        .await?;

    if existing.salary != input.salary {
        append_salary_history(
            state,
            building_id,
            id,
            Some(existing.salary),
            SalaryChange {
                salary: input.salary,
                effective_date: Utc::now().date_naive(),
                notes: None,
            },
        )
        .await?;
    }
    Ok(())
}

/// Appends a salary change and makes it the employee's current salary.
pub async fn record_salary_change(
    state: &AppState,
    building_id: &ObjectId,
    employee_id: &ObjectId,
    change: SalaryChange,
) -> Result<ObjectId> {
    check_salary(change.salary)?;
    let employee = get_employee_by_id(state, building_id, employee_id)
        .await?
        .ok_or(DomainError::not_found("employee"))?;

    let previous = employee.salary;
    let salary = change.salary;
    let entry = append_salary_history(state, building_id, employee_id, Some(previous), change).await?;
    state
        .employees
        .update_one(
            doc! { "_id": employee_id, "building_id": building_id },
            doc! { "$set": { "salary": salary, "updated_at": now() } },
        )
        .await?;
    info!(employee_id = %employee_id, previous, salary, "salary change recorded");
    Ok(entry)
}

/// History entries, oldest effective date first.
pub async fn list_salary_history(
    state: &AppState,
    building_id: &ObjectId,
    employee_id: &ObjectId,
) -> Result<Vec<SalaryHistory>> {
    let mut entries = find_all(
        &state.salary_history,
        doc! { "building_id": building_id, "employee_id": employee_id },
    )
    .await?;
    entries.sort_by_key(|e| (e.effective_date, e.created_at));
    Ok(entries)
}

pub async fn delete_employee(state: &AppState, building_id: &ObjectId, id: &ObjectId) -> Result<()> {
    let linked = state
        .payables
        .count_documents(doc! { "building_id": building_id, "employee_id": id })
        .await?;
    if linked > 0 {
        return Err(DomainError::conflict("employee is referenced by payables").into());
    }

    let res = state
        .employees
        .delete_one(doc! { "_id": id, "building_id": building_id })
        .await?;
    if res.deleted_count == 0 {
        return Err(DomainError::not_found("employee").into());
    }
    state
        .salary_history
        .delete_many(doc! { "building_id": building_id, "employee_id": id })
        .await?;
    Ok(())
}

pub async fn list_service_providers(
    state: &AppState,
    building_id: &ObjectId,
) -> Result<Vec<ServiceProvider>> {
    find_all(&state.service_providers, doc! { "building_id": building_id }).await
}

pub async fn get_service_provider_by_id(
    state: &AppState,
    building_id: &ObjectId,
    id: &ObjectId,
) -> Result<Option<ServiceProvider>> {
    state
        .service_providers
        .find_one(doc! { "_id": id, "building_id": building_id })
        .await
        .map_err(Into::into)
}

pub async fn create_service_provider(
    state: &AppState,
    building_id: &ObjectId,
    input: ServiceProviderInput,
) -> Result<ObjectId> {
    let input = input.normalized()?;
    let res = state
        .service_providers
        .insert_one(ServiceProvider {
            id: None,
            building_id: *building_id,
            name: input.name,
            service_type: input.service_type,
            phone: input.phone,
            email: input.email,
            contract_amount: input.contract_amount,
            notes: input.notes,
            created_at: Some(now()),
            updated_at: None,
        })
        .await?;
    res.inserted_id
        .as_object_id()
        .context("service provider insert missing _id")
}

pub async fn update_service_provider(
    state: &AppState,
    building_id: &ObjectId,
    id: &ObjectId,
    input: ServiceProviderInput,
) -> Result<()> {
    let input = input.normalized()?;
    let res = state
        .service_providers
        .update_one(
            doc! { "_id": id, "building_id": building_id },
            doc! { "$set": {
                "name": input.name.clone(),
                "service_type": input.service_type.clone(),
                "phone": input.phone.clone(),
                "email": input.email.clone(),
                "contract_amount": input.contract_amount,
                "notes": input.notes.clone(),
                "updated_at": now(),
            } },
        )
        .await?;
    if res.matched_count == 0 {
        return Err(DomainError::not_found("service provider").into());
    }
    Ok(())
}

pub async fn delete_service_provider(
    state: &AppState,
    building_id: &ObjectId,
    id: &ObjectId,
) -> Result<()> {
    let linked = state
        .payables
        .count_documents(doc! { "building_id": building_id, "service_provider_id": id })
        .await?;
    if linked > 0 {
        return Err(DomainError::conflict("service provider is referenced by payables").into());
    }

    let res = state
        .service_providers
        .delete_one(doc! { "_id": id, "building_id": building_id })
        .await?;
    if res.deleted_count == 0 {
        return Err(DomainError::not_found("service provider").into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn employee_needs_name_and_valid_salary() {
        let base = EmployeeInput {
            name: " Luis ".into(),
            role: Some("Conserje".into()),
            phone: None,
            salary: 850.0,
            hire_date: None,
            is_active: true,
        };
        assert_eq!(base.clone().normalized().unwrap().name, "Luis");
        assert!(EmployeeInput { name: "".into(), ..base.clone() }.normalized().is_err());
        assert!(EmployeeInput { salary: f64::NAN, ..base }.normalized().is_err());
    }

    #[test]
    fn provider_email_lowercased() {
        let n = ServiceProviderInput {
            name: "Elevadores SA".into(),
            service_type: Some("elevators".into()),
            phone: None,
            email: Some(" Soporte@Elevadores.com ".into()),
            contract_amount: Some(1200.0),
            notes: None,
        }
        .normalized()
        .unwrap();
        assert_eq!(n.email.as_deref(), Some("soporte@elevadores.com"));
    }
}
