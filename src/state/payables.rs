use anyhow::{Context, Result};
use chrono::NaiveDate;
use mongodb::bson::{doc, oid::ObjectId};

use crate::{error::DomainError, models::Payable, receipts::validate_optional_receipt};

use super::{AppState, clean_opt, date_to_bson, find_all, now};

#[derive(Debug, Clone)]
pub struct PayableInput {
    pub category_id: ObjectId,
    pub employee_id: Option<ObjectId>,
    pub service_provider_id: Option<ObjectId>,
    pub utility_type_id: Option<ObjectId>,
    pub amount: f64,
    pub date: NaiveDate,
    pub vendor: Option<String>,
    pub receipt: Option<String>,
    pub notes: Option<String>,
}

impl PayableInput {
    fn normalized(mut self) -> Result<Self, DomainError> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(DomainError::validation("payable amount must be greater than zero"));
        }
        self.vendor = clean_opt(self.vendor);
        self.notes = clean_opt(self.notes);
        self.receipt = validate_optional_receipt(self.receipt)?;
        Ok(self)
    }
}

async fn validate_refs(state: &AppState, building_id: &ObjectId, input: &PayableInput) -> Result<()> {
    if state
        .payable_categories
        .find_one(doc! { "_id": input.category_id })
        .await?
        .is_none()
    {
        return Err(DomainError::validation("unknown payable category").into());
    }
    if let Some(id) = input.employee_id {
        if state
            .employees
            .find_one(doc! { "_id": id, "building_id": building_id })
            .await?
            .is_none()
        {
            return Err(DomainError::validation("employee does not belong to this building").into());
        }
    }
    if let Some(id) = input.service_provider_id {
        if state
            .service_providers
            .find_one(doc! { "_id": id, "building_id": building_id })
            .await?
            .is_none()
        {
            return Err(
                DomainError::validation("service provider does not belong to this building").into(),
            );
        }
    }
    if let Some(id) = input.utility_type_id {
        if state.utility_types.find_one(doc! { "_id": id }).await?.is_none() {
            return Err(DomainError::validation("unknown utility type").into());
        }
    }
    Ok(())
}

pub async fn list_payables(state: &AppState, building_id: &ObjectId) -> Result<Vec<Payable>> {
    find_all(&state.payables, doc! { "building_id": building_id }).await
}

pub async fn get_payable_by_id(
    state: &AppState,
    building_id: &ObjectId,
    id: &ObjectId,
) -> Result<Option<Payable>> {
    state
        .payables
        .find_one(doc! { "_id": id, "building_id": building_id })
        .await
        .map_err(Into::into)
}

pub async fn create_payable(
    state: &AppState,
    building_id: &ObjectId,
    input: PayableInput,
) -> Result<ObjectId> {
    let input = input.normalized()?;
    validate_refs(state, building_id, &input).await?;

    let res = state
        .payables
        .insert_one(Payable {
            id: None,
            building_id: *building_id,
            category_id: input.category_id,
            employee_id: input.employee_id,
            service_provider_id: input.service_provider_id,
            utility_type_id: input.utility_type_id,
            amount: input.amount,
            date: date_to_bson(input.date),
            vendor: input.vendor,
            receipt: input.receipt,
            notes: input.notes,
            created_at: Some(now()),
            updated_at: None,
        })
        .await?;
    res.inserted_id
        .as_object_id()
        .context("payable insert missing _id")
}

pub async fn update_payable(
    state: &AppState,
    building_id: &ObjectId,
    id: &ObjectId,
    input: PayableInput,
) -> Result<()> {
    let input = input.normalized()?;
    validate_refs(state, building_id, &input).await?;

    let res = state
        .payables
        .update_one(
            doc! { "_id": id, "building_id": building_id },
            doc! { "$set": {
                "category_id": input.category_id,
                "employee_id": input.employee_id,
                "service_provider_id": input.service_provider_id,
                "utility_type_id": input.utility_type_id,
                "amount": input.amount,
                "date": date_to_bson(input.date),
                "vendor": input.vendor.clone(),
                "receipt": input.receipt.clone(),
                "notes": input.notes.clone(),
                "updated_at": now(),
            } },
        )
        .await?;
    if res.matched_count == 0 {
        return Err(DomainError::not_found("payable").into());
    }
    Ok(())
}

pub async fn delete_payable(state: &AppState, building_id: &ObjectId, id: &ObjectId) -> Result<()> {
    let res = state
        .payables
        .delete_one(doc! { "_id": id, "building_id": building_id })
        .await?;
    if res.deleted_count == 0 {
        return Err(DomainError::not_found("payable").into());
    }
    Ok(())
}
