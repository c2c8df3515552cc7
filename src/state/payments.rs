use anyhow::{Context, Result};
use chrono::NaiveDate;
use mongodb::bson::{doc, oid::ObjectId};

use crate::{
    error::DomainError,
    models::Payment,
    periods::Quarter,
    receipts::validate_optional_receipt,
};

use super::{AppState, clean_opt, date_to_bson, find_all, now};

#[derive(Debug, Clone)]
pub struct PaymentInput {
    pub unit_id: ObjectId,
    pub quarter: String,
    pub amount: f64,
    pub date: NaiveDate,
    pub payment_method_id: Option<ObjectId>,
    pub receipt: Option<String>,
    pub notes: Option<String>,
}

impl PaymentInput {
    /// Canonicalizes the quarter label and checks amount and receipt.
    fn normalized(mut self) -> Result<Self, DomainError> {
        let quarter: Quarter = self.quarter.parse()?;
        self.quarter = quarter.label();
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(DomainError::validation("payment amount must be greater than zero"));
        }
        self.receipt = validate_optional_receipt(self.receipt)?;
        self.notes = clean_opt(self.notes);
        Ok(self)
    }
}

async fn validate_refs(state: &AppState, building_id: &ObjectId, input: &PaymentInput) -> Result<()> {
    let unit = state
        .units
        .find_one(doc! { "_id": input.unit_id, "building_id": building_id })
        .await?
        .ok_or_else(|| DomainError::validation("unit does not belong to this building"))?;
    if unit.is_child() {
        return Err(DomainError::validation(
            "payments are recorded against the parent unit, not a child unit",
        )
        .into());
    }
    if let Some(method) = input.payment_method_id {
        if state
            .payment_methods
            .find_one(doc! { "_id": method })
            .await?
            .is_none()
        {
            return Err(DomainError::validation("unknown payment method").into());
        }
    }
    Ok(())
}

pub async fn list_payments(state: &AppState, building_id: &ObjectId) -> Result<Vec<Payment>> {
    find_all(&state.payments, doc! { "building_id": building_id }).await
}

pub async fn get_payment_by_id(
    state: &AppState,
    building_id: &ObjectId,
    id: &ObjectId,
) -> Result<Option<Payment>> {
    state
        .payments
        .find_one(doc! { "_id": id, "building_id": building_id })
        .await
        .map_err(Into::into)
}

pub async fn create_payment(
    state: &AppState,
    building_id: &ObjectId,
    input: PaymentInput,
) -> Result<ObjectId> {
    let input = input.normalized()?;
    validate_refs(state, building_id, &input).await?;

    let res = state
        .payments
        .insert_one(Payment {
            id: None,
            building_id: *building_id,
            unit_id: input.unit_id,
            quarter: input.quarter,
            amount: input.amount,
            date: date_to_bson(input.date),
            payment_method_id: input.payment_method_id,
            receipt: input.receipt,
            notes: input.notes,
            created_at: Some(now()),
            updated_at: None,
        })
        .await?;
    res.inserted_id
        .as_object_id()
        .context("payment insert missing _id")
}

pub async fn update_payment(
    state: &AppState,
    building_id: &ObjectId,
    id: &ObjectId,
    input: PaymentInput,
) -> Result<()> {
    let input = input.normalized()?;
    validate_refs(state, building_id, &input).await?;

    let res = state
        .payments
        .update_one(
            doc! { "_id": id, "building_id": building_id },
            doc! { "$set": {
                "unit_id": input.unit_id,
                "quarter": input.quarter.clone(),
                "amount": input.amount,
                "date": date_to_bson(input.date),
                "payment_method_id": input.payment_method_id,
                "receipt": input.receipt.clone(),
                "notes": input.notes.clone(),
                "updated_at": now(),
            } },
        )
        .await?;
    if res.matched_count == 0 {
        return Err(DomainError::not_found("payment").into());
    }
    Ok(())
}

pub async fn delete_payment(state: &AppState, building_id: &ObjectId, id: &ObjectId) -> Result<()> {
    let res = state
        .payments
        .delete_one(doc! { "_id": id, "building_id": building_id })
        .await?;
    if res.deleted_count == 0 {
        return Err(DomainError::not_found("payment").into());
    }
    Ok(())
}
