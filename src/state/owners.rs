use anyhow::{Context, Result};
use mongodb::bson::{doc, oid::ObjectId};

use crate::{error::DomainError, models::Owner};

use super::{AppState, clean_opt, find_all, now};

#[derive(Debug, Clone)]
pub struct OwnerInput {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub national_id: Option<String>,
    pub notes: Option<String>,
}

impl OwnerInput {
    fn normalized(self) -> Result<Self, DomainError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("owner name is required"));
        }
        let email = clean_opt(self.email).map(|e| e.to_lowercase());
        if let Some(email) = &email {
            if !email.contains('@') {
                return Err(DomainError::validation("owner email is not valid"));
            }
        }
        Ok(OwnerInput {
            name,
            email,
            phone: clean_opt(self.phone),
            national_id: clean_opt(self.national_id),
            notes: clean_opt(self.notes),
        })
    }
}

pub async fn list_owners(state: &AppState, building_id: &ObjectId) -> Result<Vec<Owner>> {
    find_all(&state.owners, doc! { "building_id": building_id }).await
}

pub async fn get_owner_by_id(
    state: &AppState,
    building_id: &ObjectId,
    id: &ObjectId,
) -> Result<Option<Owner>> {
    state
        .owners
        .find_one(doc! { "_id": id, "building_id": building_id })
        .await
        .map_err(Into::into)
}

pub async fn create_owner(
    state: &AppState,
    building_id: &ObjectId,
    input: OwnerInput,
) -> Result<ObjectId> {
    let input = input.normalized()?;
    let res = state
        .owners
        .insert_one(Owner {
            id: None,
            building_id: *building_id,
            name: input.name,
            email: input.email,
            phone: input.phone,
            national_id: input.national_id,
            notes: input.notes,
            created_at: Some(now()),
            updated_at: None,
        })
        .await?;
    res.inserted_id
        .as_object_id()
        .context("owner insert missing _id")
}

pub async fn update_owner(
    state: &AppState,
    building_id: &ObjectId,
    id: &ObjectId,
    input: OwnerInput,
) -> Result<()> {
    let input = input.normalized()?;
    let res = state
        .owners
        .update_one(
            doc! { "_id": id, "building_id": building_id },
            doc! { "$set": {
                "name": input.name.clone(),
                "email": input.email.clone(),
                "phone": input.phone.clone(),
                "national_id": input.national_id.clone(),
                "notes": input.notes.clone(),
                "updated_at": now(),
            } },
        )
        .await?;
    if res.matched_count == 0 {
        return Err(DomainError::not_found("owner").into());
    }
    Ok(())
}

pub async fn delete_owner(state: &AppState, building_id: &ObjectId, id: &ObjectId) -> Result<()> {
    let owned = state
        .units
        .count_documents(doc! { "building_id": building_id, "owner_id": id })
        .await?;
    if owned > 0 {
        return Err(DomainError::conflict(format!(
            "owner still holds {owned} unit(s); reassign them first"
        ))
        .into());
    }

    let res = state
        .owners
        .delete_one(doc! { "_id": id, "building_id": building_id })
        .await?;
    if res.deleted_count == 0 {
        return Err(DomainError::not_found("owner").into());
    }
    Ok(())
}
