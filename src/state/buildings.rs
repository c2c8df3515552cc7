use anyhow::{Context, Result};
use chrono::NaiveDate;
use mongodb::bson::{doc, oid::ObjectId};
use tracing::info;

use crate::{error::DomainError, models::Building};

use super::{AppState, clean_opt, date_to_bson, find_all, now};

/// Upper bound for basement, mezzanine and typical floor counts.
pub const MAX_LEVEL_COUNT: u32 = 200;

/// Editable building fields.
#[derive(Debug, Clone)]
pub struct BuildingInput {
    pub name: String,
    pub address: Option<String>,
    pub has_basement: bool,
    pub basement_count: u32,
    pub has_mezzanine: bool,
    pub mezzanine_count: u32,
    pub has_penthouse: bool,
    pub has_rooftop: bool,
    pub typical_floor_count: u32,
    pub financial_start_date: NaiveDate,
    pub enabled_unit_type_ids: Vec<ObjectId>,
    pub annual_budget: Option<f64>,
    pub global_common_area: f64,
}

impl BuildingInput {
    fn normalized(mut self) -> Result<Self, DomainError> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err(DomainError::validation("building name is required"));
        }
        self.address = clean_opt(self.address);
        if !self.has_basement {
            self.basement_count = 0;
        } else if self.basement_count == 0 {
            self.basement_count = 1;
        }
        if !self.has_mezzanine {
            self.mezzanine_count = 0;
        } else if self.mezzanine_count == 0 {
            self.mezzanine_count = 1;
        }
        for (count, what) in [
            (self.basement_count, "basement count"),
            (self.mezzanine_count, "mezzanine count"),
            (self.typical_floor_count, "typical floor count"),
        ] {
            if count > MAX_LEVEL_COUNT {
                return Err(DomainError::validation(format!(
                    "{what} must be at most {MAX_LEVEL_COUNT}"
                )));
            }
        }
        if let Some(budget) = self.annual_budget {
            if !budget.is_finite() || budget < 0.0 {
                return Err(DomainError::validation("annual budget must be non-negative"));
            }
        }
        if !self.global_common_area.is_finite() || self.global_common_area < 0.0 {
            return Err(DomainError::validation("global common area must be non-negative"));
        }
        let mut seen = Vec::new();
        self.enabled_unit_type_ids.retain(|id| {
            if seen.contains(id) {
                false
            } else {
                seen.push(*id);
                true
            }
        });
        Ok(self)
    }
}

/// Buildings of `owner_uid` that are not in the recycle bin.
pub async fn list_active_buildings(state: &AppState, owner_uid: &ObjectId) -> Result<Vec<Building>> {
    find_all(
        &state.buildings,
        doc! { "owner_uid": owner_uid, "is_deleted": { "$ne": true } },
    )
    .await
}

pub async fn list_deleted_buildings(
    state: &AppState,
    owner_uid: &ObjectId,
) -> Result<Vec<Building>> {
    find_all(
        &state.buildings,
        doc! { "owner_uid": owner_uid, "is_deleted": true },
    )
    .await
}

pub async fn get_building_by_id(state: &AppState, id: &ObjectId) -> Result<Option<Building>> {
    state
        .buildings
        .find_one(doc! { "_id": id })
        .await
        .map_err(Into::into)
}

async fn ensure_unit_types_exist(state: &AppState, ids: &[ObjectId]) -> Result<()> {
    for id in ids {
        if state.unit_types.find_one(doc! { "_id": id }).await?.is_none() {
            return Err(DomainError::validation(format!("unknown unit type {id}")).into());
        }
    }
    Ok(())
}

pub async fn create_building(
    state: &AppState,
    owner_uid: &ObjectId,
    input: BuildingInput,
) -> Result<ObjectId> {
    let input = input.normalized()?;
    ensure_unit_types_exist(state, &input.enabled_unit_type_ids).await?;

    let res = state
        .buildings
        .insert_one(Building {
            id: None,
            name: input.name,
            address: input.address,
            has_basement: input.has_basement,
            basement_count: input.basement_count,
            has_mezzanine: input.has_mezzanine,
            mezzanine_count: input.mezzanine_count,
            has_penthouse: input.has_penthouse,
            has_rooftop: input.has_rooftop,
            typical_floor_count: input.typical_floor_count,
            financial_start_date: date_to_bson(input.financial_start_date),
            enabled_unit_type_ids: input.enabled_unit_type_ids,
            owner_uid: *owner_uid,
            annual_budget: input.annual_budget,
            global_common_area: input.global_common_area,
            is_deleted: false,
            deleted_at: None,
            created_at: Some(now()),
            updated_at: None,
        })
        .await?;
    res.inserted_id
        .as_object_id()
        .context("building insert missing _id")
}

pub async fn update_building(state: &AppState, id: &ObjectId, input: BuildingInput) -> Result<()> {
    let input = input.normalized()?;
    let existing = get_building_by_id(state, id)
        .await?
        .ok_or(DomainError::not_found("building"))?;
    ensure_unit_types_exist(state, &input.enabled_unit_type_ids).await?;

    // Unit types can only be disabled once no unit uses them.
    let removed: Vec<ObjectId> = existing
        .enabled_unit_type_ids
        .iter()
        .filter(|t| !input.enabled_unit_type_ids.contains(t))
        .copied()
        .collect();
    if !removed.is_empty() {
        let in_use = state
            .units
            .count_documents(doc! { "building_id": id, "unit_type_id": { "$in": removed.clone() } })
            .await?;
        if in_use > 0 {
            return Err(DomainError::conflict(
                "cannot disable a unit type while units of that type exist",
            )
            .into());
        }
    }

    state
        .buildings
        .update_one(
            doc! { "_id": id },
            doc! { "$set": {
                "name": input.name.clone(),
                "address": input.address.clone(),
                "has_basement": input.has_basement,
                "basement_count": input.basement_count,
                "has_mezzanine": input.has_mezzanine,
                "mezzanine_count": input.mezzanine_count,
                "has_penthouse": input.has_penthouse,
                "has_rooftop": input.has_rooftop,
                "typical_floor_count": input.typical_floor_count,
                "financial_start_date": date_to_bson(input.financial_start_date),
                "enabled_unit_type_ids": input.enabled_unit_type_ids.clone(),
                "annual_budget": input.annual_budget,
                "global_common_area": input.global_common_area,
                "updated_at": now(),
            } },
        )
        .await?;
    Ok(())
}

/// Moves the building to the recycle bin.
pub async fn soft_delete_building(state: &AppState, id: &ObjectId) -> Result<()> {
    let res = state
        .buildings
        .update_one(
            doc! { "_id": id },
            doc! { "$set": { "is_deleted": true, "deleted_at": now(), "updated_at": now() } },
        )
        .await?;
    if res.matched_count == 0 {
        return Err(DomainError::not_found("building").into());
    }
    info!(building_id = %id, "building moved to recycle bin");
    Ok(())
}

pub async fn restore_building(state: &AppState, id: &ObjectId) -> Result<()> {
    let res = state
        .buildings
        .update_one(
            doc! { "_id": id, "is_deleted": true },
            doc! { "$set": { "is_deleted": false, "deleted_at": null, "updated_at": now() } },
        )
        .await?;
    if res.matched_count == 0 {
        return Err(DomainError::conflict("building is not in the recycle bin").into());
    }
    info!(building_id = %id, "building restored");
    Ok(())
}

/// Permanently removes a binned building and every record that belongs to it.
pub async fn purge_building(state: &AppState, id: &ObjectId) -> Result<()> {
    let building = get_building_by_id(state, id)
        .await?
        .ok_or(DomainError::not_found("building"))?;
    if !building.is_deleted {
        return Err(DomainError::conflict(
            "only buildings in the recycle bin can be deleted permanently",
        )
        .into());
    }

    let scope = doc! { "building_id": id };
    state.salary_history.delete_many(scope.clone()).await?;
    state.employees.delete_many(scope.clone()).await?;
    state.service_providers.delete_many(scope.clone()).await?;
    state.payables.delete_many(scope.clone()).await?;
    state.payments.delete_many(scope.clone()).await?;
    state.units.delete_many(scope.clone()).await?;
    state.levels.delete_many(scope.clone()).await?;
    state.owners.delete_many(scope).await?;
    state.buildings.delete_one(doc! { "_id": id }).await?;
    info!(building_id = %id, "building purged");
    Ok(())
}
