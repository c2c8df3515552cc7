use anyhow::{Context, Result};
use mongodb::bson::{doc, oid::ObjectId};

use crate::{
    error::DomainError,
    levels::default_level_plan,
    models::{Building, Level, LevelType},
};

use super::{AppState, find_all, now};

#[derive(Debug, Clone)]
pub struct LevelInput {
    pub name: String,
    pub level_type: LevelType,
    pub floor_number: Option<i32>,
    pub local_common_area: f64,
}

impl LevelInput {
    /// Floor numbers only apply to typical floors and are required there.
    fn normalized(mut self) -> Result<Self, DomainError> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err(DomainError::validation("level name is required"));
        }
        if self.level_type.takes_floor_number() {
            if self.floor_number.is_none() {
                return Err(DomainError::validation(
                    "typical floors need a floor number",
                ));
            }
        } else {
            self.floor_number = None;
        }
        if !self.local_common_area.is_finite() || self.local_common_area < 0.0 {
            return Err(DomainError::validation("local common area must be non-negative"));
        }
        Ok(self)
    }
}

pub async fn list_levels(state: &AppState, building_id: &ObjectId) -> Result<Vec<Level>> {
    find_all(&state.levels, doc! { "building_id": building_id }).await
}

pub async fn get_level_by_id(
    state: &AppState,
    building_id: &ObjectId,
    id: &ObjectId,
) -> Result<Option<Level>> {
    state
        .levels
        .find_one(doc! { "_id": id, "building_id": building_id })
        .await
        .map_err(Into::into)
}

async fn ensure_name_free(
    state: &AppState,
    building_id: &ObjectId,
    name: &str,
    except: Option<&ObjectId>,
) -> Result<()> {
    let mut filter = doc! { "building_id": building_id, "name": name };
    if let Some(id) = except {
        filter.insert("_id", doc! { "$ne": id });
    }
    if state.levels.find_one(filter).await?.is_some() {
        return Err(DomainError::conflict(format!("level {name:?} already exists")).into());
    }
    Ok(())
}

pub async fn create_level(
    state: &AppState,
    building_id: &ObjectId,
    input: LevelInput,
) -> Result<ObjectId> {
    let input = input.normalized()?;
    ensure_name_free(state, building_id, &input.name, None).await?;

    let res = state
        .levels
        .insert_one(Level {
            id: None,
            building_id: *building_id,
            name: input.name,
            level_type: input.level_type,
            floor_number: input.floor_number,
            local_common_area: input.local_common_area,
            created_at: Some(now()),
            updated_at: None,
        })
        .await?;
    res.inserted_id
        .as_object_id()
        .context("level insert missing _id")
}

pub async fn update_level(
    state: &AppState,
    building_id: &ObjectId,
    id: &ObjectId,
    input: LevelInput,
) -> Result<()> {
    let input = input.normalized()?;
    ensure_name_free(state, building_id, &input.name, Some(id)).await?;

    let res = state
        .levels
        .update_one(
            doc! { "_id": id, "building_id": building_id },
            doc! { "$set": {
                "name": input.name.clone(),
                "level_type": input.level_type.as_str(),
                "floor_number": input.floor_number,
                "local_common_area": input.local_common_area,
                "updated_at": now(),
            } },
        )
        .await?;
    if res.matched_count == 0 {
        return Err(DomainError::not_found("level").into());
    }
    Ok(())
}

pub async fn delete_level(state: &AppState, building_id: &ObjectId, id: &ObjectId) -> Result<()> {
    let units_on_level = state
        .units
        .count_documents(doc! { "building_id": building_id, "level_id": id })
        .await?;
    if units_on_level > 0 {
        return Err(DomainError::conflict(format!(
            "level still has {units_on_level} unit(s); move or delete them first"
        ))
        .into());
    }

    let res = state
        .levels
        .delete_one(doc! { "_id": id, "building_id": building_id })
        .await?;
    if res.deleted_count == 0 {
        return Err(DomainError::not_found("level").into());
    }
    Ok(())
}

/// Creates the levels implied by the building's structure flags, skipping
/// names that already exist. Returns the ids of the new levels.
pub async fn generate_default_levels(state: &AppState, building: &Building) -> Result<Vec<ObjectId>> {
    let building_id = building.id.context("building missing _id")?;
    let existing: Vec<String> = list_levels(state, &building_id)
        .await?
        .into_iter()
        .map(|l| l.name)
        .collect();

    let mut created = Vec::new();
    for planned in default_level_plan(building) {
        if existing.iter().any(|n| n.eq_ignore_ascii_case(&planned.name)) {
            continue;
        }
        let id = create_level(
            state,
            &building_id,
            LevelInput {
                name: planned.name,
                level_type: planned.level_type,
                floor_number: planned.floor_number,
                local_common_area: 0.0,
            },
        )
        .await?;
        created.push(id);
    }
    Ok(created)
}
