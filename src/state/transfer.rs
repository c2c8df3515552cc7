// JSON export/import of a building's structure: info, owners, levels and
// units. Cross references travel as names so a document can be re-imported
// into a fresh set of ids.

use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use mongodb::bson::{doc, oid::ObjectId};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    error::DomainError,
    models::{Building, LevelType},
};

use super::{
    AppState, BuildingInput, LevelInput, OwnerInput, UnitInput, attach_child, bson_to_date,
    create_building, create_level, create_owner, create_unit, find_all, get_building_by_id,
    purge_building, soft_delete_building,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuildingInfo {
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub has_basement: bool,
    #[serde(default)]
    pub basement_count: u32,
    #[serde(default)]
    pub has_mezzanine: bool,
    #[serde(default)]
    pub mezzanine_count: u32,
    #[serde(default)]
    pub has_penthouse: bool,
    #[serde(default)]
    pub has_rooftop: bool,
    #[serde(default)]
    pub typical_floor_count: u32,
    pub financial_start_date: NaiveDate,
    /// Unit type names.
    #[serde(default)]
    pub enabled_unit_types: Vec<String>,
    #[serde(default)]
    pub annual_budget: Option<f64>,
    #[serde(default)]
    pub global_common_area: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OwnerRecord {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub national_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LevelRecord {
    pub name: String,
    pub level_type: LevelType,
    #[serde(default)]
    pub floor_number: Option<i32>,
    #[serde(default)]
    pub local_common_area: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnitRecord {
    pub unit_number: String,
    pub level: String,
    pub unit_type: String,
    #[serde(default)]
    pub owner: Option<String>,
    pub size: f64,
    #[serde(default)]
    pub quarterly_maintenance_fee: Option<f64>,
    /// Unit number of the parent unit.
    #[serde(default)]
    pub parent_unit: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuildingExport {
    pub building_info: BuildingInfo,
    #[serde(default)]
    pub owners: Vec<OwnerRecord>,
    #[serde(default)]
    pub levels: Vec<LevelRecord>,
    #[serde(default)]
    pub units: Vec<UnitRecord>,
}

fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

fn lookup(names: &HashMap<String, ObjectId>, name: &str, what: &str) -> Result<ObjectId, DomainError> {
    names
        .get(&name_key(name))
        .copied()
        .ok_or_else(|| DomainError::validation(format!("unknown {what} {name:?}")))
}

pub async fn export_building(state: &AppState, building: &Building) -> Result<BuildingExport> {
    let building_id = building.id.context("building missing _id")?;

    let type_names: HashMap<ObjectId, String> = find_all(&state.unit_types, doc! {})
        .await?
        .into_iter()
        .filter_map(|t| t.id.map(|id| (id, t.name)))
        .collect();
    let owners = find_all(&state.owners, doc! { "building_id": building_id }).await?;
    let levels = find_all(&state.levels, doc! { "building_id": building_id }).await?;
    let units = find_all(&state.units, doc! { "building_id": building_id }).await?;

    let owner_names: HashMap<ObjectId, String> = owners
        .iter()
        .filter_map(|o| o.id.map(|id| (id, o.name.clone())))
        .collect();
    let level_names: HashMap<ObjectId, String> = levels
        .iter()
        .filter_map(|l| l.id.map(|id| (id, l.name.clone())))
        .collect();
    let unit_numbers: HashMap<ObjectId, String> = units
        .iter()
        .filter_map(|u| u.id.map(|id| (id, u.unit_number.clone())))
        .collect();

    let mut unit_records = Vec::with_capacity(units.len());
    for unit in &units {
        unit_records.push(UnitRecord {
            unit_number: unit.unit_number.clone(),
            level: level_names
                .get(&unit.level_id)
                .cloned()
                .with_context(|| format!("unit {} points at a missing level", unit.unit_number))?,
            unit_type: type_names
                .get(&unit.unit_type_id)
                .cloned()
                .with_context(|| format!("unit {} points at a missing unit type", unit.unit_number))?,
            owner: unit.owner_id.and_then(|id| owner_names.get(&id).cloned()),
            size: unit.size,
            quarterly_maintenance_fee: unit.quarterly_maintenance_fee,
            parent_unit: unit.parent_unit_id.and_then(|id| unit_numbers.get(&id).cloned()),
        });
    }

    Ok(BuildingExport {
        building_info: BuildingInfo {
            name: building.name.clone(),
            address: building.address.clone(),
            has_basement: building.has_basement,
            basement_count: building.basement_count,
            has_mezzanine: building.has_mezzanine,
            mezzanine_count: building.mezzanine_count,
            has_penthouse: building.has_penthouse,
            has_rooftop: building.has_rooftop,
            typical_floor_count: building.typical_floor_count,
            financial_start_date: bson_to_date(building.financial_start_date),
            enabled_unit_types: building
                .enabled_unit_type_ids
                .iter()
                .filter_map(|id| type_names.get(id).cloned())
                .collect(),
            annual_budget: building.annual_budget,
            global_common_area: building.global_common_area,
        },
        owners: owners
            .into_iter()
            .map(|o| OwnerRecord {
                name: o.name,
                email: o.email,
                phone: o.phone,
                national_id: o.national_id,
                notes: o.notes,
            })
            .collect(),
        levels: levels
            .into_iter()
            .map(|l| LevelRecord {
                name: l.name,
                level_type: l.level_type,
                floor_number: l.floor_number,
                local_common_area: l.local_common_area,
            })
            .collect(),
        units: unit_records,
    })
}

/// Checks every name reference in the document before anything is written.
pub fn check_export_references(
    export: &BuildingExport,
    unit_type_names: &HashSet<String>,
) -> Result<(), DomainError> {
    let mut owners = HashSet::new();
    for owner in &export.owners {
        if !owners.insert(name_key(&owner.name)) {
            return Err(DomainError::validation(format!("duplicate owner {:?}", owner.name)));
        }
    }
    let mut levels = HashSet::new();
    for level in &export.levels {
        if !levels.insert(name_key(&level.name)) {
            return Err(DomainError::validation(format!("duplicate level {:?}", level.name)));
        }
    }
    let mut numbers = HashSet::new();
    for unit in &export.units {
        if !numbers.insert(name_key(&unit.unit_number)) {
            return Err(DomainError::validation(format!(
                "duplicate unit number {:?}",
                unit.unit_number
            )));
        }
    }

    for name in &export.building_info.enabled_unit_types {
        if !unit_type_names.contains(&name_key(name)) {
            return Err(DomainError::validation(format!("unknown unit type {name:?}")));
        }
    }
    for unit in &export.units {
        if !levels.contains(&name_key(&unit.level)) {
            return Err(DomainError::validation(format!("unknown level {:?}", unit.level)));
        }
        if !unit_type_names.contains(&name_key(&unit.unit_type)) {
            return Err(DomainError::validation(format!(
                "unknown unit type {:?}",
                unit.unit_type
            )));
        }
        if let Some(owner) = &unit.owner {
            if !owners.contains(&name_key(owner)) {
                return Err(DomainError::validation(format!("unknown owner {owner:?}")));
            }
        }
        if let Some(parent) = &unit.parent_unit {
            if !numbers.contains(&name_key(parent)) {
                return Err(DomainError::validation(format!("unknown parent unit {parent:?}")));
            }
        }
    }
    Ok(())
}

/// Creates a new building for `owner_uid` from an exported document and
/// returns its id. A failed import leaves nothing behind.
pub async fn import_building(
    state: &AppState,
    owner_uid: &ObjectId,
    export: BuildingExport,
) -> Result<ObjectId> {
    let unit_types: HashMap<String, ObjectId> = find_all(&state.unit_types, doc! {})
        .await?
        .into_iter()
        .filter_map(|t| t.id.map(|id| (name_key(&t.name), id)))
        .collect();
    let type_names: HashSet<String> = unit_types.keys().cloned().collect();
    check_export_references(&export, &type_names)?;

    let meta = &export.building_info;
    let enabled = meta
        .enabled_unit_types
        .iter()
        .map(|name| lookup(&unit_types, name, "unit type"))
        .collect::<Result<Vec<_>, _>>()?;
    let building_id = create_building(
        state,
        owner_uid,
        BuildingInput {
            name: meta.name.clone(),
            address: meta.address.clone(),
            has_basement: meta.has_basement,
            basement_count: meta.basement_count,
            has_mezzanine: meta.has_mezzanine,
            mezzanine_count: meta.mezzanine_count,
            has_penthouse: meta.has_penthouse,
            has_rooftop: meta.has_rooftop,
            typical_floor_count: meta.typical_floor_count,
            financial_start_date: meta.financial_start_date,
            enabled_unit_type_ids: enabled,
            annual_budget: meta.annual_budget,
            global_common_area: meta.global_common_area,
        },
    )
    .await?;

    match populate(state, &building_id, &unit_types, &export).await {
        Ok(()) => {
            info!(
                building_id = %building_id,
                units = export.units.len(),
                "building imported"
            );
            Ok(building_id)
        }
        Err(err) => {
            warn!(building_id = %building_id, error = %err, "import failed; discarding partial building");
            if soft_delete_building(state, &building_id).await.is_ok() {
                let _ = purge_building(state, &building_id).await;
            }
            Err(err)
        }
    }
}

async fn populate(
    state: &AppState,
    building_id: &ObjectId,
    unit_types: &HashMap<String, ObjectId>,
    export: &BuildingExport,
) -> Result<()> {
    let building = get_building_by_id(state, building_id)
        .await?
        .ok_or(DomainError::not_found("building"))?;

    let mut levels = HashMap::new();
    for level in &export.levels {
        let id = create_level(
            state,
            building_id,
            LevelInput {
                name: level.name.clone(),
                level_type: level.level_type,
                floor_number: level.floor_number,
                local_common_area: level.local_common_area,
            },
        )
        .await?;
        levels.insert(name_key(&level.name), id);
    }

    let mut owners = HashMap::new();
    for owner in &export.owners {
        let id = create_owner(
            state,
            building_id,
            OwnerInput {
                name: owner.name.clone(),
                email: owner.email.clone(),
                phone: owner.phone.clone(),
                national_id: owner.national_id.clone(),
                notes: owner.notes.clone(),
            },
        )
        .await?;
        owners.insert(name_key(&owner.name), id);
    }

    // Units first, parent links after every unit exists.
    let mut units = HashMap::new();
    for unit in &export.units {
        let owner_id = match &unit.owner {
            Some(name) => Some(lookup(&owners, name, "owner")?),
            None => None,
        };
        let id = create_unit(
            state,
            &building,
            UnitInput {
                unit_number: unit.unit_number.clone(),
                unit_type_id: lookup(unit_types, &unit.unit_type, "unit type")?,
                level_id: lookup(&levels, &unit.level, "level")?,
                size: unit.size,
                quarterly_maintenance_fee: unit.quarterly_maintenance_fee,
                owner_id,
                parent_unit_id: None,
            },
        )
        .await?;
        units.insert(name_key(&unit.unit_number), id);
    }

    for unit in &export.units {
        if let Some(parent) = &unit.parent_unit {
            let child_id = lookup(&units, &unit.unit_number, "unit")?;
            let parent_id = lookup(&units, parent, "parent unit")?;
            attach_child(state, building_id, &child_id, &parent_id).await?;
        }
    }
    Ok(())
}
