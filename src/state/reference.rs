// Global reference lists shared by every building.

use std::collections::HashMap;

use anyhow::{Context, Result};
use mongodb::{
    Collection,
    bson::{doc, oid::ObjectId},
};

use crate::{
    apportionment::DEFAULT_TYPE_FACTOR,
    error::DomainError,
    models::{ReferenceItem, ReferenceKind, UnitType},
};

use super::{AppState, clean_opt, find_all, now};

#[derive(Debug, Clone)]
pub struct ReferenceInput {
    pub name: String,
    pub description: Option<String>,
    /// Unit types only.
    pub factor: Option<f64>,
    /// Unit types only.
    pub is_multi_level: Option<bool>,
}

impl ReferenceInput {
    fn normalized(mut self) -> Result<Self, DomainError> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err(DomainError::validation("name is required"));
        }
        if let Some(factor) = self.factor {
            if !factor.is_finite() || factor <= 0.0 {
                return Err(DomainError::validation("unit type factor must be positive"));
            }
        }
        self.description = clean_opt(self.description);
        Ok(self)
    }
}

/// Flattened view of either list shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceEntry {
    pub id: ObjectId,
    pub name: String,
    pub description: Option<String>,
    pub factor: Option<f64>,
    pub is_multi_level: Option<bool>,
}

impl TryFrom<UnitType> for ReferenceEntry {
    type Error = anyhow::Error;

    fn try_from(t: UnitType) -> Result<Self> {
        Ok(ReferenceEntry {
            id: t.id.context("unit type missing _id")?,
            name: t.name,
            description: None,
            factor: Some(t.factor),
            is_multi_level: Some(t.is_multi_level),
        })
    }
}

impl TryFrom<ReferenceItem> for ReferenceEntry {
    type Error = anyhow::Error;

    fn try_from(item: ReferenceItem) -> Result<Self> {
        Ok(ReferenceEntry {
            id: item.id.context("reference item missing _id")?,
            name: item.name,
            description: item.description,
            factor: None,
            is_multi_level: None,
        })
    }
}

/// Collection of a plain list; `None` for unit types, which have their own
/// document shape.
fn item_collection(state: &AppState, kind: ReferenceKind) -> Option<&Collection<ReferenceItem>> {
    match kind {
        ReferenceKind::UnitTypes => None,
        ReferenceKind::PayableCategories => Some(&state.payable_categories),
        ReferenceKind::UtilityTypes => Some(&state.utility_types),
        ReferenceKind::PaymentMethods => Some(&state.payment_methods),
    }
}

pub async fn list_reference(state: &AppState, kind: ReferenceKind) -> Result<Vec<ReferenceEntry>> {
    let mut entries = match item_collection(state, kind) {
        None => find_all(&state.unit_types, doc! {})
            .await?
            .into_iter()
            .map(ReferenceEntry::try_from)
            .collect::<Result<Vec<_>>>()?,
        Some(items) => find_all(items, doc! {})
            .await?
            .into_iter()
            .map(ReferenceEntry::try_from)
            .collect::<Result<Vec<_>>>()?,
    };
    entries.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    Ok(entries)
}

/// Factor per unit type id, for apportionment.
pub async fn unit_type_factors(state: &AppState) -> Result<HashMap<ObjectId, f64>> {
    Ok(find_all(&state.unit_types, doc! {})
        .await?
        .into_iter()
        .filter_map(|t| t.id.map(|id| (id, t.factor)))
        .collect())
}

async fn ensure_name_free(
    state: &AppState,
    kind: ReferenceKind,
    name: &str,
    except: Option<&ObjectId>,
) -> Result<()> {
    let mut filter = doc! { "name": name };
    if let Some(id) = except {
        filter.insert("_id", doc! { "$ne": id });
    }
    let taken = match item_collection(state, kind) {
        None => state.unit_types.count_documents(filter).await?,
        Some(items) => items.count_documents(filter).await?,
    };
    if taken > 0 {
        return Err(DomainError::conflict(format!("{name:?} already exists")).into());
    }
    Ok(())
}

pub async fn create_reference(
    state: &AppState,
    kind: ReferenceKind,
    input: ReferenceInput,
) -> Result<ObjectId> {
    let input = input.normalized()?;
    ensure_name_free(state, kind, &input.name, None).await?;

    let inserted = match item_collection(state, kind) {
        None => state
            .unit_types
            .insert_one(UnitType {
                id: None,
                name: input.name,
                factor: input.factor.unwrap_or(DEFAULT_TYPE_FACTOR),
                is_multi_level: input.is_multi_level.unwrap_or(false),
                created_at: Some(now()),
            })
            .await?
            .inserted_id,
        Some(items) => items
            .insert_one(ReferenceItem {
                id: None,
                name: input.name,
                description: input.description,
                created_at: Some(now()),
            })
            .await?
            .inserted_id,
    };
    inserted
        .as_object_id()
        .context("reference insert missing _id")
}

pub async fn update_reference(
    state: &AppState,
    kind: ReferenceKind,
    id: &ObjectId,
    input: ReferenceInput,
) -> Result<()> {
    let input = input.normalized()?;
    ensure_name_free(state, kind, &input.name, Some(id)).await?;

    let matched = match item_collection(state, kind) {
        None => {
            let mut set = doc! { "name": input.name.clone() };
            if let Some(factor) = input.factor {
                set.insert("factor", factor);
            }
            if let Some(multi) = input.is_multi_level {
                set.insert("is_multi_level", multi);
            }
            state
                .unit_types
                .update_one(doc! { "_id": id }, doc! { "$set": set })
                .await?
                .matched_count
        }
        Some(items) => {
            items
                .update_one(
                    doc! { "_id": id },
                    doc! { "$set": { "name": input.name.clone(), "description": input.description.clone() } },
                )
                .await?
                .matched_count
        }
    };
    if matched == 0 {
        return Err(DomainError::not_found("reference item").into());
    }
    Ok(())
}

async fn usage_count(state: &AppState, kind: ReferenceKind, id: &ObjectId) -> Result<u64> {
    Ok(match kind {
        ReferenceKind::UnitTypes => {
            state.units.count_documents(doc! { "unit_type_id": id }).await?
                + state
                    .buildings
                    .count_documents(doc! { "enabled_unit_type_ids": id })
                    .await?
        }
        ReferenceKind::PayableCategories => {
            state.payables.count_documents(doc! { "category_id": id }).await?
        }
        ReferenceKind::UtilityTypes => {
            state.payables.count_documents(doc! { "utility_type_id": id }).await?
        }
        ReferenceKind::PaymentMethods => {
            state.payments.count_documents(doc! { "payment_method_id": id }).await?
        }
    })
}

pub async fn delete_reference(state: &AppState, kind: ReferenceKind, id: &ObjectId) -> Result<()> {
    let used = usage_count(state, kind, id).await?;
    if used > 0 {
        return Err(DomainError::conflict(format!(
            "item is still referenced by {used} record(s)"
        ))
        .into());
    }

    let deleted = match item_collection(state, kind) {
        None => state.unit_types.delete_one(doc! { "_id": id }).await?.deleted_count,
        Some(items) => items.delete_one(doc! { "_id": id }).await?.deleted_count,
    };
    if deleted == 0 {
        return Err(DomainError::not_found("reference item").into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factor_must_be_positive() {
        let input = ReferenceInput {
            name: " Loft ".into(),
            description: None,
            factor: Some(0.0),
            is_multi_level: Some(true),
        };
        assert!(input.clone().normalized().is_err());
        let ok = ReferenceInput { factor: Some(1.3), ..input }.normalized().unwrap();
        assert_eq!(ok.name, "Loft");
    }

    #[test]
    fn unit_type_entry_carries_factor() {
        let id = ObjectId::new();
        let entry = ReferenceEntry::try_from(UnitType {
            id: Some(id),
            name: "Shop".into(),
            factor: 1.5,
            is_multi_level: false,
            created_at: None,
        })
        .unwrap();
        assert_eq!(entry.id, id);
        assert_eq!(entry.factor, Some(1.5));
        assert_eq!(entry.description, None);
    }
}
