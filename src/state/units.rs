use anyhow::{Context, Result};
use mongodb::bson::{Document, doc, oid::ObjectId};
use tracing::info;

use crate::{
    error::DomainError,
    models::{Building, Unit, UnitType},
};

use super::{AppState, apply_unit_batch, find_all, now};

#[derive(Debug, Clone)]
pub struct UnitInput {
    pub unit_number: String,
    pub unit_type_id: ObjectId,
    pub level_id: ObjectId,
    pub size: f64,
    pub quarterly_maintenance_fee: Option<f64>,
    pub owner_id: Option<ObjectId>,
    pub parent_unit_id: Option<ObjectId>,
}

impl UnitInput {
    fn normalized(mut self) -> Result<Self, DomainError> {
        self.unit_number = self.unit_number.trim().to_string();
        if self.unit_number.is_empty() {
            return Err(DomainError::validation("unit number is required"));
        }
        if !self.size.is_finite() || self.size < 0.0 {
            return Err(DomainError::validation("unit size must be non-negative"));
        }
        if let Some(fee) = self.quarterly_maintenance_fee {
            if !fee.is_finite() || fee < 0.0 {
                return Err(DomainError::validation(
                    "quarterly maintenance fee must be non-negative",
                ));
            }
        }
        // Child units are billed through their parent.
        if self.parent_unit_id.is_some() {
            self.owner_id = None;
            self.quarterly_maintenance_fee = None;
        }
        Ok(self)
    }
}

/// Rules for making `child` part of `parent`'s multi-level unit;
/// `parent_type` is the parent's unit type.
pub fn check_link(child: &Unit, parent: &Unit, parent_type: &UnitType) -> Result<(), DomainError> {
    if child.id.is_some() && child.id == parent.id {
        return Err(DomainError::validation("a unit cannot be its own parent"));
    }
    if child.building_id != parent.building_id {
        return Err(DomainError::validation(
            "parent unit belongs to another building",
        ));
    }
    if parent.is_child() {
        return Err(DomainError::validation(
            "parent unit is itself part of another unit",
        ));
    }
    if !child.child_unit_ids.is_empty() {
        return Err(DomainError::validation(
            "a unit with child units cannot become a child",
        ));
    }
    if !parent_type.is_multi_level {
        return Err(DomainError::validation(format!(
            "unit type {} does not allow multi-level units",
            parent_type.name
        )));
    }
    Ok(())
}

/// Unit document updates that move `child_id` from `old_parent` to
/// `new_parent`. Setting a parent nulls the child's owner and fee; every
/// update is idempotent so repeating the batch lists the child once.
pub fn link_updates(
    child_id: ObjectId,
    old_parent: Option<ObjectId>,
    new_parent: Option<ObjectId>,
) -> Vec<(ObjectId, Document)> {
    let mut updates = Vec::new();
    if let Some(old) = old_parent {
        if Some(old) != new_parent {
            updates.push((
                old,
                doc! { "$pull": { "child_unit_ids": child_id }, "$set": { "updated_at": now() } },
            ));
        }
    }
    match new_parent {
        Some(parent) => {
            updates.push((
                child_id,
                doc! { "$set": {
                    "parent_unit_id": parent,
                    "owner_id": null,
                    "quarterly_maintenance_fee": null,
                    "updated_at": now(),
                } },
            ));
            updates.push((
                parent,
                doc! { "$addToSet": { "child_unit_ids": child_id }, "$set": { "updated_at": now() } },
            ));
        }
        None => {
            if old_parent.is_some() {
                updates.push((
                    child_id,
                    doc! { "$set": { "parent_unit_id": null, "updated_at": now() } },
                ));
            }
        }
    }
    updates
}

pub async fn list_units(state: &AppState, building_id: &ObjectId) -> Result<Vec<Unit>> {
    find_all(&state.units, doc! { "building_id": building_id }).await
}

pub async fn get_unit_by_id(
    state: &AppState,
    building_id: &ObjectId,
    id: &ObjectId,
) -> Result<Option<Unit>> {
    state
        .units
        .find_one(doc! { "_id": id, "building_id": building_id })
        .await
        .map_err(Into::into)
}

async fn require_unit(state: &AppState, building_id: &ObjectId, id: &ObjectId) -> Result<Unit> {
    Ok(get_unit_by_id(state, building_id, id)
        .await?
        .ok_or(DomainError::not_found("unit"))?)
}

async fn payment_count(state: &AppState, building_id: &ObjectId, id: &ObjectId) -> Result<u64> {
    Ok(state
        .payments
        .count_documents(doc! { "building_id": building_id, "unit_id": id })
        .await?)
}

/// Payments against a child unit drop out of every statement, so a unit
/// with payments keeps standing on its own.
async fn ensure_can_become_child(
    state: &AppState,
    building_id: &ObjectId,
    id: &ObjectId,
) -> Result<()> {
    if payment_count(state, building_id, id).await? > 0 {
        return Err(DomainError::conflict(
            "unit has recorded payments; it cannot become part of another unit",
        )
        .into());
    }
    Ok(())
}

/// Checks the link rules against `parent` and its unit type.
async fn check_parent(state: &AppState, child: &Unit, parent: &Unit) -> Result<()> {
    let parent_type = state
        .unit_types
        .find_one(doc! { "_id": parent.unit_type_id })
        .await?
        .ok_or_else(|| DomainError::validation("parent unit has an unknown unit type"))?;
    check_link(child, parent, &parent_type)?;
    Ok(())
}

/// Checks references and uniqueness; returns the parent unit when one is set.
async fn validate_refs(
    state: &AppState,
    building: &Building,
    input: &UnitInput,
    except: Option<&ObjectId>,
) -> Result<Option<Unit>> {
    let building_id = building.id.context("building missing _id")?;

    let mut dup_filter = doc! { "building_id": building_id, "unit_number": input.unit_number.clone() };
    if let Some(id) = except {
        dup_filter.insert("_id", doc! { "$ne": id });
    }
    if state.units.find_one(dup_filter).await?.is_some() {
        return Err(DomainError::conflict(format!(
            "unit number {} already exists in this building",
            input.unit_number
        ))
        .into());
    }

    if state
        .levels
        .find_one(doc! { "_id": input.level_id, "building_id": building_id })
        .await?
        .is_none()
    {
        return Err(DomainError::validation("level does not belong to this building").into());
    }

    if state
        .unit_types
        .find_one(doc! { "_id": input.unit_type_id })
        .await?
        .is_none()
    {
        return Err(DomainError::validation("unknown unit type").into());
    }
    if !building.enabled_unit_type_ids.is_empty()
        && !building.enabled_unit_type_ids.contains(&input.unit_type_id)
    {
        return Err(DomainError::validation("unit type is not enabled for this building").into());
    }

    if let Some(owner_id) = input.owner_id {
        if state
            .owners
            .find_one(doc! { "_id": owner_id, "building_id": building_id })
            .await?
            .is_none()
        {
            return Err(DomainError::validation("owner does not belong to this building").into());
        }
    }

    match input.parent_unit_id {
        Some(parent_id) => Ok(Some(
            get_unit_by_id(state, &building_id, &parent_id)
                .await?
                .ok_or_else(|| DomainError::validation("parent unit not found in this building"))?,
        )),
        None => Ok(None),
    }
}

pub async fn create_unit(state: &AppState, building: &Building, input: UnitInput) -> Result<ObjectId> {
    let input = input.normalized()?;
    let building_id = building.id.context("building missing _id")?;
    let parent = validate_refs(state, building, &input, None).await?;

    let unit = Unit {
        id: None,
        building_id,
        unit_number: input.unit_number,
        unit_type_id: input.unit_type_id,
        level_id: input.level_id,
        size: input.size,
        quarterly_maintenance_fee: input.quarterly_maintenance_fee,
        owner_id: input.owner_id,
        parent_unit_id: input.parent_unit_id,
        child_unit_ids: Vec::new(),
        created_at: Some(now()),
        updated_at: None,
    };
    if let Some(parent) = &parent {
        check_parent(state, &unit, parent).await?;
    }

    let res = state.units.insert_one(&unit).await?;
    let id = res
        .inserted_id
        .as_object_id()
        .context("unit insert missing _id")?;

    if let Some(parent_id) = input.parent_unit_id {
        apply_unit_batch(state, link_updates(id, None, Some(parent_id))).await?;
    }
    Ok(id)
}

pub async fn update_unit(
    state: &AppState,
    building: &Building,
    id: &ObjectId,
    input: UnitInput,
) -> Result<()> {
    let input = input.normalized()?;
    let building_id = building.id.context("building missing _id")?;
    let existing = require_unit(state, &building_id, id).await?;
    let parent = validate_refs(state, building, &input, Some(id)).await?;
    let parent_changed = existing.parent_unit_id != input.parent_unit_id;
    if let Some(parent) = parent.as_ref().filter(|_| parent_changed) {
        check_parent(state, &existing, parent).await?;
        ensure_can_become_child(state, &building_id, id).await?;
    }

    let mut updates = vec![(
        *id,
        doc! { "$set": {
            "unit_number": input.unit_number.clone(),
            "unit_type_id": input.unit_type_id,
            "level_id": input.level_id,
            "size": input.size,
            "quarterly_maintenance_fee": input.quarterly_maintenance_fee,
            "owner_id": input.owner_id,
            "updated_at": now(),
        } },
    )];
    if parent_changed {
        updates.extend(link_updates(*id, existing.parent_unit_id, input.parent_unit_id));
    }
    apply_unit_batch(state, updates).await
}

/// Makes `child_id` part of `parent_id`, leaving any previous parent.
pub async fn attach_child(
    state: &AppState,
    building_id: &ObjectId,
    child_id: &ObjectId,
    parent_id: &ObjectId,
) -> Result<()> {
    let child = require_unit(state, building_id, child_id).await?;
    let parent = get_unit_by_id(state, building_id, parent_id)
        .await?
        .ok_or_else(|| DomainError::validation("parent unit not found in this building"))?;
    check_parent(state, &child, &parent).await?;
    if child.parent_unit_id.is_none() {
        ensure_can_become_child(state, building_id, child_id).await?;
    }

    apply_unit_batch(
        state,
        link_updates(*child_id, child.parent_unit_id, Some(*parent_id)),
    )
    .await?;
    info!(building_id = %building_id, child = %child_id, parent = %parent_id, "unit attached");
    Ok(())
}

pub async fn detach_child(state: &AppState, building_id: &ObjectId, child_id: &ObjectId) -> Result<()> {
    let child = require_unit(state, building_id, child_id).await?;
    if child.parent_unit_id.is_none() {
        return Err(DomainError::validation("unit is not attached to a parent").into());
    }
    apply_unit_batch(state, link_updates(*child_id, child.parent_unit_id, None)).await?;
    info!(building_id = %building_id, child = %child_id, "unit detached");
    Ok(())
}

pub async fn delete_unit(state: &AppState, building_id: &ObjectId, id: &ObjectId) -> Result<()> {
    let unit = require_unit(state, building_id, id).await?;

    if payment_count(state, building_id, id).await? > 0 {
        return Err(DomainError::conflict("unit has recorded payments; it cannot be deleted").into());
    }

    let mut updates = link_updates(*id, unit.parent_unit_id, None);
    updates.retain(|(target, _)| target != id);
    for child in &unit.child_unit_ids {
        updates.push((
            *child,
            doc! { "$set": { "parent_unit_id": null, "updated_at": now() } },
        ));
    }
    apply_unit_batch(state, updates).await?;

    state
        .units
        .delete_one(doc! { "_id": id, "building_id": building_id })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(building: ObjectId) -> Unit {
        Unit {
            id: Some(ObjectId::new()),
            building_id: building,
            unit_number: "PH-1".into(),
            unit_type_id: ObjectId::new(),
            level_id: ObjectId::new(),
            size: 120.0,
            quarterly_maintenance_fee: Some(900.0),
            owner_id: Some(ObjectId::new()),
            parent_unit_id: None,
            child_unit_ids: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }

    fn input(parent: Option<ObjectId>) -> UnitInput {
        UnitInput {
            unit_number: " 12B ".into(),
            unit_type_id: ObjectId::new(),
            level_id: ObjectId::new(),
            size: 45.0,
            quarterly_maintenance_fee: Some(300.0),
            owner_id: Some(ObjectId::new()),
            parent_unit_id: parent,
        }
    }

    #[test]
    fn setting_a_parent_clears_owner_and_fee() {
        let n = input(Some(ObjectId::new())).normalized().unwrap();
        assert_eq!(n.unit_number, "12B");
        assert!(n.owner_id.is_none());
        assert!(n.quarterly_maintenance_fee.is_none());

        let standalone = input(None).normalized().unwrap();
        assert!(standalone.owner_id.is_some());
    }

    fn unit_type(is_multi_level: bool) -> UnitType {
        UnitType {
            id: Some(ObjectId::new()),
            name: if is_multi_level { "Duplex" } else { "Apartment" }.into(),
            factor: 1.0,
            is_multi_level,
            created_at: None,
        }
    }

    #[test]
    fn link_rules() {
        let b = ObjectId::new();
        let duplex = unit_type(true);
        let parent = unit(b);
        let child = unit(b);
        assert!(check_link(&child, &parent, &duplex).is_ok());
        assert!(check_link(&parent, &parent, &duplex).is_err());

        let mut nested_parent = unit(b);
        nested_parent.parent_unit_id = Some(ObjectId::new());
        assert!(check_link(&child, &nested_parent, &duplex).is_err());

        let mut has_children = unit(b);
        has_children.child_unit_ids.push(ObjectId::new());
        assert!(check_link(&has_children, &parent, &duplex).is_err());

        assert!(check_link(&unit(ObjectId::new()), &parent, &duplex).is_err());
    }

    #[test]
    fn parent_type_must_allow_multi_level() {
        let b = ObjectId::new();
        let err = check_link(&unit(b), &unit(b), &unit_type(false)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn attach_updates_child_and_parent() {
        let child = ObjectId::new();
        let parent = ObjectId::new();
        let updates = link_updates(child, None, Some(parent));
        assert_eq!(updates.len(), 2);
        let (target, child_update) = &updates[0];
        assert_eq!(*target, child);
        let set = child_update.get_document("$set").unwrap();
        assert!(set.get("owner_id").unwrap().as_null().is_some());
        assert!(set.get("quarterly_maintenance_fee").unwrap().as_null().is_some());
        let (target, parent_update) = &updates[1];
        assert_eq!(*target, parent);
        assert!(parent_update.get_document("$addToSet").is_ok());
    }

    #[test]
    fn moving_between_parents_pulls_from_old() {
        let child = ObjectId::new();
        let old = ObjectId::new();
        let new = ObjectId::new();
        let updates = link_updates(child, Some(old), Some(new));
        assert_eq!(updates.len(), 3);
        assert_eq!(updates[0].0, old);
        assert!(updates[0].1.get_document("$pull").is_ok());
    }

    #[test]
    fn detach_and_noop() {
        let child = ObjectId::new();
        let old = ObjectId::new();
        let updates = link_updates(child, Some(old), None);
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[1].0, child);

        assert!(link_updates(child, None, None).is_empty());
    }
}
