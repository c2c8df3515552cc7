// Fee recalculation: apportions the annual budget over the building's units
// and writes the resulting quarterly fees back.

use std::collections::HashMap;

use anyhow::{Context, Result};
use mongodb::bson::{doc, oid::ObjectId};
use tracing::info;

use crate::{
    apportionment::{Apportionment, AreaInput, CommonAreas, apportion},
    error::DomainError,
    models::Building,
};

use super::{AppState, apply_unit_batch, find_all, now, unit_type_factors};

fn resolve_budget(building: &Building, annual_budget: Option<f64>) -> Result<f64, DomainError> {
    annual_budget.or(building.annual_budget).ok_or_else(|| {
        DomainError::validation("building has no annual budget; provide one to apportion fees")
    })
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Computes the allocation without writing anything.
pub async fn preview_fees(
    state: &AppState,
    building: &Building,
    annual_budget: Option<f64>,
) -> Result<Apportionment> {
    let building_id = building.id.context("building missing _id")?;
    let budget = resolve_budget(building, annual_budget)?;

    let units = find_all(&state.units, doc! { "building_id": building_id }).await?;
    let levels = find_all(&state.levels, doc! { "building_id": building_id }).await?;
    let factors = unit_type_factors(state).await?;

    let inputs: Vec<AreaInput> = units
        .iter()
        .filter_map(|u| {
            Some(AreaInput {
                unit_id: u.id?,
                unit_number: u.unit_number.clone(),
                level_id: u.level_id,
                unit_type_id: u.unit_type_id,
                net_area: u.size,
                parent_unit_id: u.parent_unit_id,
            })
        })
        .collect();
    let common = CommonAreas {
        global: building.global_common_area,
        local: levels
            .iter()
            .filter_map(|l| l.id.map(|id| (id, l.local_common_area)))
            .collect::<HashMap<_, _>>(),
    };

    Ok(apportion(&inputs, &common, &factors, budget)?)
}

/// Rewrites every unit's quarterly fee from a fresh apportionment; child
/// units get a null fee. A budget override is stored on the building.
pub async fn recalculate_fees(
    state: &AppState,
    building: &Building,
    annual_budget: Option<f64>,
) -> Result<Apportionment> {
    let building_id = building.id.context("building missing _id")?;
    let result = preview_fees(state, building, annual_budget).await?;

    let mut updates = Vec::with_capacity(result.units.len());
    for (unit_id, fee) in result.quarterly_fees() {
        let unit_id = ObjectId::parse_str(&unit_id).context("allocation carries a bad unit id")?;
        updates.push((
            unit_id,
            doc! { "$set": {
                "quarterly_maintenance_fee": fee.map(round_cents),
                "updated_at": now(),
            } },
        ));
    }
    apply_unit_batch(state, updates).await?;

    if let Some(budget) = annual_budget {
        state
            .buildings
            .update_one(
                doc! { "_id": building_id },
                doc! { "$set": { "annual_budget": budget, "updated_at": now() } },
            )
            .await?;
    }

    info!(
        building_id = %building_id,
        units = result.units.len(),
        annual_budget = result.annual_budget,
        "maintenance fees recalculated"
    );
    Ok(result)
}
