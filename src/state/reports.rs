// Read-side reports: loads a building's records and hands them to the ledger.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use mongodb::bson::{doc, oid::ObjectId};

use crate::{
    error::DomainError,
    ledger::{self, BuildingOverview, OwnerStatement, UnitStatement},
    models::Building,
    periods::{Quarter, RangeSelector, quarters_in_range},
};

use super::{AppState, bson_to_date, find_all};

/// Quarters of `selector` for this building, clamped to its financial start.
pub fn building_quarters(building: &Building, selector: RangeSelector, today: NaiveDate) -> Vec<Quarter> {
    quarters_in_range(bson_to_date(building.financial_start_date), selector, today)
}

pub async fn building_financials(
    state: &AppState,
    building: &Building,
    selector: RangeSelector,
    today: NaiveDate,
) -> Result<BuildingOverview> {
    let building_id = building.id.context("building missing _id")?;
    let quarters = building_quarters(building, selector, today);

    let units = find_all(&state.units, doc! { "building_id": building_id }).await?;
    let payments = find_all(&state.payments, doc! { "building_id": building_id }).await?;
    let payables = find_all(&state.payables, doc! { "building_id": building_id }).await?;

    Ok(ledger::building_overview(&units, &payments, &payables, &quarters))
}

pub async fn unit_financials(
    state: &AppState,
    building: &Building,
    unit_id: &ObjectId,
    selector: RangeSelector,
    today: NaiveDate,
) -> Result<UnitStatement> {
    let building_id = building.id.context("building missing _id")?;
    let unit = state
        .units
        .find_one(doc! { "_id": unit_id, "building_id": building_id })
        .await?
        .ok_or(DomainError::not_found("unit"))?;
    let payments = find_all(
        &state.payments,
        doc! { "building_id": building_id, "unit_id": unit_id },
    )
    .await?;

    let quarters = building_quarters(building, selector, today);
    Ok(ledger::unit_statement(&unit, &payments, &quarters))
}

pub async fn owner_financials(
    state: &AppState,
    building: &Building,
    owner_id: &ObjectId,
    selector: RangeSelector,
    today: NaiveDate,
) -> Result<OwnerStatement> {
    let building_id = building.id.context("building missing _id")?;
    if state
        .owners
        .find_one(doc! { "_id": owner_id, "building_id": building_id })
        .await?
        .is_none()
    {
        return Err(DomainError::not_found("owner").into());
    }

    let units = find_all(
        &state.units,
        doc! { "building_id": building_id, "owner_id": owner_id },
    )
    .await?;
    let unit_ids: Vec<ObjectId> = units.iter().filter_map(|u| u.id).collect();
    let payments = find_all(
        &state.payments,
        doc! { "building_id": building_id, "unit_id": { "$in": unit_ids.clone() } },
    )
    .await?;

    let quarters = building_quarters(building, selector, today);
    Ok(ledger::owner_statement(owner_id, &units, &payments, &quarters))
}
