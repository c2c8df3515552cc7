// routes/reports.rs
// Financial reports and fee apportionment over a selectable quarter range.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};

use crate::{
    apportionment::Apportionment,
    error::ApiResult,
    ledger::{BuildingOverview, OwnerStatement, UnitStatement},
    periods::{RangeSelector, quarter_labels},
    session::SessionUser,
    state::{
        AppState, building_financials, building_path, building_quarters, owner_financials,
        preview_fees, recalculate_fees, unit_financials,
    },
};

use super::helpers::*;

#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    #[serde(default)]
    range: Option<String>,
}

impl RangeQuery {
    /// Missing or blank means year to date.
    fn selector(&self) -> ApiResult<RangeSelector> {
        match self.range.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            Some(raw) => Ok(RangeSelector::parse(raw)?),
            None => Ok(RangeSelector::default()),
        }
    }
}

#[derive(Serialize)]
pub struct QuartersView {
    range: String,
    quarters: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BudgetQuery {
    #[serde(default)]
    annual_budget: Option<f64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RecalculateForm {
    #[serde(default)]
    annual_budget: Option<f64>,
}

pub async fn quarters_index(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<QuartersView>> {
    let (_, building) = active_building(&state, &session_user, &id).await?;
    let selector = query.selector()?;
    let quarters = building_quarters(&building, selector, today());
    Ok(Json(QuartersView {
        range: selector.as_string(),
        quarters: quarter_labels(&quarters),
    }))
}

pub async fn building_report(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<BuildingOverview>> {
    let (_, building) = active_building(&state, &session_user, &id).await?;
    let overview = building_financials(&state, &building, query.selector()?, today()).await?;
    Ok(Json(overview))
}

pub async fn unit_report(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((id, unit_id)): Path<(String, String)>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<UnitStatement>> {
    let (_, building) = active_building(&state, &session_user, &id).await?;
    let unit_id = parse_object_id(&unit_id, "unit id")?;
    let statement = unit_financials(&state, &building, &unit_id, query.selector()?, today()).await?;
    Ok(Json(statement))
}

pub async fn owner_report(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((id, owner_id)): Path<(String, String)>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<OwnerStatement>> {
    let (_, building) = active_building(&state, &session_user, &id).await?;
    let owner_id = parse_object_id(&owner_id, "owner id")?;
    let statement =
        owner_financials(&state, &building, &owner_id, query.selector()?, today()).await?;
    Ok(Json(statement))
}

pub async fn fees_preview(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<BudgetQuery>,
) -> ApiResult<Json<Apportionment>> {
    let (_, building) = active_building(&state, &session_user, &id).await?;
    Ok(Json(preview_fees(&state, &building, query.annual_budget).await?))
}

pub async fn fees_recalculate(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Option<Json<RecalculateForm>>,
) -> ApiResult<Json<Apportionment>> {
    let (building_id, building) = active_building(&state, &session_user, &id).await?;
    let form = body.map(|Json(f)| f).unwrap_or_default();
    let result = recalculate_fees(&state, &building, form.annual_budget)
        .await
        .map_err(|e| write_failed(&building_path(&building_id, "units"), "recalculate_fees", &form, e))?;
    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_range_defaults_to_year_to_date() {
        let q = RangeQuery { range: Some(" ".into()) };
        assert_eq!(q.selector().unwrap(), RangeSelector::YearToDate);
        let q = RangeQuery { range: Some("year_2023".into()) };
        assert_eq!(q.selector().unwrap(), RangeSelector::Year(2023));
        assert!(RangeQuery { range: Some("decade".into()) }.selector().is_err());
    }
}
