//! Maintenance fee apportionment.
//!
//! Each unit's net area picks up a share of its floor's local common area and
//! of the building's global common area, proportional to net area. The
//! resulting gross area is weighted by the unit type factor, child units of a
//! multi-level unit are folded into their parent, and the annual budget is
//! split in proportion to the final billing areas.

use std::collections::HashMap;

use mongodb::bson::oid::ObjectId;
use serde::Serialize;

use crate::error::DomainError;

pub const DEFAULT_TYPE_FACTOR: f64 = 1.0;

#[derive(Debug, Clone)]
pub struct AreaInput {
    pub unit_id: ObjectId,
    pub unit_number: String,
    pub level_id: ObjectId,
    pub unit_type_id: ObjectId,
    pub net_area: f64,
    pub parent_unit_id: Option<ObjectId>,
}

#[derive(Debug, Clone, Default)]
pub struct CommonAreas {
    pub global: f64,
    pub local: HashMap<ObjectId, f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UnitAllocation {
    pub unit_id: String,
    pub unit_number: String,
    pub net_area: f64,
    pub local_share: f64,
    pub global_share: f64,
    pub gross_area: f64,
    pub type_factor: f64,
    pub weighted_area: f64,
    /// Own weighted area plus that of any child units; zero for children.
    pub billing_area: f64,
    pub parent_unit_id: Option<String>,
    pub annual_fee: Option<f64>,
    pub quarterly_fee: Option<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Apportionment {
    pub annual_budget: f64,
    pub total_billing_area: f64,
    pub units: Vec<UnitAllocation>,
}

impl Apportionment {
    /// Quarterly fee per unit id; `None` for child units.
    pub fn quarterly_fees(&self) -> Vec<(String, Option<f64>)> {
        self.units
            .iter()
            .map(|u| (u.unit_id.clone(), u.quarterly_fee))
            .collect()
    }
}

fn check_amount(value: f64, what: &str) -> Result<(), DomainError> {
    if !value.is_finite() || value < 0.0 {
        return Err(DomainError::Apportionment(format!(
            "{what} must be a non-negative number (got {value})"
        )));
    }
    Ok(())
}

fn share(pool: f64, part: f64, whole: f64) -> f64 {
    if whole > 0.0 { pool * part / whole } else { 0.0 }
}

pub fn apportion(
    units: &[AreaInput],
    common: &CommonAreas,
    type_factors: &HashMap<ObjectId, f64>,
    annual_budget: f64,
) -> Result<Apportionment, DomainError> {
    check_amount(annual_budget, "annual budget")?;
    check_amount(common.global, "global common area")?;
    for (level, area) in &common.local {
        check_amount(*area, &format!("local common area of level {level}"))?;
    }

    let by_id: HashMap<ObjectId, &AreaInput> = units.iter().map(|u| (u.unit_id, u)).collect();
    for unit in units {
        check_amount(unit.net_area, &format!("size of unit {}", unit.unit_number))?;
        if let Some(parent) = unit.parent_unit_id {
            match by_id.get(&parent) {
                None => {
                    return Err(DomainError::Apportionment(format!(
                        "unit {} references a parent outside the building",
                        unit.unit_number
                    )));
                }
                Some(p) if p.parent_unit_id.is_some() => {
                    return Err(DomainError::Apportionment(format!(
                        "unit {} has a parent that is itself a child unit",
                        unit.unit_number
                    )));
                }
                Some(_) => {}
            }
        }
    }

    let mut net_per_level: HashMap<ObjectId, f64> = HashMap::new();
    for unit in units {
        *net_per_level.entry(unit.level_id).or_insert(0.0) += unit.net_area;
    }
    let total_net: f64 = units.iter().map(|u| u.net_area).sum();

    let mut allocations: Vec<UnitAllocation> = units
        .iter()
        .map(|unit| {
            let local_pool = common.local.get(&unit.level_id).copied().unwrap_or(0.0);
            let level_net = net_per_level.get(&unit.level_id).copied().unwrap_or(0.0);
            let local_share = share(local_pool, unit.net_area, level_net);
            let global_share = share(common.global, unit.net_area, total_net);
            let gross_area = unit.net_area + local_share + global_share;
            let type_factor = type_factors
                .get(&unit.unit_type_id)
                .copied()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .unwrap_or(DEFAULT_TYPE_FACTOR);
            UnitAllocation {
                unit_id: unit.unit_id.to_hex(),
                unit_number: unit.unit_number.clone(),
                net_area: unit.net_area,
                local_share,
                global_share,
                gross_area,
                type_factor,
                weighted_area: gross_area * type_factor,
                billing_area: 0.0,
                parent_unit_id: unit.parent_unit_id.map(|p| p.to_hex()),
                annual_fee: None,
                quarterly_fee: None,
            }
        })
        .collect();

    // Fold children into their parents.
    let mut rolled: HashMap<String, f64> = HashMap::new();
    for alloc in &allocations {
        if let Some(parent) = &alloc.parent_unit_id {
            *rolled.entry(parent.clone()).or_insert(0.0) += alloc.weighted_area;
        }
    }
    for alloc in allocations.iter_mut() {
        if alloc.parent_unit_id.is_none() {
            alloc.billing_area =
                alloc.weighted_area + rolled.get(&alloc.unit_id).copied().unwrap_or(0.0);
        }
    }

    let total_billing_area: f64 = allocations.iter().map(|a| a.billing_area).sum();
    if total_billing_area <= 0.0 && annual_budget > 0.0 && !allocations.is_empty() {
        return Err(DomainError::Apportionment(
            "total billing area is zero; cannot split the budget".into(),
        ));
    }

    for alloc in allocations.iter_mut() {
        if alloc.parent_unit_id.is_none() {
            let annual = share(annual_budget, alloc.billing_area, total_billing_area);
            alloc.annual_fee = Some(annual);
            alloc.quarterly_fee = Some(annual / 4.0);
        }
    }

    Ok(Apportionment {
        annual_budget,
        total_billing_area,
        units: allocations,
    })
}
