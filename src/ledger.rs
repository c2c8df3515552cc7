//! Dues, payments and expenses rolled up per unit, owner and quarter.
//!
//! Everything here is recomputed from the full record set on each call;
//! nothing is persisted. Child units of a multi-level unit carry no billing of
//! their own, so they contribute zero to every total.

use std::collections::{BTreeMap, HashMap, HashSet};

use mongodb::bson::oid::ObjectId;
use serde::Serialize;

use crate::{
    models::{Payable, Payment, Unit},
    periods::Quarter,
};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QuarterLine {
    pub quarter: String,
    pub due: f64,
    pub paid: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UnitStatement {
    pub unit_id: Option<String>,
    pub unit_number: String,
    pub owner_id: Option<String>,
    pub is_child: bool,
    pub quarterly_fee: f64,
    pub total_due: f64,
    pub total_paid: f64,
    pub balance: f64,
    pub lines: Vec<QuarterLine>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OwnerStatement {
    pub owner_id: String,
    pub units: Vec<UnitStatement>,
    pub total_due: f64,
    pub total_paid: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QuarterTotals {
    pub quarter: String,
    pub income_due: f64,
    pub income_received: f64,
    pub expenses: f64,
    pub net_cash: f64,
    pub cumulative_net: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategoryTotal {
    pub category_id: String,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BuildingOverview {
    pub quarters: Vec<String>,
    pub units: Vec<UnitStatement>,
    pub owners: Vec<OwnerStatement>,
    pub total_due: f64,
    pub total_paid: f64,
    pub balance: f64,
    pub total_expenses: f64,
    pub net_cash: f64,
    pub expenses_by_category: Vec<CategoryTotal>,
    pub breakdown: Vec<QuarterTotals>,
}

/// Sum of payment amounts per quarter for one unit, ignoring labels that do
/// not parse or fall outside `in_range`.
fn paid_by_quarter(
    unit_id: Option<&ObjectId>,
    payments: &[Payment],
    in_range: &HashSet<Quarter>,
) -> HashMap<Quarter, f64> {
    let mut paid = HashMap::new();
    let Some(unit_id) = unit_id else {
        return paid;
    };
    for payment in payments.iter().filter(|p| &p.unit_id == unit_id) {
        let Ok(quarter) = payment.quarter.parse::<Quarter>() else {
            continue;
        };
        if in_range.contains(&quarter) {
            *paid.entry(quarter).or_insert(0.0) += payment.amount;
        }
    }
    paid
}

pub fn unit_statement(unit: &Unit, payments: &[Payment], quarters: &[Quarter]) -> UnitStatement {
    let is_child = unit.is_child();
    let fee = if is_child {
        0.0
    } else {
        unit.quarterly_maintenance_fee.unwrap_or(0.0)
    };

    let in_range: HashSet<Quarter> = quarters.iter().copied().collect();
    let paid = if is_child {
        HashMap::new()
    } else {
        paid_by_quarter(unit.id.as_ref(), payments, &in_range)
    };

    let lines: Vec<QuarterLine> = quarters
        .iter()
        .map(|q| {
            let paid = paid.get(q).copied().unwrap_or(0.0);
            QuarterLine {
                quarter: q.label(),
                due: fee,
                paid,
                balance: paid - fee,
            }
        })
        .collect();

    let total_due = fee * quarters.len() as f64;
    let total_paid: f64 = lines.iter().map(|l| l.paid).sum();

    UnitStatement {
        unit_id: unit.id.map(|id| id.to_hex()),
        unit_number: unit.unit_number.clone(),
        owner_id: unit.owner_id.map(|id| id.to_hex()),
        is_child,
        quarterly_fee: fee,
        total_due,
        total_paid,
        balance: total_paid - total_due,
        lines,
    }
}

/// Totals over the owner's parent (non-child) units.
pub fn owner_statement(
    owner_id: &ObjectId,
    units: &[Unit],
    payments: &[Payment],
    quarters: &[Quarter],
) -> OwnerStatement {
    let statements: Vec<UnitStatement> = units
        .iter()
        .filter(|u| !u.is_child() && u.owner_id.as_ref() == Some(owner_id))
        .map(|u| unit_statement(u, payments, quarters))
        .collect();

    let total_due = statements.iter().map(|s| s.total_due).sum::<f64>();
    let total_paid = statements.iter().map(|s| s.total_paid).sum::<f64>();
    let balance = statements.iter().map(|s| s.balance).sum::<f64>();

    OwnerStatement {
        owner_id: owner_id.to_hex(),
        units: statements,
        total_due,
        total_paid,
        balance,
    }
}

/// Per-quarter income and expense with a running net, oldest first.
pub fn quarterly_breakdown(
    units: &[Unit],
    payments: &[Payment],
    payables: &[Payable],
    quarters: &[Quarter],
) -> Vec<QuarterTotals> {
    let mut buckets: BTreeMap<Quarter, QuarterTotals> = quarters
        .iter()
        .map(|q| {
            (
                *q,
                QuarterTotals {
                    quarter: q.label(),
                    income_due: 0.0,
                    income_received: 0.0,
                    expenses: 0.0,
                    net_cash: 0.0,
                    cumulative_net: 0.0,
                },
            )
        })
        .collect();

    for unit in units.iter().filter(|u| !u.is_child()) {
        let statement = unit_statement(unit, payments, quarters);
        for (q, line) in quarters.iter().zip(statement.lines.iter()) {
            if let Some(bucket) = buckets.get_mut(q) {
                bucket.income_due += line.due;
                bucket.income_received += line.paid;
            }
        }
    }

    for payable in payables {
        let quarter = Quarter::containing(payable.date.to_chrono().date_naive());
        if let Some(bucket) = buckets.get_mut(&quarter) {
            bucket.expenses += payable.amount;
        }
    }

    let mut running = 0.0;
    buckets
        .into_values()
        .map(|mut bucket| {
            bucket.net_cash = bucket.income_received - bucket.expenses;
            running += bucket.net_cash;
            bucket.cumulative_net = running;
            bucket
        })
        .collect()
}

/// Whole-building report: unit and owner statements plus expense totals.
pub fn building_overview(
    units: &[Unit],
    payments: &[Payment],
    payables: &[Payable],
    quarters: &[Quarter],
) -> BuildingOverview {
    let unit_statements: Vec<UnitStatement> = units
        .iter()
        .filter(|u| !u.is_child())
        .map(|u| unit_statement(u, payments, quarters))
        .collect();

    let mut owner_ids: Vec<ObjectId> = Vec::new();
    for unit in units.iter().filter(|u| !u.is_child()) {
        if let Some(owner) = unit.owner_id {
            if !owner_ids.contains(&owner) {
                owner_ids.push(owner);
            }
        }
    }
    let owners = owner_ids
        .iter()
        .map(|owner| owner_statement(owner, units, payments, quarters))
        .collect();

    let breakdown = quarterly_breakdown(units, payments, payables, quarters);

    let in_range: HashSet<Quarter> = quarters.iter().copied().collect();
    let mut by_category: BTreeMap<String, f64> = BTreeMap::new();
    for payable in payables {
        let quarter = Quarter::containing(payable.date.to_chrono().date_naive());
        if in_range.contains(&quarter) {
            *by_category.entry(payable.category_id.to_hex()).or_insert(0.0) += payable.amount;
        }
    }

    let total_due = unit_statements.iter().map(|s| s.total_due).sum::<f64>();
    let total_paid = unit_statements.iter().map(|s| s.total_paid).sum::<f64>();
    let total_expenses = breakdown.iter().map(|b| b.expenses).sum::<f64>();

    BuildingOverview {
        quarters: quarters.iter().map(Quarter::label).collect(),
        units: unit_statements,
        owners,
        total_due,
        total_paid,
        balance: total_paid - total_due,
        total_expenses,
        net_cash: total_paid - total_expenses,
        expenses_by_category: by_category
            .into_iter()
            .map(|(category_id, total)| CategoryTotal { category_id, total })
            .collect(),
        breakdown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::periods::{RangeSelector, quarters_in_range};
    use chrono::NaiveDate;
    use mongodb::bson::DateTime;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn bson_date(y: i32, m: u32, d: u32) -> DateTime {
        DateTime::from_chrono(date(y, m, d).and_hms_opt(12, 0, 0).unwrap().and_utc())
    }

    fn unit(fee: Option<f64>, owner: Option<ObjectId>) -> Unit {
        Unit {
            id: Some(ObjectId::new()),
            building_id: ObjectId::new(),
            unit_number: "A1".into(),
            unit_type_id: ObjectId::new(),
            level_id: ObjectId::new(),
            size: 100.0,
            quarterly_maintenance_fee: fee,
            owner_id: owner,
            parent_unit_id: None,
            child_unit_ids: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }

    fn payment(unit: &Unit, quarter: &str, amount: f64) -> Payment {
        Payment {
            id: Some(ObjectId::new()),
            building_id: unit.building_id,
            unit_id: unit.id.unwrap(),
            quarter: quarter.into(),
            amount,
            date: bson_date(2024, 2, 1),
            payment_method_id: None,
            receipt: None,
            notes: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn payable(category: ObjectId, amount: f64, on: DateTime) -> Payable {
        Payable {
            id: Some(ObjectId::new()),
            building_id: ObjectId::new(),
            category_id: category,
            employee_id: None,
            service_provider_id: None,
            utility_type_id: None,
            amount,
            date: on,
            vendor: None,
            receipt: None,
            notes: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn year_2024() -> Vec<Quarter> {
        quarters_in_range(date(2024, 1, 1), RangeSelector::Year(2024), date(2024, 6, 1))
    }

    #[test]
    fn year_with_two_quarters_paid() {
        let u = unit(Some(1000.0), None);
        let payments = vec![payment(&u, "Q1 2024", 1000.0), payment(&u, "Q2 2024", 1000.0)];
        let s = unit_statement(&u, &payments, &year_2024());
        assert_eq!(s.total_due, 4000.0);
        assert_eq!(s.total_paid, 2000.0);
        assert_eq!(s.balance, -2000.0);
        assert_eq!(s.lines.len(), 4);
        assert_eq!(s.lines[2].paid, 0.0);
    }

    #[test]
    fn payments_outside_range_or_unparseable_are_ignored() {
        let u = unit(Some(500.0), None);
        let payments = vec![
            payment(&u, "Q4 2023", 500.0),
            payment(&u, "first quarter", 500.0),
            payment(&u, "Q3 2024", 250.0),
        ];
        let s = unit_statement(&u, &payments, &year_2024());
        assert_eq!(s.total_paid, 250.0);
    }

    #[test]
    fn other_units_payments_do_not_count() {
        let u = unit(Some(500.0), None);
        let other = unit(Some(500.0), None);
        let s = unit_statement(&u, &[payment(&other, "Q1 2024", 500.0)], &year_2024());
        assert_eq!(s.total_paid, 0.0);
    }

    #[test]
    fn child_unit_contributes_nothing() {
        let mut child = unit(Some(800.0), Some(ObjectId::new()));
        child.parent_unit_id = Some(ObjectId::new());
        let payments = vec![payment(&child, "Q1 2024", 800.0)];
        let s = unit_statement(&child, &payments, &year_2024());
        assert!(s.is_child);
        assert_eq!((s.total_due, s.total_paid, s.balance), (0.0, 0.0, 0.0));
    }

    #[test]
    fn owner_balance_is_sum_of_parent_unit_balances() {
        let owner = ObjectId::new();
        let a = unit(Some(1000.0), Some(owner));
        let b = unit(Some(300.0), Some(owner));
        let mut child = unit(Some(999.0), Some(owner));
        child.parent_unit_id = a.id;
        let stranger = unit(Some(50.0), Some(ObjectId::new()));
        let units = vec![a.clone(), b.clone(), child, stranger];
        let payments = vec![payment(&a, "Q1 2024", 1000.0), payment(&b, "Q2 2024", 600.0)];
        let quarters = year_2024();

        let s = owner_statement(&owner, &units, &payments, &quarters);
        assert_eq!(s.units.len(), 2);
        assert_eq!(s.total_due, 5200.0);
        assert_eq!(s.total_paid, 1600.0);
        let unit_sum: f64 = s.units.iter().map(|u| u.balance).sum();
        assert_eq!(s.balance, unit_sum);
        assert_eq!(s.balance, s.total_paid - s.total_due);
    }

    #[test]
    fn breakdown_accumulates_net_cash() {
        let u = unit(Some(1000.0), None);
        let cat = ObjectId::new();
        let payments = vec![payment(&u, "Q1 2024", 1000.0), payment(&u, "Q2 2024", 1000.0)];
        let payables = vec![
            payable(cat, 400.0, bson_date(2024, 2, 10)),
            payable(cat, 100.0, bson_date(2024, 11, 3)),
            payable(cat, 999.0, bson_date(2023, 12, 31)),
        ];
        let rows = quarterly_breakdown(&[u], &payments, &payables, &year_2024());
        let nets: Vec<f64> = rows.iter().map(|r| r.net_cash).collect();
        assert_eq!(nets, vec![600.0, 1000.0, 0.0, -100.0]);
        assert_eq!(rows.last().unwrap().cumulative_net, 1500.0);
        assert_eq!(rows[0].income_due, 1000.0);
    }

    #[test]
    fn overview_totals_line_up() {
        let owner = ObjectId::new();
        let a = unit(Some(1000.0), Some(owner));
        let b = unit(None, None);
        let cat = ObjectId::new();
        let payments = vec![payment(&a, "Q1 2024", 1000.0)];
        let payables = vec![payable(cat, 250.0, bson_date(2024, 5, 5))];
        let o = building_overview(&[a, b], &payments, &payables, &year_2024());
        assert_eq!(o.total_due, 4000.0);
        assert_eq!(o.total_paid, 1000.0);
        assert_eq!(o.balance, -3000.0);
        assert_eq!(o.total_expenses, 250.0);
        assert_eq!(o.net_cash, 750.0);
        assert_eq!(o.owners.len(), 1);
        assert_eq!(o.expenses_by_category.len(), 1);
        assert_eq!(o.quarters.len(), 4);
    }
}
