#[path = "common/mod.rs"]
mod common;

use buildingdesk::{
    error::DomainError,
    models::ReferenceKind,
    periods::RangeSelector,
    state::{
        EmployeeInput, OwnerInput, PayableInput, PaymentInput, SalaryChange, building_financials,
        create_employee, create_owner, create_payable, create_payment, delete_employee,
        delete_reference, get_building_by_id, get_unit_by_id, list_reference,
        list_salary_history, owner_financials, preview_fees, recalculate_fees,
        record_salary_change, unit_financials, update_employee,
    },
};

fn domain(err: anyhow::Error) -> DomainError {
    err.downcast::<DomainError>().expect("expected a domain error")
}

async fn reference_id(state: &buildingdesk::state::AppState, kind: ReferenceKind, name: &str) -> mongodb::bson::oid::ObjectId {
    list_reference(state, kind)
        .await
        .unwrap()
        .into_iter()
        .find(|e| e.name == name)
        .map(|e| e.id)
        .unwrap_or_else(|| panic!("seeded {name} missing"))
}

#[tokio::test]
async fn unit_and_owner_statements_for_a_year() {
    let Some(ctx) = common::setup_state().await else {
        return;
    };
    let state = ctx.state.clone();
    let (user, _) = common::signed_in_user(&state, "admin@example.com").await;
    let building = common::new_building(&state, &user, "Torre A").await;
    let building_id = building.id.unwrap();
    let apartment = common::unit_type_id(&state, "Apartment").await;
    let level = common::new_level(&state, &building, "Floor 1", 1).await;
    let owner_id = create_owner(
        &state,
        &building_id,
        OwnerInput {
            name: "Ana Ruiz".into(),
            email: None,
            phone: None,
            national_id: None,
            notes: None,
        },
    )
    .await
    .unwrap();

    let mut input = common::unit_input("101", apartment, level, 80.0);
    input.owner_id = Some(owner_id);
    input.quarterly_maintenance_fee = Some(1000.0);
    let unit = common::new_unit(&state, &building, input).await;

    for quarter in ["Q1 2024", "q2 2024"] {
        create_payment(
            &state,
            &building_id,
            PaymentInput {
                unit_id: unit,
                quarter: quarter.into(),
                amount: 1000.0,
                date: common::date(2024, 5, 2),
                payment_method_id: None,
                receipt: None,
                notes: None,
            },
        )
        .await
        .unwrap();
    }

    let today = common::date(2024, 6, 1);
    let statement = unit_financials(&state, &building, &unit, RangeSelector::Year(2024), today)
        .await
        .unwrap();
    assert_eq!(statement.lines.len(), 4);
    assert_eq!(statement.total_due, 4000.0);
    assert_eq!(statement.total_paid, 2000.0);
    assert_eq!(statement.balance, -2000.0);
    assert_eq!(statement.lines[1].quarter, "Q2 2024");
    assert_eq!(statement.lines[1].paid, 1000.0);

    // Year to date stops at the quarter holding `today`.
    let ytd = unit_financials(&state, &building, &unit, RangeSelector::YearToDate, today)
        .await
        .unwrap();
    assert_eq!(ytd.total_due, 2000.0);
    assert_eq!(ytd.balance, 0.0);

    let owner = owner_financials(&state, &building, &owner_id, RangeSelector::Year(2024), today)
        .await
        .unwrap();
    assert_eq!(owner.units.len(), 1);
    assert_eq!(owner.balance, -2000.0);

    let missing = mongodb::bson::oid::ObjectId::new();
    let err = owner_financials(&state, &building, &missing, RangeSelector::Year(2024), today)
        .await
        .unwrap_err();
    assert!(matches!(domain(err), DomainError::NotFound { .. }));

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn building_overview_counts_expenses_per_quarter() {
    let Some(ctx) = common::setup_state().await else {
        return;
    };
    let state = ctx.state.clone();
    let (user, _) = common::signed_in_user(&state, "admin@example.com").await;
    let building = common::new_building(&state, &user, "Torre A").await;
    let building_id = building.id.unwrap();
    let apartment = common::unit_type_id(&state, "Apartment").await;
    let level = common::new_level(&state, &building, "Floor 1", 1).await;
    let mut input = common::unit_input("101", apartment, level, 80.0);
    input.quarterly_maintenance_fee = Some(500.0);
    let unit = common::new_unit(&state, &building, input).await;

    create_payment(
        &state,
        &building_id,
        PaymentInput {
            unit_id: unit,
            quarter: "Q1 2024".into(),
            amount: 500.0,
            date: common::date(2024, 2, 1),
            payment_method_id: None,
            receipt: None,
            notes: None,
        },
    )
    .await
    .unwrap();
    let cleaning = reference_id(&state, ReferenceKind::PayableCategories, "Cleaning").await;
    create_payable(
        &state,
        &building_id,
        PayableInput {
            category_id: cleaning,
            employee_id: None,
            service_provider_id: None,
            utility_type_id: None,
            amount: 200.0,
            date: common::date(2024, 2, 10),
            vendor: Some("Limpieza Sur".into()),
            receipt: None,
            notes: None,
        },
    )
    .await
    .unwrap();

    let overview = building_financials(
        &state,
        &building,
        RangeSelector::Year(2024),
        common::date(2024, 3, 1),
    )
    .await
    .unwrap();
    assert_eq!(overview.quarters.len(), 4);
    assert_eq!(overview.total_due, 2000.0);
    assert_eq!(overview.total_paid, 500.0);
    assert_eq!(overview.total_expenses, 200.0);
    let q1 = &overview.breakdown[0];
    assert_eq!(q1.quarter, "Q1 2024");
    assert_eq!(q1.net_cash, 300.0);
    assert_eq!(overview.breakdown[3].cumulative_net, 300.0);

    // Categories with payables cannot be removed from the reference list.
    let err = delete_reference(&state, ReferenceKind::PayableCategories, &cleaning)
        .await
        .unwrap_err();
    assert!(matches!(domain(err), DomainError::Conflict(_)));

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn recalculated_fees_split_the_budget_by_billing_area() {
    let Some(ctx) = common::setup_state().await else {
        return;
    };
    let state = ctx.state.clone();
    let (user, _) = common::signed_in_user(&state, "admin@example.com").await;
    let building = common::new_building(&state, &user, "Torre A").await;
    let building_id = building.id.unwrap();
    let apartment = common::unit_type_id(&state, "Apartment").await;
    let duplex = common::unit_type_id(&state, "Duplex").await;
    let level = common::new_level(&state, &building, "Floor 1", 1).await;

    let a = common::new_unit(&state, &building, common::unit_input("A", duplex, level, 60.0)).await;
    let b = common::new_unit(&state, &building, common::unit_input("B", apartment, level, 20.0)).await;
    let mut child = common::unit_input("A-2", apartment, level, 20.0);
    child.parent_unit_id = Some(a);
    let c = common::new_unit(&state, &building, child).await;

    let preview = preview_fees(&state, &building, None).await.unwrap();
    assert_eq!(preview.annual_budget, 12_000.0);
    // Previewing writes nothing.
    let a_doc = get_unit_by_id(&state, &building_id, &a).await.unwrap().unwrap();
    assert_eq!(a_doc.quarterly_maintenance_fee, None);

    recalculate_fees(&state, &building, None).await.unwrap();
    let fee = |id| {
        let state = state.clone();
        async move {
            get_unit_by_id(&state, &building_id, &id)
                .await
                .unwrap()
                .unwrap()
                .quarterly_maintenance_fee
        }
    };
    assert_eq!(fee(a).await, Some(2400.0));
    assert_eq!(fee(b).await, Some(600.0));
    assert_eq!(fee(c).await, None);

    // An override budget is applied and stored on the building.
    recalculate_fees(&state, &building, Some(8_000.0)).await.unwrap();
    assert_eq!(fee(a).await, Some(1600.0));
    let stored = get_building_by_id(&state, &building_id).await.unwrap().unwrap();
    assert_eq!(stored.annual_budget, Some(8_000.0));

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn salary_changes_are_kept_in_order() {
    let Some(ctx) = common::setup_state().await else {
        return;
    };
    let state = ctx.state.clone();
    let (user, _) = common::signed_in_user(&state, "admin@example.com").await;
    let building = common::new_building(&state, &user, "Torre A").await;
    let building_id = building.id.unwrap();

    let mut input = EmployeeInput {
        name: "Pedro Soto".into(),
        role: Some("Doorman".into()),
        phone: None,
        salary: 900.0,
        hire_date: Some(common::date(2024, 1, 15)),
        is_active: true,
    };
    let employee = create_employee(&state, &building_id, input.clone()).await.unwrap();

    record_salary_change(
        &state,
        &building_id,
        &employee,
        SalaryChange {
            salary: 950.0,
            effective_date: common::date(2024, 7, 1),
            notes: Some("mid-year review".into()),
        },
    )
    .await
    .unwrap();
    input.salary = 1000.0;
    update_employee(&state, &building_id, &employee, input).await.unwrap();

    let history = list_salary_history(&state, &building_id, &employee).await.unwrap();
    let salaries: Vec<f64> = history.iter().map(|h| h.salary).collect();
    assert_eq!(salaries.first(), Some(&900.0));
    assert!(salaries.contains(&950.0));
    assert_eq!(salaries.last(), Some(&1000.0));

    let salaries_category = reference_id(&state, ReferenceKind::PayableCategories, "Salaries").await;
    create_payable(
        &state,
        &building_id,
        PayableInput {
            category_id: salaries_category,
            employee_id: Some(employee),
            service_provider_id: None,
            utility_type_id: None,
            amount: 1000.0,
            date: common::date(2024, 8, 1),
            vendor: None,
            receipt: None,
            notes: None,
        },
    )
    .await
    .unwrap();
    let err = delete_employee(&state, &building_id, &employee).await.unwrap_err();
    assert!(matches!(domain(err), DomainError::Conflict(_)));

    common::teardown(Some(ctx)).await;
}
