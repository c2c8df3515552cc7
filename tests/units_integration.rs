#[path = "common/mod.rs"]
mod common;

use buildingdesk::{
    error::DomainError,
    state::{
        OwnerInput, PaymentInput, attach_child, create_owner, create_payment, delete_owner,
        delete_unit, detach_child, get_unit_by_id, update_unit,
    },
};

fn domain(err: anyhow::Error) -> DomainError {
    err.downcast::<DomainError>().expect("expected a domain error")
}

fn owner(name: &str) -> OwnerInput {
    OwnerInput {
        name: name.into(),
        email: None,
        phone: None,
        national_id: None,
        notes: None,
    }
}

#[tokio::test]
async fn attach_and_detach_keep_both_sides_in_sync() {
    let Some(ctx) = common::setup_state().await else {
        return;
    };
    let state = ctx.state.clone();
    let (user, _) = common::signed_in_user(&state, "admin@example.com").await;
    let building = common::new_building(&state, &user, "Torre A").await;
    let building_id = building.id.unwrap();
    let duplex = common::unit_type_id(&state, "Duplex").await;
    let level_1 = common::new_level(&state, &building, "Floor 1", 1).await;
    let level_2 = common::new_level(&state, &building, "Floor 2", 2).await;
    let owner_id = create_owner(&state, &building_id, owner("Marta Gil")).await.unwrap();

    let mut lower = common::unit_input("201", duplex, level_1, 90.0);
    lower.owner_id = Some(owner_id);
    lower.quarterly_maintenance_fee = Some(800.0);
    let parent = common::new_unit(&state, &building, lower).await;

    let mut upper = common::unit_input("201-U", duplex, level_2, 40.0);
    upper.owner_id = Some(owner_id);
    upper.quarterly_maintenance_fee = Some(300.0);
    let child = common::new_unit(&state, &building, upper).await;

    attach_child(&state, &building_id, &child, &parent).await.unwrap();
    // Repeating the attach lists the child once.
    attach_child(&state, &building_id, &child, &parent).await.unwrap();

    let child_doc = get_unit_by_id(&state, &building_id, &child).await.unwrap().unwrap();
    assert_eq!(child_doc.parent_unit_id, Some(parent));
    assert_eq!(child_doc.owner_id, None);
    assert_eq!(child_doc.quarterly_maintenance_fee, None);
    let parent_doc = get_unit_by_id(&state, &building_id, &parent).await.unwrap().unwrap();
    assert_eq!(parent_doc.child_unit_ids, vec![child]);

    // Parent of a child, or a unit with children, cannot be nested further.
    let err = attach_child(&state, &building_id, &parent, &child).await.unwrap_err();
    assert!(matches!(domain(err), DomainError::Validation(_)));
    let err = attach_child(&state, &building_id, &parent, &parent).await.unwrap_err();
    assert!(matches!(domain(err), DomainError::Validation(_)));

    detach_child(&state, &building_id, &child).await.unwrap();
    let parent_doc = get_unit_by_id(&state, &building_id, &parent).await.unwrap().unwrap();
    assert!(parent_doc.child_unit_ids.is_empty());
    let child_doc = get_unit_by_id(&state, &building_id, &child).await.unwrap().unwrap();
    assert_eq!(child_doc.parent_unit_id, None);

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn update_with_parent_moves_child_between_parents() {
    let Some(ctx) = common::setup_state().await else {
        return;
    };
    let state = ctx.state.clone();
    let (user, _) = common::signed_in_user(&state, "admin@example.com").await;
    let building = common::new_building(&state, &user, "Torre A").await;
    let building_id = building.id.unwrap();
    let duplex = common::unit_type_id(&state, "Duplex").await;
    let level = common::new_level(&state, &building, "Floor 1", 1).await;

    let a = common::new_unit(&state, &building, common::unit_input("A", duplex, level, 50.0)).await;
    let b = common::new_unit(&state, &building, common::unit_input("B", duplex, level, 50.0)).await;
    let mut c_input = common::unit_input("C", duplex, level, 20.0);
    c_input.parent_unit_id = Some(a);
    let c = common::new_unit(&state, &building, c_input.clone()).await;

    let a_doc = get_unit_by_id(&state, &building_id, &a).await.unwrap().unwrap();
    assert_eq!(a_doc.child_unit_ids, vec![c]);

    c_input.parent_unit_id = Some(b);
    update_unit(&state, &building, &c, c_input).await.unwrap();

    let a_doc = get_unit_by_id(&state, &building_id, &a).await.unwrap().unwrap();
    let b_doc = get_unit_by_id(&state, &building_id, &b).await.unwrap().unwrap();
    assert!(a_doc.child_unit_ids.is_empty());
    assert_eq!(b_doc.child_unit_ids, vec![c]);

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn deleting_a_parent_releases_children() {
    let Some(ctx) = common::setup_state().await else {
        return;
    };
    let state = ctx.state.clone();
    let (user, _) = common::signed_in_user(&state, "admin@example.com").await;
    let building = common::new_building(&state, &user, "Torre A").await;
    let building_id = building.id.unwrap();
    let duplex = common::unit_type_id(&state, "Duplex").await;
    let level = common::new_level(&state, &building, "Floor 1", 1).await;

    let parent = common::new_unit(&state, &building, common::unit_input("P", duplex, level, 60.0)).await;
    let mut child_input = common::unit_input("P-2", duplex, level, 30.0);
    child_input.parent_unit_id = Some(parent);
    let child = common::new_unit(&state, &building, child_input).await;

    delete_unit(&state, &building_id, &parent).await.unwrap();
    assert!(get_unit_by_id(&state, &building_id, &parent).await.unwrap().is_none());
    let child_doc = get_unit_by_id(&state, &building_id, &child).await.unwrap().unwrap();
    assert_eq!(child_doc.parent_unit_id, None);

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn payments_and_owners_guard_their_references() {
    let Some(ctx) = common::setup_state().await else {
        return;
    };
    let state = ctx.state.clone();
    let (user, _) = common::signed_in_user(&state, "admin@example.com").await;
    let building = common::new_building(&state, &user, "Torre A").await;
    let building_id = building.id.unwrap();
    let duplex = common::unit_type_id(&state, "Duplex").await;
    let level = common::new_level(&state, &building, "Floor 1", 1).await;
    let owner_id = create_owner(&state, &building_id, owner("Luis Pardo")).await.unwrap();

    let mut parent_input = common::unit_input("301", duplex, level, 70.0);
    parent_input.owner_id = Some(owner_id);
    parent_input.quarterly_maintenance_fee = Some(1000.0);
    let parent = common::new_unit(&state, &building, parent_input).await;
    let mut child_input = common::unit_input("301-B", duplex, level, 10.0);
    child_input.parent_unit_id = Some(parent);
    let child = common::new_unit(&state, &building, child_input).await;

    let payment = |unit_id| PaymentInput {
        unit_id,
        quarter: "Q1 2024".into(),
        amount: 1000.0,
        date: common::date(2024, 1, 15),
        payment_method_id: None,
        receipt: None,
        notes: None,
    };

    let err = create_payment(&state, &building_id, payment(child)).await.unwrap_err();
    assert!(matches!(domain(err), DomainError::Validation(_)));
    create_payment(&state, &building_id, payment(parent)).await.unwrap();

    // A unit with payments and an owner with units stay put.
    let err = delete_unit(&state, &building_id, &parent).await.unwrap_err();
    assert!(matches!(domain(err), DomainError::Conflict(_)));
    let err = delete_owner(&state, &building_id, &owner_id).await.unwrap_err();
    assert!(matches!(domain(err), DomainError::Conflict(_)));

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn units_with_payments_stay_standalone() {
    let Some(ctx) = common::setup_state().await else {
        return;
    };
    let state = ctx.state.clone();
    let (user, _) = common::signed_in_user(&state, "admin@example.com").await;
    let building = common::new_building(&state, &user, "Torre A").await;
    let building_id = building.id.unwrap();
    let duplex = common::unit_type_id(&state, "Duplex").await;
    let level = common::new_level(&state, &building, "Floor 1", 1).await;

    let parent = common::new_unit(&state, &building, common::unit_input("401", duplex, level, 80.0)).await;
    let mut paid_input = common::unit_input("402", duplex, level, 30.0);
    paid_input.quarterly_maintenance_fee = Some(500.0);
    let paid = common::new_unit(&state, &building, paid_input.clone()).await;
    create_payment(
        &state,
        &building_id,
        PaymentInput {
            unit_id: paid,
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

    let err = attach_child(&state, &building_id, &paid, &parent).await.unwrap_err();
    assert!(matches!(domain(err), DomainError::Conflict(_)));

    paid_input.parent_unit_id = Some(parent);
    let err = update_unit(&state, &building, &paid, paid_input).await.unwrap_err();
    assert!(matches!(domain(err), DomainError::Conflict(_)));

    // Nothing moved: the unit still carries its fee and the parent has no children.
    let paid_doc = get_unit_by_id(&state, &building_id, &paid).await.unwrap().unwrap();
    assert_eq!(paid_doc.parent_unit_id, None);
    assert_eq!(paid_doc.quarterly_maintenance_fee, Some(500.0));
    let parent_doc = get_unit_by_id(&state, &building_id, &parent).await.unwrap().unwrap();
    assert!(parent_doc.child_unit_ids.is_empty());

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn only_multi_level_types_take_children() {
    let Some(ctx) = common::setup_state().await else {
        return;
    };
    let state = ctx.state.clone();
    let (user, _) = common::signed_in_user(&state, "admin@example.com").await;
    let building = common::new_building(&state, &user, "Torre A").await;
    let building_id = building.id.unwrap();
    let apartment = common::unit_type_id(&state, "Apartment").await;
    let level = common::new_level(&state, &building, "Floor 1", 1).await;

    let flat = common::new_unit(&state, &building, common::unit_input("501", apartment, level, 70.0)).await;
    let storage = common::new_unit(&state, &building, common::unit_input("501-S", apartment, level, 8.0)).await;

    let err = attach_child(&state, &building_id, &storage, &flat).await.unwrap_err();
    assert!(matches!(domain(err), DomainError::Validation(_)));

    let mut child_input = common::unit_input("501-P", apartment, level, 12.0);
    child_input.parent_unit_id = Some(flat);
    let err = buildingdesk::state::create_unit(&state, &building, child_input)
        .await
        .unwrap_err();
    assert!(matches!(domain(err), DomainError::Validation(_)));

    common::teardown(Some(ctx)).await;
}
