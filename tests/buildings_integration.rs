#[path = "common/mod.rs"]
mod common;

use buildingdesk::{
    error::DomainError,
    state::{
        generate_default_levels, get_building_by_id, list_active_buildings,
        list_deleted_buildings, list_levels, purge_building, restore_building,
        soft_delete_building, update_building,
    },
};

fn domain(err: anyhow::Error) -> DomainError {
    err.downcast::<DomainError>().expect("expected a domain error")
}

#[tokio::test]
async fn recycle_bin_lifecycle() {
    let Some(ctx) = common::setup_state().await else {
        return;
    };
    let state = ctx.state.clone();
    let (owner, _) = common::signed_in_user(&state, "admin@example.com").await;

    let keep = common::new_building(&state, &owner, "Torre A").await;
    let binned = common::new_building(&state, &owner, "Torre B").await;
    let binned_id = binned.id.unwrap();

    // Purge refuses buildings that are still active.
    let err = purge_building(&state, &binned_id).await.unwrap_err();
    assert!(matches!(domain(err), DomainError::Conflict(_)));

    soft_delete_building(&state, &binned_id).await.unwrap();
    let active = list_active_buildings(&state, &owner).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, keep.id);
    let bin = list_deleted_buildings(&state, &owner).await.unwrap();
    assert_eq!(bin.len(), 1);
    assert!(bin[0].deleted_at.is_some());

    restore_building(&state, &binned_id).await.unwrap();
    assert_eq!(list_active_buildings(&state, &owner).await.unwrap().len(), 2);
    let err = restore_building(&state, &binned_id).await.unwrap_err();
    assert!(matches!(domain(err), DomainError::Conflict(_)));

    soft_delete_building(&state, &binned_id).await.unwrap();
    purge_building(&state, &binned_id).await.unwrap();
    assert!(get_building_by_id(&state, &binned_id).await.unwrap().is_none());
    assert!(list_deleted_buildings(&state, &owner).await.unwrap().is_empty());

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn buildings_are_scoped_to_their_owner() {
    let Some(ctx) = common::setup_state().await else {
        return;
    };
    let state = ctx.state.clone();
    let (alice, _) = common::signed_in_user(&state, "alice@example.com").await;
    let (bob, _) = common::signed_in_user(&state, "bob@example.com").await;

    common::new_building(&state, &alice, "Edificio Sol").await;
    assert_eq!(list_active_buildings(&state, &alice).await.unwrap().len(), 1);
    assert!(list_active_buildings(&state, &bob).await.unwrap().is_empty());

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn generated_levels_follow_structure_flags() {
    let Some(ctx) = common::setup_state().await else {
        return;
    };
    let state = ctx.state.clone();
    let (owner, _) = common::signed_in_user(&state, "admin@example.com").await;
    let building = common::new_building(&state, &owner, "Torre A").await;

    // One basement, ground, two typical floors, rooftop.
    let created = generate_default_levels(&state, &building).await.unwrap();
    assert_eq!(created.len(), 5);

    // Running again skips names that already exist.
    let again = generate_default_levels(&state, &building).await.unwrap();
    assert!(again.is_empty());
    let levels = list_levels(&state, &building.id.unwrap()).await.unwrap();
    assert_eq!(levels.len(), 5);

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn unit_type_in_use_cannot_be_disabled() {
    let Some(ctx) = common::setup_state().await else {
        return;
    };
    let state = ctx.state.clone();
    let (owner, _) = common::signed_in_user(&state, "admin@example.com").await;
    let apartment = common::unit_type_id(&state, "Apartment").await;
    let shop = common::unit_type_id(&state, "Shop").await;

    let mut input = common::building_input("Torre A");
    input.enabled_unit_type_ids = vec![apartment, shop];
    let building_id = buildingdesk::state::create_building(&state, &owner, input.clone())
        .await
        .unwrap();
    let building = get_building_by_id(&state, &building_id).await.unwrap().unwrap();
    let level = common::new_level(&state, &building, "Floor 1", 1).await;
    common::new_unit(&state, &building, common::unit_input("101", apartment, level, 80.0)).await;

    // A disabled type cannot be used for new units.
    let mut only_apartments = input.clone();
    only_apartments.enabled_unit_type_ids = vec![apartment];
    update_building(&state, &building_id, only_apartments).await.unwrap();
    let building = get_building_by_id(&state, &building_id).await.unwrap().unwrap();
    let err = buildingdesk::state::create_unit(
        &state,
        &building,
        common::unit_input("L1", shop, level, 40.0),
    )
    .await
    .unwrap_err();
    assert!(matches!(domain(err), DomainError::Validation(_)));

    // Apartment is used by unit 101.
    let mut only_shops = input;
    only_shops.enabled_unit_type_ids = vec![shop];
    let err = update_building(&state, &building_id, only_shops).await.unwrap_err();
    assert!(matches!(domain(err), DomainError::Conflict(_)));

    common::teardown(Some(ctx)).await;
}
