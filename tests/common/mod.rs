#![allow(dead_code)]

use std::{
    sync::{Mutex, MutexGuard, OnceLock},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use chrono::NaiveDate;
use mongodb::bson::oid::ObjectId;

use buildingdesk::{
    config::AppConfig,
    models::{Building, ReferenceKind},
    state::{
        AppState, BuildingInput, LevelInput, UnitInput, create_building, create_level,
        create_session, create_unit, create_user, get_building_by_id, init_state, list_reference,
    },
    totp::generate_base32_secret_n,
};

/// Global lock so integration tests that mutate the DB run one-at-a-time.
static TEST_DB_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

pub struct TestContext {
    pub state: AppState,
    pub db_name: String,
    _guard: MutexGuard<'static, ()>,
}

/// Fresh database per test; `None` when MongoDB is not reachable, in which
/// case the calling test returns early.
pub async fn setup_state() -> Option<TestContext> {
    let guard = TEST_DB_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    let mut config = match AppConfig::from_env() {
        Ok(c) => c,
        Err(err) => {
            eprintln!("Skipping test; bad configuration: {err:?}");
            return None;
        }
    };
    config.mongodb_db = format!(
        "buildingdesktest_{}",
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis()
    );
    config.server_selection_timeout = Duration::from_secs(2);
    config.seed_users_file = "./tests/no-seed-users.json".into();

    match init_state(&config).await {
        Ok(state) => Some(TestContext {
            state,
            db_name: config.mongodb_db,
            _guard: guard,
        }),
        Err(err) => {
            eprintln!("Skipping test; init_state failed: {err:?}");
            None
        }
    }
}

pub async fn teardown(ctx: Option<TestContext>) {
    if let Some(ctx) = ctx {
        let _ = ctx.state.client.database(&ctx.db_name).drop().await;
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Creates a user and an open session; returns (user id, token).
pub async fn signed_in_user(state: &AppState, email: &str) -> (ObjectId, String) {
    let secret = generate_base32_secret_n(20);
    let id = create_user(state, email, &secret, None).await.unwrap();
    let token = create_session(state, email).await.unwrap();
    (id, token)
}

pub async fn unit_type_id(state: &AppState, name: &str) -> ObjectId {
    list_reference(state, ReferenceKind::UnitTypes)
        .await
        .unwrap()
        .into_iter()
        .find(|t| t.name == name)
        .map(|t| t.id)
        .unwrap_or_else(|| panic!("seeded unit type {name} missing"))
}

pub fn building_input(name: &str) -> BuildingInput {
    BuildingInput {
        name: name.into(),
        address: Some("Av. Central 100".into()),
        has_basement: true,
        basement_count: 1,
        has_mezzanine: false,
        mezzanine_count: 0,
        has_penthouse: false,
        has_rooftop: true,
        typical_floor_count: 2,
        financial_start_date: date(2024, 1, 1),
        enabled_unit_type_ids: Vec::new(),
        annual_budget: Some(12_000.0),
        global_common_area: 0.0,
    }
}

pub async fn new_building(state: &AppState, owner: &ObjectId, name: &str) -> Building {
    let id = create_building(state, owner, building_input(name)).await.unwrap();
    get_building_by_id(state, &id).await.unwrap().unwrap()
}

pub async fn new_level(state: &AppState, building: &Building, name: &str, floor: i32) -> ObjectId {
    create_level(
        state,
        &building.id.unwrap(),
        LevelInput {
            name: name.into(),
            level_type: buildingdesk::models::LevelType::TypicalFloor,
            floor_number: Some(floor),
            local_common_area: 0.0,
        },
    )
    .await
    .unwrap()
}

pub fn unit_input(number: &str, unit_type: ObjectId, level: ObjectId, size: f64) -> UnitInput {
    UnitInput {
        unit_number: number.into(),
        unit_type_id: unit_type,
        level_id: level,
        size,
        quarterly_maintenance_fee: None,
        owner_id: None,
        parent_unit_id: None,
    }
}

pub async fn new_unit(state: &AppState, building: &Building, input: UnitInput) -> ObjectId {
    create_unit(state, building, input).await.unwrap()
}
