// state module: AppState, initialization, shared persistence helpers and
// re-exports of the per-aggregate submodules.

use anyhow::Result;
use chrono::{NaiveDate, NaiveTime};
use futures::stream::TryStreamExt;
use mongodb::{
    Client, Collection,
    bson::{DateTime, Document, doc, oid::ObjectId},
    options::ClientOptions,
};
use serde::de::DeserializeOwned;
use tracing::info;

use crate::{
    config::AppConfig,
    models::{
        Building, Employee, Level, Owner, Payable, Payment, ReferenceItem, SalaryHistory,
        ServiceProvider, Session, Unit, UnitType, User,
    },
};

mod buildings;
mod fees;
mod levels;
mod owners;
mod payables;
mod payments;
mod reference;
mod reports;
mod seed;
mod staff;
mod transfer;
mod units;
mod users;

pub use buildings::*;
pub use fees::*;
pub use levels::*;
pub use owners::*;
pub use payables::*;
pub use payments::*;
pub use reference::*;
pub use reports::*;
pub use staff::*;
pub use transfer::*;
pub use units::*;
pub use users::*;

#[derive(Debug, Clone)]
pub struct StateSettings {
    pub session_ttl_seconds: u64,
    pub use_transactions: bool,
}

#[derive(Clone)]
pub struct AppState {
    pub client: Client,
    pub settings: StateSettings,
    pub users: Collection<User>,
    pub sessions: Collection<Session>,
    pub buildings: Collection<Building>,
    pub levels: Collection<Level>,
    pub units: Collection<Unit>,
    pub owners: Collection<Owner>,
    pub payments: Collection<Payment>,
    pub payables: Collection<Payable>,
    pub employees: Collection<Employee>,
    pub salary_history: Collection<SalaryHistory>,
    pub service_providers: Collection<ServiceProvider>,
    pub unit_types: Collection<UnitType>,
    pub payable_categories: Collection<ReferenceItem>,
    pub utility_types: Collection<ReferenceItem>,
    pub payment_methods: Collection<ReferenceItem>,
}

pub async fn init_state(config: &AppConfig) -> Result<AppState> {
    let mut options = ClientOptions::parse(&config.mongodb_uri).await?;
    options.app_name = Some("buildingdesk".to_string());
    options.server_selection_timeout = Some(config.server_selection_timeout);
    let client = Client::with_options(options)?;
    let db = client.database(&config.mongodb_db);

    seed::ensure_collections(&db).await?;
    seed::ensure_indexes(&db).await?;
    seed::seed_reference_data(&db).await?;

    // Only seed users when the database has none.
    if seed::is_database_empty(&db).await? {
        let seeded = seed::seed_default_users(&db, &config.seed_users_file).await?;
        if seeded > 0 {
            info!(count = seeded, "seeded default users");
        }
    }

    Ok(AppState {
        client,
        settings: StateSettings {
            session_ttl_seconds: config.session_ttl_seconds,
            use_transactions: config.use_transactions,
        },
        users: db.collection::<User>("users"),
        sessions: db.collection::<Session>("sessions"),
        buildings: db.collection::<Building>("buildings"),
        levels: db.collection::<Level>("levels"),
        units: db.collection::<Unit>("units"),
        owners: db.collection::<Owner>("owners"),
        payments: db.collection::<Payment>("payments"),
        payables: db.collection::<Payable>("payables"),
        employees: db.collection::<Employee>("employees"),
        salary_history: db.collection::<SalaryHistory>("salary_history"),
        service_providers: db.collection::<ServiceProvider>("service_providers"),
        unit_types: db.collection::<UnitType>("global_unit_types"),
        payable_categories: db.collection::<ReferenceItem>("global_payable_categories"),
        utility_types: db.collection::<ReferenceItem>("global_utility_types"),
        payment_methods: db.collection::<ReferenceItem>("global_payment_methods"),
    })
}

/// Logical document path used in logs, mirroring the nesting the records
/// belong to (e.g. `buildings/<id>/units`).
pub fn building_path(building_id: &ObjectId, collection: &str) -> String {
    format!("buildings/{}/{}", building_id.to_hex(), collection)
}

pub fn date_to_bson(date: NaiveDate) -> DateTime {
    DateTime::from_chrono(date.and_time(NaiveTime::MIN).and_utc())
}

pub fn bson_to_date(value: DateTime) -> NaiveDate {
    value.to_chrono().date_naive()
}

pub(crate) fn now() -> DateTime {
    DateTime::now()
}

pub(crate) async fn find_all<T>(collection: &Collection<T>, filter: Document) -> Result<Vec<T>>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    let mut cursor = collection.find(filter).await?;
    let mut items = Vec::new();
    while let Some(item) = cursor.try_next().await? {
        items.push(item);
    }
    Ok(items)
}

/// Applies updates to several unit documents as one batch: inside a
/// transaction when enabled, otherwise in order. Updates must be
/// idempotent (`$set`, `$addToSet`, `$pull`) so a resubmitted request
/// converges.
pub(crate) async fn apply_unit_batch(
    state: &AppState,
    updates: Vec<(ObjectId, Document)>,
) -> Result<()> {
    if updates.is_empty() {
        return Ok(());
    }

    if !state.settings.use_transactions {
        for (id, update) in updates {
            state.units.update_one(doc! { "_id": id }, update).await?;
        }
        return Ok(());
    }

    let mut session = state.client.start_session().await?;
    session.start_transaction().await?;
    for (id, update) in updates {
        if let Err(err) = state
            .units
            .update_one(doc! { "_id": id }, update)
            .session(&mut session)
            .await
        {
            let _ = session.abort_transaction().await;
            return Err(err.into());
        }
    }
    session.commit_transaction().await?;
    Ok(())
}

pub(crate) fn clean_opt(input: Option<String>) -> Option<String> {
    input.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
