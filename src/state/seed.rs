use anyhow::{Context, Result};
use mongodb::{
    Database, IndexModel,
    bson::{Document, doc},
    options::IndexOptions,
};
use std::{fs, path::Path};
use tracing::{info, warn};

use crate::{
    models::{ReferenceItem, SeedUser, UnitType, User},
    totp::{DEFAULT_SECRET_BYTES, generate_base32_secret_n},
};

use super::now;

const COLLECTIONS: &[&str] = &[
    "users",
    "sessions",
    "buildings",
    "levels",
    "units",
    "owners",
    "payments",
    "payables",
    "employees",
    "salary_history",
    "service_providers",
    "global_unit_types",
    "global_payable_categories",
    "global_utility_types",
    "global_payment_methods",
];

/// (name, factor, is_multi_level)
const DEFAULT_UNIT_TYPES: &[(&str, f64, bool)] = &[
    ("Apartment", 1.0, false),
    ("Duplex", 1.0, true),
    ("Shop", 1.5, false),
    ("Office", 1.2, false),
    ("Parking", 0.25, false),
    ("Storage", 0.5, false),
];

const DEFAULT_PAYABLE_CATEGORIES: &[&str] = &[
    "Maintenance",
    "Utilities",
    "Salaries",
    "Cleaning",
    "Security",
    "Insurance",
];

const DEFAULT_UTILITY_TYPES: &[&str] = &["Electricity", "Water", "Gas", "Internet"];

const DEFAULT_PAYMENT_METHODS: &[&str] = &["Cash", "Bank Transfer", "Cheque", "Card"];

pub(super) async fn is_database_empty(db: &Database) -> Result<bool> {
    let count = db.collection::<User>("users").estimated_document_count().await?;
    Ok(count == 0)
}

pub(super) async fn ensure_collections(db: &Database) -> Result<()> {
    let existing = db.list_collection_names().await?;
    for name in COLLECTIONS {
        if !existing.iter().any(|e| e == name) {
            db.create_collection(*name).await?;
        }
    }
    Ok(())
}

pub(super) async fn ensure_indexes(db: &Database) -> Result<()> {
    let unique = |keys: Document| {
        IndexModel::builder()
            .keys(keys)
            .options(IndexOptions::builder().unique(true).build())
            .build()
    };
    db.collection::<User>("users")
        .create_index(unique(doc! { "email": 1 }))
        .await?;
    db.collection::<Document>("sessions")
        .create_index(unique(doc! { "token": 1 }))
        .await?;
    for name in ["levels", "units", "owners", "payments", "payables", "employees"] {
        db.collection::<Document>(name)
            .create_index(IndexModel::builder().keys(doc! { "building_id": 1 }).build())
            .await?;
    }
    Ok(())
}

/// Fills each empty global list with its defaults.
pub(super) async fn seed_reference_data(db: &Database) -> Result<()> {
    let unit_types = db.collection::<UnitType>("global_unit_types");
    if unit_types.estimated_document_count().await? == 0 {
        let docs: Vec<UnitType> = DEFAULT_UNIT_TYPES
            .iter()
            .map(|(name, factor, is_multi_level)| UnitType {
                id: None,
                name: name.to_string(),
                factor: *factor,
                is_multi_level: *is_multi_level,
                created_at: Some(now()),
            })
            .collect();
        unit_types.insert_many(docs).await?;
        info!(collection = "global_unit_types", "seeded reference data");
    }

    for (collection, names) in [
        ("global_payable_categories", DEFAULT_PAYABLE_CATEGORIES),
        ("global_utility_types", DEFAULT_UTILITY_TYPES),
        ("global_payment_methods", DEFAULT_PAYMENT_METHODS),
    ] {
        let coll = db.collection::<ReferenceItem>(collection);
        if coll.estimated_document_count().await? > 0 {
            continue;
        }
        let docs: Vec<ReferenceItem> = names
            .iter()
            .map(|name| ReferenceItem {
                id: None,
                name: name.to_string(),
                description: None,
                created_at: Some(now()),
            })
            .collect();
        coll.insert_many(docs).await?;
        info!(collection, "seeded reference data");
    }
    Ok(())
}

pub(super) fn load_seed_users(path: &str) -> Result<Vec<SeedUser>> {
    if !Path::new(path).exists() {
        return Ok(Vec::new());
    }
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading seed users from {path}"))?;
    serde_json::from_str::<Vec<SeedUser>>(&contents)
        .with_context(|| format!("parsing seed users from {path}"))
}

pub(super) async fn seed_default_users(db: &Database, path: &str) -> Result<usize> {
    let seeds = load_seed_users(path)?;
    let users = db.collection::<User>("users");
    for seed in &seeds {
        let secret = if seed.secret.trim().is_empty() {
            let generated = generate_base32_secret_n(DEFAULT_SECRET_BYTES);
            warn!(email = %seed.email, secret = %generated, "seed user had no secret; generated one");
            generated
        } else {
            seed.secret.trim().to_string()
        };
        users
            .insert_one(User {
                id: None,
                email: seed.email.trim().to_lowercase(),
                secret,
                display_name: seed.display_name.clone(),
            })
            .await?;
    }
    Ok(seeds.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_seed_file_is_not_an_error() {
        let users = load_seed_users("./definitely/not/here.json").unwrap();
        assert!(users.is_empty());
    }

    #[test]
    fn default_lists_are_non_empty() {
        assert!(DEFAULT_UNIT_TYPES.iter().any(|(_, _, multi)| *multi));
        assert!(!DEFAULT_PAYMENT_METHODS.is_empty());
    }
}
