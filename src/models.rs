// models.rs
// Documents stored in MongoDB. Per-building records carry `building_id`;
// reference lists (unit types, categories, ...) are shared by all buildings.

use mongodb::bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// User definition as stored in the seed users file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedUser {
    pub email: String,
    #[serde(default)]
    pub secret: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub email: String,
    pub secret: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Session document linking a token to a user and expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub token: String,
    pub user_email: String,
    pub expires_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Building {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub has_basement: bool,
    #[serde(default)]
    pub basement_count: u32,
    #[serde(default)]
    pub has_mezzanine: bool,
    #[serde(default)]
    pub mezzanine_count: u32,
    #[serde(default)]
    pub has_penthouse: bool,
    #[serde(default)]
    pub has_rooftop: bool,
    #[serde(default)]
    pub typical_floor_count: u32,
    pub financial_start_date: DateTime,
    #[serde(default)]
    pub enabled_unit_type_ids: Vec<ObjectId>,
    /// Authenticated user that owns the building.
    pub owner_uid: ObjectId,
    #[serde(default)]
    pub annual_budget: Option<f64>,
    #[serde(default)]
    pub global_common_area: f64,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub deleted_at: Option<DateTime>,
    pub created_at: Option<DateTime>,
    pub updated_at: Option<DateTime>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LevelType {
    Basement,
    Ground,
    Mezzanine,
    TypicalFloor,
    Penthouse,
    Rooftop,
}

impl LevelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LevelType::Basement => "basement",
            LevelType::Ground => "ground",
            LevelType::Mezzanine => "mezzanine",
            LevelType::TypicalFloor => "typical_floor",
            LevelType::Penthouse => "penthouse",
            LevelType::Rooftop => "rooftop",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "basement" => Some(LevelType::Basement),
            "ground" => Some(LevelType::Ground),
            "mezzanine" => Some(LevelType::Mezzanine),
            "typical_floor" | "typical" => Some(LevelType::TypicalFloor),
            "penthouse" => Some(LevelType::Penthouse),
            "rooftop" => Some(LevelType::Rooftop),
            _ => None,
        }
    }

    /// Only typical floors carry a floor number.
    pub fn takes_floor_number(&self) -> bool {
        matches!(self, LevelType::TypicalFloor)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Level {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub building_id: ObjectId,
    pub name: String,
    pub level_type: LevelType,
    #[serde(default)]
    pub floor_number: Option<i32>,
    #[serde(default)]
    pub local_common_area: f64,
    pub created_at: Option<DateTime>,
    pub updated_at: Option<DateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub building_id: ObjectId,
    pub unit_number: String,
    pub unit_type_id: ObjectId,
    pub level_id: ObjectId,
    /// Net area in square metres.
    pub size: f64,
    #[serde(default)]
    pub quarterly_maintenance_fee: Option<f64>,
    #[serde(default)]
    pub owner_id: Option<ObjectId>,
    #[serde(default)]
    pub parent_unit_id: Option<ObjectId>,
    #[serde(default)]
    pub child_unit_ids: Vec<ObjectId>,
    pub created_at: Option<DateTime>,
    pub updated_at: Option<DateTime>,
}

impl Unit {
    pub fn is_child(&self) -> bool {
        self.parent_unit_id.is_some()
    }

    /// Child units have no billing of their own.
    pub fn clear_child_financials(&mut self) {
        if self.is_child() {
            self.owner_id = None;
            self.quarterly_maintenance_fee = None;
        }
    }

    /// Returns false when the child was already listed.
    pub fn add_child(&mut self, child_id: ObjectId) -> bool {
        if self.child_unit_ids.contains(&child_id) {
            return false;
        }
        self.child_unit_ids.push(child_id);
        true
    }

    pub fn remove_child(&mut self, child_id: &ObjectId) -> bool {
        let before = self.child_unit_ids.len();
        self.child_unit_ids.retain(|id| id != child_id);
        before != self.child_unit_ids.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Owner {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub building_id: ObjectId,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub national_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: Option<DateTime>,
    pub updated_at: Option<DateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub building_id: ObjectId,
    pub unit_id: ObjectId,
    /// Quarter label, e.g. "Q1 2024".
    pub quarter: String,
    pub amount: f64,
    pub date: DateTime,
    #[serde(default)]
    pub payment_method_id: Option<ObjectId>,
    #[serde(default)]
    pub receipt: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: Option<DateTime>,
    pub updated_at: Option<DateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payable {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub building_id: ObjectId,
    pub category_id: ObjectId,
    #[serde(default)]
    pub employee_id: Option<ObjectId>,
    #[serde(default)]
    pub service_provider_id: Option<ObjectId>,
    #[serde(default)]
    pub utility_type_id: Option<ObjectId>,
    pub amount: f64,
    pub date: DateTime,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub receipt: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: Option<DateTime>,
    pub updated_at: Option<DateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub building_id: ObjectId,
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub salary: f64,
    #[serde(default)]
    pub hire_date: Option<DateTime>,
    pub is_active: bool,
    pub created_at: Option<DateTime>,
    pub updated_at: Option<DateTime>,
}

/// Append-only record of an employee salary change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalaryHistory {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub building_id: ObjectId,
    pub employee_id: ObjectId,
    #[serde(default)]
    pub previous_salary: Option<f64>,
    pub salary: f64,
    pub effective_date: DateTime,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: Option<DateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceProvider {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub building_id: ObjectId,
    pub name: String,
    #[serde(default)]
    pub service_type: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub contract_amount: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: Option<DateTime>,
    pub updated_at: Option<DateTime>,
}

/// Global unit type; `factor` weights the unit's billing area.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitType {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    #[serde(default = "default_factor")]
    pub factor: f64,
    #[serde(default)]
    pub is_multi_level: bool,
    pub created_at: Option<DateTime>,
}

fn default_factor() -> f64 {
    1.0
}

/// Entry of the plain global lists (payable categories, utility types,
/// payment methods).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceItem {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: Option<DateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    UnitTypes,
    PayableCategories,
    UtilityTypes,
    PaymentMethods,
}

impl ReferenceKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "unit-types" | "unit_types" => Some(ReferenceKind::UnitTypes),
            "payable-categories" | "payable_categories" => Some(ReferenceKind::PayableCategories),
            "utility-types" | "utility_types" => Some(ReferenceKind::UtilityTypes),
            "payment-methods" | "payment_methods" => Some(ReferenceKind::PaymentMethods),
            _ => None,
        }
    }

    pub fn collection(&self) -> &'static str {
        match self {
            ReferenceKind::UnitTypes => "global_unit_types",
            ReferenceKind::PayableCategories => "global_payable_categories",
            ReferenceKind::UtilityTypes => "global_utility_types",
            ReferenceKind::PaymentMethods => "global_payment_methods",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit() -> Unit {
        Unit {
            id: Some(ObjectId::new()),
            building_id: ObjectId::new(),
            unit_number: "101".into(),
            unit_type_id: ObjectId::new(),
            level_id: ObjectId::new(),
            size: 80.0,
            quarterly_maintenance_fee: Some(1200.0),
            owner_id: Some(ObjectId::new()),
            parent_unit_id: None,
            child_unit_ids: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn repeated_attach_lists_child_once() {
        let mut parent = unit();
        let child = ObjectId::new();
        assert!(parent.add_child(child));
        assert!(!parent.add_child(child));
        assert_eq!(parent.child_unit_ids, vec![child]);
        assert!(parent.remove_child(&child));
        assert!(parent.child_unit_ids.is_empty());
        assert!(!parent.remove_child(&child));
    }

    #[test]
    fn child_financials_are_cleared() {
        let mut u = unit();
        u.clear_child_financials();
        assert!(u.owner_id.is_some());

        u.parent_unit_id = Some(ObjectId::new());
        u.clear_child_financials();
        assert!(u.owner_id.is_none());
        assert!(u.quarterly_maintenance_fee.is_none());
    }

    #[test]
    fn level_type_spellings() {
        assert_eq!(LevelType::parse("Typical Floor"), Some(LevelType::TypicalFloor));
        assert_eq!(LevelType::parse("rooftop"), Some(LevelType::Rooftop));
        assert_eq!(LevelType::parse("attic"), None);
        assert!(LevelType::TypicalFloor.takes_floor_number());
        assert!(!LevelType::Ground.takes_floor_number());
    }
}
