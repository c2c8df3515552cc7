// levels.rs
// Default level list derived from a building's structure flags.

use serde::Serialize;

use crate::models::{Building, LevelType};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedLevel {
    pub name: String,
    pub level_type: LevelType,
    pub floor_number: Option<i32>,
}

impl PlannedLevel {
    fn new(name: impl Into<String>, level_type: LevelType, floor_number: Option<i32>) -> Self {
        PlannedLevel {
            name: name.into(),
            level_type,
            floor_number,
        }
    }
}

/// Levels bottom to top: basements (deepest first), ground, mezzanines,
/// typical floors, penthouse, rooftop.
pub fn default_level_plan(building: &Building) -> Vec<PlannedLevel> {
    let mut plan = Vec::new();

    if building.has_basement {
        let count = building.basement_count.max(1);
        for n in (1..=count).rev() {
            plan.push(PlannedLevel::new(format!("B{n}"), LevelType::Basement, None));
        }
    }

    plan.push(PlannedLevel::new("Ground", LevelType::Ground, None));

    if building.has_mezzanine {
        let count = building.mezzanine_count.max(1);
        if count == 1 {
            plan.push(PlannedLevel::new("Mezzanine", LevelType::Mezzanine, None));
        } else {
            for n in 1..=count {
                plan.push(PlannedLevel::new(
                    format!("Mezzanine {n}"),
                    LevelType::Mezzanine,
                    None,
                ));
            }
        }
    }

    for floor in 1..=building.typical_floor_count {
        let Ok(number) = i32::try_from(floor) else {
            break;
        };
        plan.push(PlannedLevel::new(
            format!("Floor {floor}"),
            LevelType::TypicalFloor,
            Some(number),
        ));
    }

    if building.has_penthouse {
        plan.push(PlannedLevel::new("Penthouse", LevelType::Penthouse, None));
    }
    if building.has_rooftop {
        plan.push(PlannedLevel::new("Rooftop", LevelType::Rooftop, None));
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{DateTime, oid::ObjectId};

    fn building() -> Building {
        Building {
            id: None,
            name: "Torre Norte".into(),
            address: None,
            has_basement: false,
            basement_count: 0,
            has_mezzanine: false,
            mezzanine_count: 0,
            has_penthouse: false,
            has_rooftop: false,
            typical_floor_count: 0,
            financial_start_date: DateTime::now(),
            enabled_unit_type_ids: Vec::new(),
            owner_uid: ObjectId::new(),
            annual_budget: None,
            global_common_area: 0.0,
            is_deleted: false,
            deleted_at: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn bare_building_has_ground_only() {
        let plan = default_level_plan(&building());
        assert_eq!(plan, vec![PlannedLevel::new("Ground", LevelType::Ground, None)]);
    }

    #[test]
    fn full_structure_is_ordered_bottom_up() {
        let mut b = building();
        b.has_basement = true;
        b.basement_count = 2;
        b.has_mezzanine = true;
        b.mezzanine_count = 1;
        b.typical_floor_count = 3;
        b.has_penthouse = true;
        b.has_rooftop = true;

        let names: Vec<String> = default_level_plan(&b).into_iter().map(|l| l.name).collect();
        assert_eq!(
            names,
            vec![
                "B2", "B1", "Ground", "Mezzanine", "Floor 1", "Floor 2", "Floor 3", "Penthouse",
                "Rooftop"
            ]
        );
    }

    #[test]
    fn only_typical_floors_are_numbered() {
        let mut b = building();
        b.typical_floor_count = 2;
        b.has_rooftop = true;
        for level in default_level_plan(&b) {
            assert_eq!(level.floor_number.is_some(), level.level_type.takes_floor_number());
        }
    }
}
