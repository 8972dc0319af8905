//! Meal type kinds
//!
//! Each kind's daily limit and calorie share come from a static table looked
//! up by tag.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MealError, Result};

/// Meal type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealTypeKind {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

/// Static facts about a meal type
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MealTypePolicy {
    pub kind: MealTypeKind,
    /// `None` means unlimited
    pub max_per_day: Option<u32>,
    /// Fraction of the daily calorie target this meal should provide
    pub recommended_calorie_share: f64,
}

const POLICY_TABLE: [MealTypePolicy; 4] = [
    MealTypePolicy {
        kind: MealTypeKind::Breakfast,
        max_per_day: Some(1),
        recommended_calorie_share: 0.25,
    },
    MealTypePolicy {
        kind: MealTypeKind::Lunch,
        max_per_day: Some(1),
        recommended_calorie_share: 0.35,
    },
    MealTypePolicy {
        kind: MealTypeKind::Dinner,
        max_per_day: Some(1),
        recommended_calorie_share: 0.30,
    },
    MealTypePolicy {
        kind: MealTypeKind::Snack,
        max_per_day: None,
        recommended_calorie_share: 0.10,
    },
];

impl MealTypeKind {
    pub const ALL: [MealTypeKind; 4] = [
        MealTypeKind::Breakfast,
        MealTypeKind::Lunch,
        MealTypeKind::Dinner,
        MealTypeKind::Snack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MealTypeKind::Breakfast => "breakfast",
            MealTypeKind::Lunch => "lunch",
            MealTypeKind::Dinner => "dinner",
            MealTypeKind::Snack => "snack",
        }
    }

    /// Parse a stored or user-supplied name; unknown names are an error
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "breakfast" => Ok(MealTypeKind::Breakfast),
            "lunch" => Ok(MealTypeKind::Lunch),
            "dinner" => Ok(MealTypeKind::Dinner),
            "snack" => Ok(MealTypeKind::Snack),
            other => Err(MealError::Validation(format!("Unknown meal type: {}", other))),
        }
    }

    pub fn policy(&self) -> &'static MealTypePolicy {
        // The table is indexed in declaration order of the enum
        &POLICY_TABLE[*self as usize]
    }

    pub fn max_per_day(&self) -> Option<u32> {
        self.policy().max_per_day
    }

    pub fn recommended_calorie_share(&self) -> f64 {
        self.policy().recommended_calorie_share
    }

    /// Whether another meal of this kind fits after `already_logged` today
    pub fn allows_another(&self, already_logged: u32) -> bool {
        match self.max_per_day() {
            Some(max) => already_logged < max,
            None => true,
        }
    }

    /// Calories this meal should provide for a daily target
    pub fn recommended_calories(&self, daily_target: f64) -> f64 {
        daily_target * self.recommended_calorie_share()
    }
}

impl fmt::Display for MealTypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_table_matches_kinds() {
        for kind in MealTypeKind::ALL {
            assert_eq!(kind.policy().kind, kind);
        }
        let total: f64 = MealTypeKind::ALL
            .iter()
            .map(|k| k.recommended_calorie_share())
            .sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cardinality() {
        assert!(MealTypeKind::Breakfast.allows_another(0));
        assert!(!MealTypeKind::Breakfast.allows_another(1));
        assert!(!MealTypeKind::Dinner.allows_another(3));
        assert!(MealTypeKind::Snack.allows_another(12));
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert_eq!(MealTypeKind::parse("Lunch").unwrap(), MealTypeKind::Lunch);
        assert!(matches!(MealTypeKind::parse("brunch"), Err(MealError::Validation(_))));
    }

    #[test]
    fn test_recommended_calories() {
        assert!((MealTypeKind::Lunch.recommended_calories(2000.0) - 700.0).abs() < 1e-9);
    }
}
