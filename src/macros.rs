//! Macro allocation
//!
//! Macro gram targets from a calorie budget and a percent split, per-macro
//! credit and remaining amounts, and the 4/4/9 energy identity used to fill in
//! one missing value of a food entry:
//!
//! > calories = 4 * protein + 4 * carbs + 9 * fat + 7 * alcohol

use crate::error::ComputeError;
use crate::types::{MacroBudget, MacroEntry, MacroSplit, MacroTargets};

pub const PROTEIN_KCAL_PER_GRAM: f64 = 4.0;
pub const CARB_KCAL_PER_GRAM: f64 = 4.0;
pub const FAT_KCAL_PER_GRAM: f64 = 9.0;
pub const ALCOHOL_KCAL_PER_GRAM: f64 = 7.0;

/// Grams of pure alcohol in one standard drink
pub const ALCOHOL_GRAMS_PER_STANDARD_DRINK: f64 = 14.0;

/// Tolerance when checking that a full split sums to 100
pub const SPLIT_EPSILON: f64 = 0.01;

/// Convert standard drinks to grams of alcohol
pub fn standard_drinks_to_grams(drinks: f64) -> f64 {
    drinks * ALCOHOL_GRAMS_PER_STANDARD_DRINK
}

impl MacroSplit {
    /// Check each percentage is in [0, 100] and a complete split sums to 100
    pub fn validate(&self) -> Result<(), ComputeError> {
        let supplied = [
            ("protein", self.protein_pct),
            ("carb", self.carb_pct),
            ("fat", self.fat_pct),
        ];

        for (name, pct) in supplied {
            if let Some(pct) = pct {
                if !pct.is_finite() || !(0.0..=100.0).contains(&pct) {
                    return Err(ComputeError::InvalidSplit(format!(
                        "{name} percentage {pct} is outside 0-100"
                    )));
                }
            }
        }

        if let (Some(p), Some(c), Some(f)) = (self.protein_pct, self.carb_pct, self.fat_pct) {
            let total = p + c + f;
            if (total - 100.0).abs() > SPLIT_EPSILON {
                return Err(ComputeError::InvalidSplit(format!(
                    "percentages sum to {total}, expected 100"
                )));
            }
        }

        Ok(())
    }
}

impl MacroEntry {
    /// Energy from the macros, when protein, carbs and fat are all known
    pub fn calories_from_macros(&self) -> Option<f64> {
        let (p, c, f) = (self.protein_grams?, self.carb_grams?, self.fat_grams?);
        Some(
            p * PROTEIN_KCAL_PER_GRAM
                + c * CARB_KCAL_PER_GRAM
                + f * FAT_KCAL_PER_GRAM
                + self.alcohol_grams.unwrap_or(0.0) * ALCOHOL_KCAL_PER_GRAM,
        )
    }

    /// Number of missing values among calories, protein, carbs and fat
    pub fn missing_count(&self) -> usize {
        [
            self.calories,
            self.protein_grams,
            self.carb_grams,
            self.fat_grams,
        ]
        .iter()
        .filter(|v| v.is_none())
        .count()
    }
}

/// Macro target allocation and derivation
pub struct MacroAllocator;

impl MacroAllocator {
    /// Gram targets for each macro that has a percentage.
    ///
    /// The split is never renormalised: a complete split that does not sum to
    /// 100 is rejected.
    pub fn allocate(calorie_budget: f64, split: &MacroSplit) -> Result<MacroTargets, ComputeError> {
        split.validate()?;

        let grams = |pct: Option<f64>, kcal_per_gram: f64| {
            pct.map(|pct| calorie_budget * pct / 100.0 / kcal_per_gram)
        };

        Ok(MacroTargets {
            protein_grams: grams(split.protein_pct, PROTEIN_KCAL_PER_GRAM),
            carb_grams: grams(split.carb_pct, CARB_KCAL_PER_GRAM),
            fat_grams: grams(split.fat_pct, FAT_KCAL_PER_GRAM),
        })
    }

    /// Fill in the single missing value of an entry.
    ///
    /// Calories are derived from the three macros; a missing macro is derived
    /// from calories and the other two. More than one missing value is an error.
    pub fn derive_missing(entry: &MacroEntry) -> Result<MacroEntry, ComputeError> {
        let missing = entry.missing_count();
        if missing > 1 {
            return Err(ComputeError::UnderdeterminedMacros { missing });
        }

        let alcohol_kcal = entry.alcohol_grams.unwrap_or(0.0) * ALCOHOL_KCAL_PER_GRAM;
        let mut derived = *entry;

        match (
            entry.calories,
            entry.protein_grams,
            entry.carb_grams,
            entry.fat_grams,
        ) {
            (None, Some(_), Some(_), Some(_)) => {
                derived.calories = entry.calories_from_macros();
            }
            (Some(kcal), None, Some(c), Some(f)) => {
                derived.protein_grams = Some(
                    (kcal - c * CARB_KCAL_PER_GRAM - f * FAT_KCAL_PER_GRAM - alcohol_kcal)
                        / PROTEIN_KCAL_PER_GRAM,
                );
            }
            (Some(kcal), Some(p), None, Some(f)) => {
                derived.carb_grams = Some(
                    (kcal - p * PROTEIN_KCAL_PER_GRAM - f * FAT_KCAL_PER_GRAM - alcohol_kcal)
                        / CARB_KCAL_PER_GRAM,
                );
            }
            (Some(kcal), Some(p), Some(c), None) => {
                derived.fat_grams = Some(
                    (kcal - p * PROTEIN_KCAL_PER_GRAM - c * CARB_KCAL_PER_GRAM - alcohol_kcal)
                        / FAT_KCAL_PER_GRAM,
                );
            }
            // Complete entry
            _ => {}
        }

        Ok(derived)
    }

    /// Calories of an entry, derived from its macros when not logged explicitly
    pub fn derive_missing_calories(entry: &MacroEntry) -> Option<f64> {
        entry.calories.or_else(|| entry.calories_from_macros())
    }

    /// Grams left per targeted macro; macros without a target stay `None`
    pub fn remaining(targets: &MacroTargets, consumed: &MacroTargets) -> MacroTargets {
        combine(targets, consumed, |target, eaten| {
            target.map(|t| t - eaten.unwrap_or(0.0))
        })
    }

    /// Today's per-macro budget.
    ///
    /// Each targeted macro earns `target - smoothed intake` as credit, spread
    /// over the days left in the cycle. A macro with no smoothed history earns
    /// no credit.
    pub fn budget(
        targets: &MacroTargets,
        smoothed_intake: &MacroTargets,
        consumed_today: &MacroTargets,
        days_left_in_cycle: u32,
    ) -> MacroBudget {
        let days_left = days_left_in_cycle.max(1) as f64;

        let credit = combine(targets, smoothed_intake, |target, smoothed| {
            target.map(|t| smoothed.map_or(0.0, |s| t - s))
        });
        let adjusted = combine(targets, &credit, |target, credit| {
            target.map(|t| t + credit.unwrap_or(0.0) / days_left)
        });

        MacroBudget {
            targets: *targets,
            smoothed_intake: *smoothed_intake,
            credit,
            remaining: Self::remaining(&adjusted, consumed_today),
            adjusted,
        }
    }
}

fn combine(
    left: &MacroTargets,
    right: &MacroTargets,
    f: impl Fn(Option<f64>, Option<f64>) -> Option<f64>,
) -> MacroTargets {
    MacroTargets {
        protein_grams: f(left.protein_grams, right.protein_grams),
        carb_grams: f(left.carb_grams, right.carb_grams),
        fat_grams: f(left.fat_grams, right.fat_grams),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("value should be present");
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_allocate_full_split() {
        let targets = MacroAllocator::allocate(2000.0, &MacroSplit::new(40.0, 30.0, 30.0)).unwrap();

        assert_close(targets.protein_grams, 200.0);
        assert_close(targets.carb_grams, 150.0);
        assert_close(targets.fat_grams, 2000.0 * 0.30 / 9.0);
    }

    #[test]
    fn test_allocate_partial_split() {
        let split = MacroSplit {
            protein_pct: Some(30.0),
            ..Default::default()
        };
        let targets = MacroAllocator::allocate(1800.0, &split).unwrap();

        assert_close(targets.protein_grams, 135.0);
        assert_eq!(targets.carb_grams, None);
        assert_eq!(targets.fat_grams, None);
    }

    #[test]
    fn test_allocate_rejects_inconsistent_split() {
        let result = MacroAllocator::allocate(2000.0, &MacroSplit::new(40.0, 40.0, 30.0));
        assert!(matches!(result, Err(ComputeError::InvalidSplit(_))));

        let negative = MacroSplit {
            fat_pct: Some(-5.0),
            ..Default::default()
        };
        assert!(MacroAllocator::allocate(2000.0, &negative).is_err());
    }

    #[test]
    fn test_allocate_accepts_rounding_within_epsilon() {
        let split = MacroSplit::new(33.333, 33.333, 33.334);
        assert!(MacroAllocator::allocate(2000.0, &split).is_ok());
    }

    #[test]
    fn test_derive_missing_fat_round_trip() {
        let (p, c, f) = (150.0, 200.0, 60.0);
        let entry = MacroEntry {
            calories: Some(4.0 * p + 4.0 * c + 9.0 * f),
            protein_grams: Some(p),
            carb_grams: Some(c),
            fat_grams: None,
            alcohol_grams: None,
        };

        let derived = MacroAllocator::derive_missing(&entry).unwrap();
        assert_close(derived.fat_grams, f);
    }

    #[test]
    fn test_derive_missing_protein_and_carbs() {
        let base = MacroEntry {
            calories: Some(1000.0),
            protein_grams: Some(50.0),
            carb_grams: Some(100.0),
            fat_grams: Some(40.0),
            alcohol_grams: None,
        };

        let no_protein = MacroEntry {
            protein_grams: None,
            ..base
        };
        assert_close(MacroAllocator::derive_missing(&no_protein).unwrap().protein_grams, 60.0);

        let no_carbs = MacroEntry {
            carb_grams: None,
            ..base
        };
        assert_close(MacroAllocator::derive_missing(&no_carbs).unwrap().carb_grams, 110.0);
    }

    #[test]
    fn test_derive_calories_from_macros() {
        let entry = MacroEntry {
            calories: None,
            protein_grams: Some(30.0),
            carb_grams: Some(50.0),
            fat_grams: Some(10.0),
            alcohol_grams: Some(standard_drinks_to_grams(1.0)),
        };

        // 120 + 200 + 90 + 98
        assert_close(MacroAllocator::derive_missing(&entry).unwrap().calories, 508.0);
        assert_close(MacroAllocator::derive_missing_calories(&entry), 508.0);
    }

    #[test]
    fn test_alcohol_is_a_known_term() {
        let entry = MacroEntry {
            calories: Some(400.0),
            protein_grams: Some(10.0),
            carb_grams: Some(20.0),
            fat_grams: None,
            alcohol_grams: Some(28.0),
        };

        // 400 - 40 - 80 - 196 = 84 kcal of fat
        assert_close(MacroAllocator::derive_missing(&entry).unwrap().fat_grams, 84.0 / 9.0);
    }

    #[test]
    fn test_underdetermined_entry() {
        let entry = MacroEntry {
            calories: Some(500.0),
            protein_grams: Some(20.0),
            ..Default::default()
        };

        assert!(matches!(
            MacroAllocator::derive_missing(&entry),
            Err(ComputeError::UnderdeterminedMacros { missing: 2 })
        ));
        assert_eq!(MacroAllocator::derive_missing_calories(&entry), Some(500.0));

        let bare = MacroEntry {
            protein_grams: Some(20.0),
            ..Default::default()
        };
        assert_eq!(MacroAllocator::derive_missing_calories(&bare), None);
    }

    #[test]
    fn test_complete_entry_unchanged() {
        let entry = MacroEntry {
            calories: Some(450.0),
            protein_grams: Some(30.0),
            carb_grams: Some(40.0),
            fat_grams: Some(10.0),
            alcohol_grams: None,
        };
        assert_eq!(MacroAllocator::derive_missing(&entry).unwrap(), entry);
    }

    #[test]
    fn test_remaining_macros() {
        let targets = MacroTargets {
            protein_grams: Some(150.0),
            carb_grams: Some(200.0),
            fat_grams: None,
        };
        let consumed = MacroTargets {
            protein_grams: Some(90.0),
            carb_grams: None,
            fat_grams: Some(40.0),
        };

        let left = MacroAllocator::remaining(&targets, &consumed);
        assert_eq!(left.protein_grams, Some(60.0));
        assert_eq!(left.carb_grams, Some(200.0));
        assert_eq!(left.fat_grams, None);
    }

    #[test]
    fn test_macro_budget_spreads_credit() {
        let targets = MacroTargets {
            protein_grams: Some(150.0),
            carb_grams: Some(200.0),
            fat_grams: None,
        };
        let smoothed = MacroTargets {
            protein_grams: Some(120.0),
            carb_grams: None,
            fat_grams: Some(50.0),
        };
        let consumed = MacroTargets {
            protein_grams: Some(40.0),
            ..Default::default()
        };

        let budget = MacroAllocator::budget(&targets, &smoothed, &consumed, 3);

        assert_close(budget.credit.protein_grams, 30.0);
        // No history for carbs: no credit either way
        assert_close(budget.credit.carb_grams, 0.0);
        assert_eq!(budget.credit.fat_grams, None);

        assert_close(budget.adjusted.protein_grams, 160.0);
        assert_close(budget.adjusted.carb_grams, 200.0);
        assert_eq!(budget.adjusted.fat_grams, None);

        assert_close(budget.remaining.protein_grams, 120.0);
        assert_close(budget.remaining.carb_grams, 200.0);
        assert_eq!(budget.remaining.fat_grams, None);
        assert_eq!(budget.targets, targets);
    }

    #[test]
    fn test_macro_overeating_lowers_adjusted_budget() {
        let targets = MacroTargets {
            fat_grams: Some(60.0),
            ..Default::default()
        };
        let smoothed = MacroTargets {
            fat_grams: Some(80.0),
            ..Default::default()
        };

        // Last day of the cycle takes the whole debt
        let last_day = MacroAllocator::budget(&targets, &smoothed, &MacroTargets::default(), 1);
        assert_close(last_day.adjusted.fat_grams, 40.0);

        // Zero days left is treated as one
        let clamped = MacroAllocator::budget(&targets, &smoothed, &MacroTargets::default(), 0);
        assert_eq!(clamped, last_day);
    }
}
