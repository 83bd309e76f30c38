//! # Categorizer
//! Assigns each resource one category from its lower-cased name.
//!
//! Rules are an ordered list evaluated top-down; the first rule with a
//! substring hit wins. A name containing both "senior" and "meal" is `meals`.

use crate::resource::Category;

/// Ordered (needles, category) rules. Order is load-bearing.
const RULES: &[(&[&str], Category)] = &[
    (&["meal", "kitchen", "soup"], Category::Meals),
    (
        &["pantry", "food bank", "grocery", "produce"],
        Category::Groceries,
    ),
    (&["senior", "wheels"], Category::Senior),
    (&["baby", "infant", "family"], Category::BabyFood),
];

/// Classify a resource by its name. Falls back to `General`.
pub fn categorize_name(name: &str) -> Category {
    let lower = name.to_lowercase();
    RULES
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| lower.contains(n)))
        .map(|(_, cat)| *cat)
        .unwrap_or(Category::General)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meals_rule_wins_over_senior() {
        assert_eq!(
            categorize_name("Downtown Soup Kitchen & Senior Meals"),
            Category::Meals
        );
    }

    #[test]
    fn each_rule_matches_case_insensitively() {
        assert_eq!(categorize_name("Westside Food Pantry"), Category::Groceries);
        assert_eq!(categorize_name("LA Regional FOOD BANK"), Category::Groceries);
        assert_eq!(categorize_name("Fresh Produce Market"), Category::Groceries);
        assert_eq!(categorize_name("Meals on Wheels West"), Category::Meals);
        assert_eq!(categorize_name("Wheels of Hope"), Category::Senior);
        assert_eq!(categorize_name("Eastside Senior Center"), Category::Senior);
        assert_eq!(categorize_name("Family Resource Hub"), Category::BabyFood);
        assert_eq!(categorize_name("Infant Formula Closet"), Category::BabyFood);
    }

    #[test]
    fn groceries_rule_precedes_baby_food() {
        // "family" would be baby_food, but "pantry" is checked first.
        assert_eq!(categorize_name("Family Pantry"), Category::Groceries);
    }

    #[test]
    fn unmatched_and_empty_names_are_general() {
        assert_eq!(categorize_name("Community Fridge #4"), Category::General);
        assert_eq!(categorize_name(""), Category::General);
    }
}
