//! Boss HP arithmetic.
//!
//! Pure clamp math for the HP ledger; the route layer pairs these with the
//! optimistic-versioned writes in `db::bosses`. Invariant: `current_hp`
//! always lands in `[0, total_hp]`, whatever damage or restore is applied.

/// HP remaining after taking damage. Never drops below zero.
pub fn apply_damage(current_hp: i64, damage: i64) -> i64 {
    (current_hp - damage.max(0)).max(0)
}

/// HP remaining after restoring (quest reopened or deleted before defeat).
/// Never exceeds the pool's total.
pub fn restore_hp(current_hp: i64, total_hp: i64, amount: i64) -> i64 {
    (current_hp + amount.max(0)).min(total_hp)
}

pub fn is_defeated(current_hp: i64) -> bool {
    current_hp <= 0
}

/// A boss must be seeded with at least one point of plannable damage.
/// `quest_damages` are the per-quest damage values created alongside it.
pub fn validate_seed(quest_damages: &[i64]) -> Result<i64, SeedError> {
    if quest_damages.iter().any(|d| *d < 0) {
        return Err(SeedError::NegativeDamage);
    }
    let total: i64 = quest_damages.iter().sum();
    if total <= 0 {
        return Err(SeedError::EmptyPool);
    }
    Ok(total)
}

#[derive(Debug, PartialEq, Eq)]
pub enum SeedError {
    /// Quest damages sum to zero; the boss would be unkillable.
    EmptyPool,
    NegativeDamage,
}

impl std::fmt::Display for SeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeedError::EmptyPool => {
                write!(f, "boss must be created with quests dealing at least 1 total damage")
            }
            SeedError::NegativeDamage => write!(f, "quest damage cannot be negative"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn damage_clamps_at_zero() {
        assert_eq!(apply_damage(10, 4), 6);
        assert_eq!(apply_damage(10, 10), 0);
        assert_eq!(apply_damage(10, 999), 0);
    }

    #[test]
    fn negative_damage_is_ignored() {
        assert_eq!(apply_damage(10, -5), 10);
        assert_eq!(restore_hp(5, 10, -5), 5);
    }

    #[test]
    fn restore_clamps_at_total() {
        assert_eq!(restore_hp(5, 10, 3), 8);
        assert_eq!(restore_hp(5, 10, 5), 10);
        assert_eq!(restore_hp(5, 10, 999), 10);
    }

    #[test]
    fn defeat_at_exactly_zero() {
        assert!(is_defeated(0));
        assert!(!is_defeated(1));
    }

    #[test]
    fn seed_requires_positive_total() {
        assert_eq!(validate_seed(&[10, 5]), Ok(15));
        assert_eq!(validate_seed(&[0, 0]), Err(SeedError::EmptyPool));
        assert_eq!(validate_seed(&[]), Err(SeedError::EmptyPool));
        assert_eq!(validate_seed(&[10, -1]), Err(SeedError::NegativeDamage));
    }
}
