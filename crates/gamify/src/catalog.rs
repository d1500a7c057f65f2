//! Built-in achievement catalog.
//!
//! Seeded into the store by `questlog init`; the engine loads whatever
//! the store holds, so deployments can extend or replace this set.

use questlog_core::{AchievementDefinition, AchievementId, Condition, ModuleId};

fn def(
    slug: &str,
    name: &str,
    description: &str,
    xp_reward: u64,
    condition: Condition,
) -> AchievementDefinition {
    AchievementDefinition {
        id: AchievementId::new(slug),
        name: name.to_string(),
        description: description.to_string(),
        xp_reward,
        condition,
    }
}

/// The default achievement set.
pub fn default_catalog() -> Vec<AchievementDefinition> {
    vec![
        def(
            "first-goal",
            "First Steps",
            "Create your first goal",
            25,
            Condition::GoalsCreated { count: 1 },
        ),
        def(
            "goal-setter",
            "Goal Setter",
            "Create 10 goals",
            50,
            Condition::GoalsCreated { count: 10 },
        ),
        def(
            "finisher",
            "Finisher",
            "Complete your first goal",
            50,
            Condition::GoalsCompleted { count: 1 },
        ),
        def(
            "goal-getter",
            "Goal Getter",
            "Complete 10 goals",
            150,
            Condition::GoalsCompleted { count: 10 },
        ),
        def(
            "completionist",
            "Completionist",
            "Complete 50 goals",
            500,
            Condition::GoalsCompleted { count: 50 },
        ),
        def(
            "fitness-fanatic",
            "Fitness Fanatic",
            "Complete 10 fitness goals",
            200,
            Condition::ModuleGoalsCompleted {
                module: ModuleId::new("fitness"),
                count: 10,
            },
        ),
        def(
            "lifelong-learner",
            "Lifelong Learner",
            "Complete 10 learning goals",
            200,
            Condition::ModuleGoalsCompleted {
                module: ModuleId::new("learning"),
                count: 10,
            },
        ),
        def(
            "devoted",
            "Devoted",
            "Complete 10 scripture goals",
            200,
            Condition::ModuleGoalsCompleted {
                module: ModuleId::new("scripture"),
                count: 10,
            },
        ),
        def(
            "homemaker",
            "Homemaker",
            "Complete 10 home project goals",
            200,
            Condition::ModuleGoalsCompleted {
                module: ModuleId::new("home"),
                count: 10,
            },
        ),
        def(
            "professional",
            "Professional",
            "Complete 10 work goals",
            200,
            Condition::ModuleGoalsCompleted {
                module: ModuleId::new("work"),
                count: 10,
            },
        ),
        def(
            "week-streak",
            "Week Streak",
            "Stay active 7 days in a row",
            100,
            Condition::StreakDays { days: 7 },
        ),
        def(
            "month-streak",
            "Month Streak",
            "Stay active 30 days in a row",
            300,
            Condition::StreakDays { days: 30 },
        ),
        def(
            "century",
            "Century",
            "Earn 1,000 XP",
            100,
            Condition::XpEarned { amount: 1000 },
        ),
        def(
            "xp-collector",
            "XP Collector",
            "Earn 5,000 XP",
            250,
            Condition::XpEarned { amount: 5000 },
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_are_unique() {
        let catalog = default_catalog();
        let mut slugs: Vec<_> = catalog.iter().map(|d| d.id.as_str()).collect();
        slugs.sort();
        slugs.dedup();
        assert_eq!(slugs.len(), catalog.len());
    }

    #[test]
    fn rewards_and_thresholds_are_positive() {
        for def in default_catalog() {
            assert!(def.xp_reward > 0, "{} has no reward", def.id);
            let threshold = match &def.condition {
                Condition::GoalsCreated { count } => *count,
                Condition::GoalsCompleted { count } => *count,
                Condition::ModuleGoalsCompleted { count, .. } => *count,
                Condition::StreakDays { days } => u64::from(*days),
                Condition::XpEarned { amount } => *amount,
            };
            assert!(threshold > 0, "{} has a zero threshold", def.id);
        }
    }
}
