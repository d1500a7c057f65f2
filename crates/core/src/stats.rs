//! User statistics snapshot consumed by the condition evaluator.

use crate::id::ModuleId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A point-in-time view of the statistics achievement conditions key off.
///
/// The storage layer computes this; the engine never derives counts on its
/// own. Snapshot timing is why achievement progress is monotonic - a
/// slightly stale snapshot must never regress a stored ratio.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserStatsSnapshot {
    /// Total goals the user has created
    pub goals_created: u64,

    /// Total goals the user has completed
    pub goals_completed: u64,

    /// Completed-goal counts per module
    pub module_goals_completed: HashMap<ModuleId, u64>,

    /// Total XP earned
    pub total_xp: u64,

    /// Current continuous-activity streak in days
    pub current_streak: u32,
}

impl UserStatsSnapshot {
    /// Completed-goal count for one module (0 when the module is absent).
    pub fn completed_in_module(&self, module: &ModuleId) -> u64 {
        self.module_goals_completed.get(module).copied().unwrap_or(0)
    }
}
