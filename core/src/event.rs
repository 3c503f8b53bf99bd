//! Account run events.
//!
//! RULE: every observable action a step takes is recorded as an event.
//! The run report is nothing more than the ordered event list plus the
//! starting and final budget.

use crate::types::{CardId, Coins, TaskId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AccountEvent {
    // ── Session ────────────────────────────────────
    Started {
        balance: Coins,
        energy: i64,
        max_energy: i64,
    },

    // ── Check-in ───────────────────────────────────
    DailyRewardClaimed,
    DailyRewardAlreadyClaimed {
        streak: u32,
    },

    // ── Tap loop ───────────────────────────────────
    Tapped {
        tap_count: u64,
        energy: i64,
        balance: Coins,
    },
    EnergyRecovered {
        energy: i64,
        max_energy: i64,
    },
    TapLoopHalted {
        reason: String,
    },
    TapLevelUp {
        level: u32,
        balance: Coins,
    },
    EnergyLevelUp {
        level: u32,
        balance: Coins,
    },

    // ── Cards ──────────────────────────────────────
    CardUpgraded {
        card_id: CardId,
        name: String,
        new_level: u32,
        cost: Coins,
        budget: Coins,
    },
    CardCooldown {
        card_id: CardId,
        /// Seconds left when known from the snapshot; `None` when the
        /// server rejected the call.
        seconds_left: Option<i64>,
    },
    CardExpired {
        card_id: CardId,
    },
    CardUnaffordable {
        card_id: CardId,
        cost: Coins,
        budget: Coins,
    },
    CardUpgradeFailed {
        card_id: CardId,
        reason: String,
    },
    UnlockCycleDetected {
        card_id: CardId,
    },
    PrerequisiteMissing {
        card_id: CardId,
        prerequisite: CardId,
    },
    DailyComboAlreadyComplete,

    // ── Tasks ──────────────────────────────────────
    TaskCompleted {
        task_id: TaskId,
        reward: Coins,
    },
    TaskPending {
        task_id: TaskId,
        description: String,
    },
    TaskFailed {
        task_id: TaskId,
        reason: String,
    },
}

/// Everything one account run did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub account_index: usize,
    pub display_name:  String,
    pub start_balance: Coins,
    pub final_budget:  Coins,
    pub events:        Vec<AccountEvent>,
}

impl RunReport {
    pub fn cards_upgraded(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, AccountEvent::CardUpgraded { .. }))
            .count()
    }

    pub fn total_taps(&self) -> u64 {
        self.events
            .iter()
            .map(|e| match e {
                AccountEvent::Tapped { tap_count, .. } => *tap_count,
                _ => 0,
            })
            .sum()
    }

    pub fn tasks_completed(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, AccountEvent::TaskCompleted { .. }))
            .count()
    }
}
