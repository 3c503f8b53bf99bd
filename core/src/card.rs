//! Upgradeable cards.

use crate::types::{CardId, CategoryId, Coins, UnixTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub category_id:             CategoryId,
    pub card_id:                 CardId,
    pub level:                   u32,
    pub cost:                    Coins,
    pub unlocked:                bool,
    pub name:                    String,
    pub profit_per_hour:         f64,
    pub next_profit_per_hour:    f64,
    /// Card that must reach `unlock_card_level` before this one unlocks.
    pub unlock_card_id:          Option<CardId>,
    /// Level this card's prerequisite must reach. Read from the dependent
    /// card when its prerequisite chain is resolved.
    pub unlock_card_level:       u32,
    pub level_up_available_date: Option<UnixTime>,
    pub end_datetime:            Option<UnixTime>,
}

impl Card {
    /// Seconds until the next upgrade is allowed, if that is in the future.
    pub fn cooldown_remaining(&self, now: UnixTime) -> Option<i64> {
        self.level_up_available_date
            .map(|at| at - now)
            .filter(|left| *left > 0)
    }

    /// Limited-time cards stop accepting upgrades once they end.
    pub fn is_expired(&self, now: UnixTime) -> bool {
        self.end_datetime.is_some_and(|end| now > end)
    }

    pub fn is_affordable(&self, budget: Coins) -> bool {
        budget >= self.cost
    }

    /// Level the prerequisite of this card has to reach. Zero on the wire
    /// means "just own it", which is level 1.
    pub fn required_prerequisite_level(&self) -> u32 {
        self.unlock_card_level.max(1)
    }
}
