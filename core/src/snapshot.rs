//! Point-in-time card catalogue of one account.
//!
//! A snapshot is fetched fresh from `/api/start` for every planning sweep and
//! is never patched locally: any successful upgrade makes it stale.

use crate::{card::Card, types::CardId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// The three cards upgraded today toward the daily combo bonus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCombo {
    pub card_ids: Vec<Option<CardId>>,
    /// `YYYYMMDD`
    pub date:     String,
}

pub const COMBO_SLOTS: usize = 3;

impl DailyCombo {
    pub fn is_complete_on(&self, today: &str) -> bool {
        self.card_ids.len() == COMBO_SLOTS
            && self.card_ids.iter().all(Option::is_some)
            && self.date == today
    }

    /// Ids already placed in a slot.
    pub fn filled(&self) -> Vec<&CardId> {
        self.card_ids.iter().flatten().collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardSnapshot {
    pub cards:       Vec<Card>,
    pub daily_combo: Option<DailyCombo>,
}

impl CardSnapshot {
    pub fn new(cards: Vec<Card>, daily_combo: Option<DailyCombo>) -> Self {
        Self { cards, daily_combo }
    }

    pub fn find(&self, card_id: &CardId) -> Option<&Card> {
        self.cards.iter().find(|c| &c.card_id == card_id)
    }

    /// Case-insensitive name match, skipping ids in `exclude`.
    pub fn find_by_name(&self, name: &str, exclude: &[&CardId]) -> Option<&Card> {
        let wanted = name.trim().to_lowercase();
        self.cards
            .iter()
            .find(|c| c.name.to_lowercase() == wanted && !exclude.contains(&&c.card_id))
    }

    /// Highest marginal profit first. Ties keep catalogue order.
    pub fn by_next_profit_desc(&self) -> Vec<&Card> {
        let mut sorted: Vec<&Card> = self.cards.iter().collect();
        sorted.sort_by(|a, b| {
            b.next_profit_per_hour
                .partial_cmp(&a.next_profit_per_hour)
                .unwrap_or(Ordering::Equal)
        });
        sorted
    }
}
