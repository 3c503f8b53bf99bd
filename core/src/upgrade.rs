//! A single card upgrade attempt and its tagged outcome.

use crate::{
    card::Card,
    error::{ApiError, BotResult},
    step::StepCtx,
    types::{CardId, Coins},
};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeOutcome {
    Success {
        new_level:   u32,
        new_balance: Option<Coins>,
    },
    Cooldown,
    InsufficientFunds,
    /// The server turned the request down for good (max level, locked, ...).
    Refused(String),
    TransientError(String),
}

/// Cards the server refused with "Wait for cooldown" during one planner run.
#[derive(Debug, Clone, Default)]
pub struct CooldownSet {
    ids: HashSet<CardId>,
}

impl CooldownSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, card_id: CardId) -> bool {
        self.ids.insert(card_id)
    }

    pub fn contains(&self, card_id: &CardId) -> bool {
        self.ids.contains(card_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Issue one `card/levelup` call for `card`, currently at `current_level`.
///
/// Only fatal errors (rejected session, deadline) come back as `Err`.
pub fn attempt_upgrade(
    ctx: &mut StepCtx<'_>,
    card: &Card,
    current_level: u32,
) -> BotResult<UpgradeOutcome> {
    let outcome = match ctx.call(|api| api.card_level_up(card))? {
        Ok(done) => UpgradeOutcome::Success {
            new_level:   current_level + 1,
            new_balance: done.new_balance,
        },
        Err(ApiError::Cooldown) => UpgradeOutcome::Cooldown,
        Err(ApiError::InsufficientFunds(_)) => UpgradeOutcome::InsufficientFunds,
        Err(e @ ApiError::Rejected { .. }) => UpgradeOutcome::Refused(e.to_string()),
        Err(e) => UpgradeOutcome::TransientError(e.to_string()),
    };
    Ok(outcome)
}
