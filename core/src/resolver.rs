//! Card dependency resolver.
//!
//! Given a target card, walks its unlock chain (`unlock_card_id`) down to
//! the first unlocked card and levels that card until it satisfies the level
//! its dependent asks for. A locked target is never upgraded itself in the
//! same call: the caller refetches the snapshot and tries again next time.
//!
//! The walk is iterative with a visited set, so malformed catalogues with
//! cyclic `unlock_card_id` references stop instead of looping.
//!
//! Cost model: every level step is charged the `cost` the snapshot showed
//! before the first step. Real cards get more expensive per level, so for
//! multi-level chains the tracked budget can be higher than the server's
//! balance. The server rejects upgrades it cannot afford, so this only ever
//! causes extra rejected calls, never overspending.

use crate::{
    card::Card,
    clock::format_remaining,
    error::BotResult,
    event::AccountEvent,
    pacing::UPGRADE_CALL_DELAY,
    snapshot::CardSnapshot,
    step::StepCtx,
    types::{CardId, Coins},
    upgrade::{attempt_upgrade, CooldownSet, UpgradeOutcome},
};
use std::collections::HashSet;
use std::time::Duration;

pub struct CardResolver {
    call_delay: Duration,
}

impl Default for CardResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl CardResolver {
    pub fn new() -> Self {
        Self { call_delay: UPGRADE_CALL_DELAY }
    }

    /// Resolve `target`, optionally on behalf of `parent` (the card whose
    /// unlock depends on `target`). Returns the budget left afterwards.
    pub fn resolve<'s>(
        &self,
        ctx: &mut StepCtx<'_>,
        target: &'s Card,
        parent: Option<&'s Card>,
        snapshot: &'s CardSnapshot,
        budget: Coins,
        cooldowns: &mut CooldownSet,
    ) -> BotResult<Coins> {
        let mut visited: HashSet<&'s CardId> = HashSet::new();
        let mut node = target;
        let mut dependent = parent;

        loop {
            if !visited.insert(&node.card_id) {
                log::warn!(
                    "{} cards: unlock chain of {} loops back to {} ({}), giving up",
                    ctx.label, target.name, node.name, node.card_id
                );
                ctx.record(AccountEvent::UnlockCycleDetected { card_id: node.card_id.clone() });
                return Ok(budget);
            }

            if let Some(left) = node.cooldown_remaining(ctx.pacer.now_unix()) {
                log::warn!(
                    "{} cards: {} ({}) on cooldown, {} left before the next upgrade",
                    ctx.label, node.name, node.card_id, format_remaining(left)
                );
                ctx.record(AccountEvent::CardCooldown {
                    card_id:      node.card_id.clone(),
                    seconds_left: Some(left),
                });
                return Ok(budget);
            }

            if cooldowns.contains(&node.card_id) {
                return Ok(budget);
            }

            if node.unlocked {
                let needed = dependent.map(Card::required_prerequisite_level).unwrap_or(1);
                if let Some(dep) = dependent {
                    log::info!(
                        "{} cards: {} ({}) needs {} ({}) at level {needed}",
                        ctx.label, dep.name, dep.card_id, node.name, node.card_id
                    );
                }
                return self.level_up_to(ctx, node, needed, budget, cooldowns);
            }

            let Some(prerequisite) = &node.unlock_card_id else {
                log::debug!("{} cards: {} is locked with no prerequisite", ctx.label, node.card_id);
                return Ok(budget);
            };
            match snapshot.find(prerequisite) {
                Some(next) => {
                    dependent = Some(node);
                    node = next;
                }
                None => {
                    log::debug!(
                        "{} cards: prerequisite {prerequisite} of {} not in catalogue",
                        ctx.label, node.card_id
                    );
                    ctx.record(AccountEvent::PrerequisiteMissing {
                        card_id:      node.card_id.clone(),
                        prerequisite: prerequisite.clone(),
                    });
                    return Ok(budget);
                }
            }
        }
    }

    /// Upgrade an unlocked card at least once, then until it reaches `needed`.
    fn level_up_to(
        &self,
        ctx: &mut StepCtx<'_>,
        card: &Card,
        needed: u32,
        mut budget: Coins,
        cooldowns: &mut CooldownSet,
    ) -> BotResult<Coins> {
        let mut level = card.level;
        loop {
            if !card.is_affordable(budget) {
                log::warn!(
                    "{} cards: not enough balance to raise {} ({}) to level {}. cost={} balance={budget}",
                    ctx.label, card.name, card.card_id, level + 1, card.cost
                );
                ctx.record(AccountEvent::CardUnaffordable {
                    card_id: card.card_id.clone(),
                    cost: card.cost,
                    budget,
                });
                break;
            }

            let upgraded = match attempt_upgrade(ctx, card, level)? {
                UpgradeOutcome::Success { new_level, .. } => {
                    budget -= card.cost;
                    level = new_level;
                    log::info!(
                        "{} cards: upgraded {} ({}) to level {level}. cost={} balance={budget}",
                        ctx.label, card.name, card.card_id, card.cost
                    );
                    ctx.record(AccountEvent::CardUpgraded {
                        card_id: card.card_id.clone(),
                        name: card.name.clone(),
                        new_level: level,
                        cost: card.cost,
                        budget,
                    });
                    true
                }
                UpgradeOutcome::Cooldown => {
                    log::warn!("{} cards: {} ({}) is cooling down", ctx.label, card.name, card.card_id);
                    cooldowns.insert(card.card_id.clone());
                    ctx.record(AccountEvent::CardCooldown {
                        card_id:      card.card_id.clone(),
                        seconds_left: None,
                    });
                    false
                }
                UpgradeOutcome::InsufficientFunds => {
                    ctx.record(AccountEvent::CardUnaffordable {
                        card_id: card.card_id.clone(),
                        cost: card.cost,
                        budget,
                    });
                    false
                }
                UpgradeOutcome::Refused(reason) | UpgradeOutcome::TransientError(reason) => {
                    log::warn!("{} cards: upgrade of {} ({}) failed: {reason}", ctx.label, card.name, card.card_id);
                    ctx.record(AccountEvent::CardUpgradeFailed {
                        card_id: card.card_id.clone(),
                        reason,
                    });
                    false
                }
            };

            ctx.pacer.pause(self.call_delay)?;
            if !upgraded || level >= needed {
                break;
            }
        }
        Ok(budget)
    }
}
