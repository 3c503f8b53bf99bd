//! Greedy card upgrade planner.
//!
//! Each sweep fetches a fresh snapshot, walks the cards by descending
//! `next_profit_per_hour` and buys the first affordable upgrade. A success
//! makes the snapshot stale, so the sweep ends and a new one starts. The run
//! ends on the first sweep that buys nothing.
//!
//! RULES:
//!   - One `CooldownSet` per run. A card the server put on cooldown is not
//!     retried until the next run.
//!   - A card refused for lack of coins or any other 4xx is not retried in
//!     the same run either. Transport errors are.
//!   - Locked cards are left to the resolver (daily combo); the planner only
//!     buys unlocked ones.
//!   - `max_planner_sweeps` caps the loop for data with zero-cost cards.

use crate::{
    config::BotConfig,
    error::BotResult,
    event::AccountEvent,
    step::{AccountState, AccountStep, StepCtx},
    types::{CardId, Coins},
    upgrade::{attempt_upgrade, CooldownSet, UpgradeOutcome},
};
use std::collections::HashSet;
use std::sync::Arc;

pub struct UpgradePlanner {
    config: Arc<BotConfig>,
}

impl UpgradePlanner {
    pub fn new(config: Arc<BotConfig>) -> Self {
        Self { config }
    }

    /// Spend `budget` greedily. Returns what is left.
    pub fn plan(&self, ctx: &mut StepCtx<'_>, mut budget: Coins) -> BotResult<Coins> {
        let mut cooldowns = CooldownSet::new();
        let mut refused: HashSet<CardId> = HashSet::new();
        // Skips are reported once per run, not once per sweep.
        let mut reported: HashSet<CardId> = HashSet::new();
        let mut sweeps = 0usize;

        loop {
            if sweeps >= self.config.max_planner_sweeps {
                log::warn!(
                    "{} cards: stopping after {sweeps} sweeps, budget={budget}",
                    ctx.label
                );
                break;
            }
            sweeps += 1;

            let snapshot = match ctx.call(|api| api.card_snapshot())? {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    log::warn!("{} cards: could not load the card list: {e}", ctx.label);
                    break;
                }
            };

            let now = ctx.pacer.now_unix();
            let mut leveled_up = false;

            for card in snapshot.by_next_profit_desc() {
                if cooldowns.contains(&card.card_id) || refused.contains(&card.card_id) {
                    continue;
                }
                if let Some(left) = card.cooldown_remaining(now) {
                    if reported.insert(card.card_id.clone()) {
                        log::debug!("{} cards: {} on cooldown for {left}s", ctx.label, card.name);
                        ctx.record(AccountEvent::CardCooldown {
                            card_id:      card.card_id.clone(),
                            seconds_left: Some(left),
                        });
                    }
                    continue;
                }
                if card.is_expired(now) {
                    if reported.insert(card.card_id.clone()) {
                        log::info!("{} cards: {} ({}) has expired", ctx.label, card.name, card.card_id);
                        ctx.record(AccountEvent::CardExpired { card_id: card.card_id.clone() });
                    }
                    continue;
                }
                if !card.unlocked
                    || !card.is_affordable(budget)
                    || card.cost > self.config.max_upgrade_cost
                {
                    continue;
                }

                ctx.pacer.pause_before_request()?;
                match attempt_upgrade(ctx, card, card.level)? {
                    UpgradeOutcome::Success { new_level, .. } => {
                        budget -= card.cost;
                        log::info!(
                            "{} cards: upgraded {} ({}) to level {new_level}. cost={} balance={budget}",
                            ctx.label, card.name, card.card_id, card.cost
                        );
                        ctx.record(AccountEvent::CardUpgraded {
                            card_id: card.card_id.clone(),
                            name: card.name.clone(),
                            new_level,
                            cost: card.cost,
                            budget,
                        });
                        leveled_up = true;
                        break;
                    }
                    UpgradeOutcome::Cooldown => {
                        log::warn!("{} cards: {} ({}) is cooling down", ctx.label, card.name, card.card_id);
                        cooldowns.insert(card.card_id.clone());
                        ctx.record(AccountEvent::CardCooldown {
                            card_id:      card.card_id.clone(),
                            seconds_left: None,
                        });
                    }
                    UpgradeOutcome::InsufficientFunds => {
                        log::warn!("{} cards: server refused {} for lack of coins", ctx.label, card.card_id);
                        refused.insert(card.card_id.clone());
                        ctx.record(AccountEvent::CardUnaffordable {
                            card_id: card.card_id.clone(),
                            cost: card.cost,
                            budget,
                        });
                    }
                    UpgradeOutcome::Refused(reason) => {
                        log::warn!("{} cards: server refused {}: {reason}", ctx.label, card.card_id);
                        refused.insert(card.card_id.clone());
                        ctx.record(AccountEvent::CardUpgradeFailed {
                            card_id: card.card_id.clone(),
                            reason,
                        });
                    }
                    UpgradeOutcome::TransientError(reason) => {
                        log::warn!("{} cards: upgrade of {} failed: {reason}", ctx.label, card.card_id);
                        ctx.record(AccountEvent::CardUpgradeFailed {
                            card_id: card.card_id.clone(),
                            reason,
                        });
                    }
                }
            }

            if !leveled_up {
                break;
            }
        }

        log::info!(
            "{} cards: done after {sweeps} sweep(s), {} card(s) cooling down, {} refused, budget={budget}",
            ctx.label,
            cooldowns.len(),
            refused.len()
        );
        Ok(budget)
    }
}

impl AccountStep for UpgradePlanner {
    fn name(&self) -> &'static str {
        "cards"
    }

    fn enabled(&self) -> bool {
        self.config.features.auto_upgrade_card
    }

    fn run(&mut self, ctx: &mut StepCtx<'_>, state: &mut AccountState) -> BotResult<()> {
        state.budget = self.plan(ctx, state.budget)?;
        Ok(())
    }
}
