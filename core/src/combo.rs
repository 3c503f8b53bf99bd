//! Daily combo completion.
//!
//! The game pays a bonus for upgrading three given cards each day. The names
//! of today's cards come from configuration (`DAILY_COMBO`); this step looks
//! each one up in a fresh snapshot and hands it to the resolver, which also
//! unlocks it through its prerequisite chain when needed.
//!
//! RULE: a combo already complete today (three filled slots, today's date)
//! makes the step a no-op, so running it twice a day upgrades nothing twice.

use crate::{
    config::BotConfig,
    error::BotResult,
    event::AccountEvent,
    pacing::UPGRADE_CALL_DELAY,
    resolver::CardResolver,
    step::{AccountState, AccountStep, StepCtx},
    types::CardId,
    upgrade::CooldownSet,
};
use std::sync::Arc;

pub struct ComboCompleter {
    config:   Arc<BotConfig>,
    resolver: CardResolver,
}

impl ComboCompleter {
    pub fn new(config: Arc<BotConfig>) -> Self {
        Self { config, resolver: CardResolver::new() }
    }
}

impl AccountStep for ComboCompleter {
    fn name(&self) -> &'static str {
        "combo"
    }

    fn enabled(&self) -> bool {
        self.config.features.auto_daily_combo
    }

    fn run(&mut self, ctx: &mut StepCtx<'_>, state: &mut AccountState) -> BotResult<()> {
        if self.config.daily_combo.is_empty() {
            log::debug!("{} combo: no card names configured", ctx.label);
            return Ok(());
        }

        let snapshot = match ctx.call(|api| api.card_snapshot())? {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::warn!("{} combo: could not load the card list: {e}", ctx.label);
                return Ok(());
            }
        };

        let today = ctx.pacer.today();
        if snapshot.daily_combo.as_ref().is_some_and(|c| c.is_complete_on(&today)) {
            log::info!("{} combo: already complete for {today}", ctx.label);
            ctx.record(AccountEvent::DailyComboAlreadyComplete);
            return Ok(());
        }

        let filled: Vec<&CardId> = snapshot
            .daily_combo
            .as_ref()
            .map(|c| c.filled())
            .unwrap_or_default();
        let mut cooldowns = CooldownSet::new();
        let mut budget = state.budget;

        for name in &self.config.daily_combo {
            ctx.pacer.pause(UPGRADE_CALL_DELAY)?;
            match snapshot.find_by_name(name, &filled) {
                Some(card) => {
                    log::info!("{} combo: working on {} ({})", ctx.label, card.name, card.card_id);
                    budget = self.resolver.resolve(ctx, card, None, &snapshot, budget, &mut cooldowns)?;
                }
                None => log::warn!("{} combo: no open card named {name:?}", ctx.label),
            }
        }

        state.budget = budget;
        Ok(())
    }
}
