//! Tap/energy spending and stat level-ups.
//!
//! `TapLoop` spends the whole energy bar in one tap call, then asks for a
//! free refill. It keeps going only while the refill brings energy back to
//! the maximum; the game hands out a fixed number of refills per day, and a
//! partial refill means they are used up.
//!
//! `StatUpgrader` raises the tap and energy levels. Both cost `1000 × level`
//! coins, which the client computes itself since responses do not carry the
//! price.

use crate::{
    api::UserUpdate,
    config::BotConfig,
    error::BotResult,
    event::AccountEvent,
    step::{AccountState, AccountStep, StepCtx},
    types::Coins,
};
use std::sync::Arc;

/// Price of the next tap or energy level.
pub fn level_up_cost(level: u32) -> Coins {
    1000 * Coins::from(level)
}

pub struct TapLoop {
    enabled: bool,
}

impl TapLoop {
    pub fn new(config: &BotConfig) -> Self {
        Self { enabled: config.features.auto_tap }
    }

    fn halt(ctx: &mut StepCtx<'_>, reason: impl Into<String>) {
        let reason = reason.into();
        log::info!("{} tap: stopping, {reason}", ctx.label);
        ctx.record(AccountEvent::TapLoopHalted { reason });
    }
}

impl AccountStep for TapLoop {
    fn name(&self) -> &'static str {
        "tap"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn run(&mut self, ctx: &mut StepCtx<'_>, state: &mut AccountState) -> BotResult<()> {
        let mut last_tap_balance = None;

        while state.tap.energy > 0 {
            if state.tap.multi_tap_count <= 0 {
                Self::halt(ctx, "multi tap count is zero");
                break;
            }
            let tap_count = state.tap.energy / state.tap.multi_tap_count;
            if tap_count <= 0 {
                Self::halt(ctx, "not enough energy for a single tap");
                break;
            }
            let tap_count = tap_count as u64;

            match ctx.call(|api| api.tap(tap_count))? {
                Ok(update) => {
                    state.tap.apply(&update);
                    last_tap_balance = update.total_coins.or(last_tap_balance);
                    log::info!(
                        "{} tap: {tap_count} taps, energy {}/{}, balance {}",
                        ctx.label, state.tap.energy, state.tap.max_energy, state.tap.total_coins
                    );
                    ctx.record(AccountEvent::Tapped {
                        tap_count,
                        energy:  state.tap.energy,
                        balance: state.tap.total_coins,
                    });
                }
                Err(e) => {
                    Self::halt(ctx, format!("tap failed: {e}"));
                    break;
                }
            }

            match ctx.call(|api| api.recover_energy())? {
                Ok(update) => {
                    state.tap.apply(&update);
                    ctx.record(AccountEvent::EnergyRecovered {
                        energy:     state.tap.energy,
                        max_energy: state.tap.max_energy,
                    });
                    if state.tap.energy != state.tap.max_energy {
                        Self::halt(
                            ctx,
                            format!("partial recovery {}/{}", state.tap.energy, state.tap.max_energy),
                        );
                        break;
                    }
                }
                Err(e) => {
                    Self::halt(ctx, format!("energy recovery failed: {e}"));
                    break;
                }
            }
        }

        if let Some(balance) = last_tap_balance {
            state.budget = balance;
        }
        Ok(())
    }
}

/// Which stat a level-up endpoint raises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stat {
    Tap,
    Energy,
}

impl Stat {
    fn label(self) -> &'static str {
        match self {
            Stat::Tap => "tap",
            Stat::Energy => "energy",
        }
    }
}

pub struct StatUpgrader {
    config: Arc<BotConfig>,
}

impl StatUpgrader {
    pub fn new(config: Arc<BotConfig>) -> Self {
        Self { config }
    }

    fn level_up(&self, ctx: &mut StepCtx<'_>, state: &mut AccountState, stat: Stat) -> BotResult<()> {
        let max_level = match stat {
            Stat::Tap => self.config.max_tap_level,
            Stat::Energy => self.config.max_energy_level,
        };
        let current = |state: &AccountState| match stat {
            Stat::Tap => state.tap.tap_level,
            Stat::Energy => state.tap.energy_level,
        };

        loop {
            let level = current(state);
            let cost = level_up_cost(level);
            if level >= max_level || state.budget < cost || cost > self.config.max_upgrade_cost {
                break;
            }

            let response: Result<UserUpdate, _> = match stat {
                Stat::Tap => ctx.call(|api| api.tap_level_up())?,
                Stat::Energy => ctx.call(|api| api.energy_level_up())?,
            };
            match response {
                Ok(update) => {
                    state.tap.apply(&update);
                    state.budget = update.total_coins.unwrap_or(state.budget - cost);
                    let new_level = current(state);
                    if new_level <= level {
                        log::warn!("{} stats: {} level did not move past {level}", ctx.label, stat.label());
                        break;
                    }
                    log::info!(
                        "{} stats: {} level {new_level}, balance {}",
                        ctx.label, stat.label(), state.budget
                    );
                    ctx.record(match stat {
                        Stat::Tap => AccountEvent::TapLevelUp { level: new_level, balance: state.budget },
                        Stat::Energy => AccountEvent::EnergyLevelUp { level: new_level, balance: state.budget },
                    });
                }
                Err(e) => {
                    log::warn!("{} stats: {} level-up failed: {e}", ctx.label, stat.label());
                    break;
                }
            }
        }
        Ok(())
    }
}

impl AccountStep for StatUpgrader {
    fn name(&self) -> &'static str {
        "stats"
    }

    fn enabled(&self) -> bool {
        self.config.features.auto_upgrade_tap || self.config.features.auto_upgrade_energy
    }

    fn run(&mut self, ctx: &mut StepCtx<'_>, state: &mut AccountState) -> BotResult<()> {
        if self.config.features.auto_upgrade_tap {
            self.level_up(ctx, state, Stat::Tap)?;
        }
        if self.config.features.auto_upgrade_energy {
            self.level_up(ctx, state, Stat::Energy)?;
        }
        Ok(())
    }
}
