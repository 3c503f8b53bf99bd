//! The per-account engine: one round of work for one account.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   0. Startup stagger     (random pause in `DELAY_START_BOT`)
//!   1. `/api/start`        (failure = the account failed this round)
//!   2. Daily check-in
//!   3. Tap loop            (`AUTO_TAP`)
//!   4. Daily combo         (`AUTO_DAILY_COMBO`)
//!   5. Tasks               (`AUTO_TASK`)
//!   6. Card planner        (`AUTO_UPGRADE_CARD`)
//!   7. Stat upgrades       (`AUTO_UPGRADE_TAP`, `AUTO_UPGRADE_ENERGY`)
//!
//! RULES:
//!   - Steps execute in registration order, once per round.
//!   - The budget flows from step to step through `AccountState`.
//!   - No step calls another step directly.
//!   - All randomness flows through the account's `Pacer`.
//!   - Every observable action ends up in the run report's event list.

use crate::{
    api::GameApi,
    combo::ComboCompleter,
    config::BotConfig,
    error::{AccountFailure, BotError, RunResult},
    event::{AccountEvent, RunReport},
    pacing::Pacer,
    planner::UpgradePlanner,
    session::AccountSession,
    step::{AccountState, AccountStep, StepCtx},
    tap::{StatUpgrader, TapLoop},
    tasks::{DailyCheckIn, TaskRunner},
};
use std::sync::Arc;

pub struct AccountEngine {
    config: Arc<BotConfig>,
    steps:  Vec<Box<dyn AccountStep>>,
}

impl AccountEngine {
    pub fn new(config: Arc<BotConfig>) -> Self {
        Self { config, steps: Vec::new() }
    }

    /// Build an engine with every step registered.
    /// Call this instead of new() + manual register() calls.
    pub fn build(config: Arc<BotConfig>) -> Self {
        let mut engine = AccountEngine::new(Arc::clone(&config));

        // EXECUTION ORDER: fixed, never reordered.
        engine.register(Box::new(DailyCheckIn::new()));
        engine.register(Box::new(TapLoop::new(&config)));
        engine.register(Box::new(ComboCompleter::new(Arc::clone(&config))));
        engine.register(Box::new(TaskRunner::new(Arc::clone(&config))));
        engine.register(Box::new(UpgradePlanner::new(Arc::clone(&config))));
        engine.register(Box::new(StatUpgrader::new(config)));
        engine
    }

    /// Register a step. Call in the documented execution order.
    pub fn register(&mut self, step: Box<dyn AccountStep>) {
        self.steps.push(step);
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run one round for `session`.
    ///
    /// Only fatal errors end the round early: a rejected session, a failed
    /// `start`, or the account deadline. The failure keeps the events
    /// recorded up to that point.
    pub fn run(
        &mut self,
        api: &mut dyn GameApi,
        pacer: &mut Pacer,
        session: &AccountSession,
    ) -> RunResult {
        let label = session.label();
        let display_name = session.identity.display_name.clone();

        let waited = pacer.pause_in(self.config.start_delay)?;
        log::info!("{label} {display_name}: starting after {waited}s");

        let mut ctx = StepCtx::new(api, pacer, &label);
        let start = ctx.call(|api| api.start())?.map_err(|e| {
            log::warn!("{label} start failed, skipping this account: {e}");
            BotError::Api(e)
        })?;

        let mut state = AccountState::from_start(&start);
        let start_balance = state.budget;
        log::info!(
            "{label} balance {start_balance}, energy {}/{}, multi tap {}, profit/s {}",
            state.tap.energy, state.tap.max_energy, state.tap.multi_tap_count, state.tap.profit_per_second
        );
        ctx.record(AccountEvent::Started {
            balance:    start_balance,
            energy:     state.tap.energy,
            max_energy: state.tap.max_energy,
        });

        for step in self.steps.iter_mut() {
            if !step.enabled() {
                log::debug!("{label} {} disabled", step.name());
                continue;
            }
            log::debug!("{label} {} running, budget={}", step.name(), state.budget);
            if let Err(error) = step.run(&mut ctx, &mut state) {
                log::warn!("{label} {} stopped the round: {error}", step.name());
                return Err(AccountFailure { error, events: ctx.events });
            }
        }

        log::info!("{label} round done, budget={}", state.budget);
        Ok(RunReport {
            account_index: session.index,
            display_name,
            start_balance,
            final_budget: state.budget,
            events: ctx.events,
        })
    }
}
