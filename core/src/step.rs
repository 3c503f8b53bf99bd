//! Account step trait and the context every step runs in.
//!
//! RULE: every unit of account work implements `AccountStep`.
//! The engine runs enabled steps in registration order, once per round.
//! Steps never call each other; they share only `AccountState`.

use crate::{
    api::{DailyRewardInfo, GameApi, StartInfo, TapState, Task},
    error::{ApiResult, BotError, BotResult},
    event::AccountEvent,
    pacing::Pacer,
    types::Coins,
};

/// Per-account state carried from step to step within one round.
#[derive(Debug, Clone, Default)]
pub struct AccountState {
    pub tap:          TapState,
    /// Spendable balance as this client tracks it.
    pub budget:       Coins,
    pub tasks:        Vec<Task>,
    pub daily_reward: Option<DailyRewardInfo>,
}

impl AccountState {
    pub fn from_start(start: &StartInfo) -> Self {
        let tap = TapState::from_update(&start.user);
        Self {
            budget: tap.total_coins,
            tap,
            tasks: start.tasks.clone(),
            daily_reward: start.daily_reward.clone(),
        }
    }
}

pub struct StepCtx<'a> {
    pub api:    &'a mut dyn GameApi,
    pub pacer:  &'a mut Pacer,
    pub label:  &'a str,
    pub events: Vec<AccountEvent>,
}

impl<'a> StepCtx<'a> {
    pub fn new(api: &'a mut dyn GameApi, pacer: &'a mut Pacer, label: &'a str) -> Self {
        Self { api, pacer, label, events: Vec::new() }
    }

    /// The single call site for game API requests.
    ///
    /// Enforces the run deadline, escalates fatal errors (the account run
    /// ends) and hands every other outcome back as a tagged result.
    pub fn call<T>(
        &mut self,
        request: impl FnOnce(&mut dyn GameApi) -> ApiResult<T>,
    ) -> BotResult<ApiResult<T>> {
        self.pacer.checkpoint()?;
        match request(&mut *self.api) {
            Err(e) if e.is_fatal() => {
                log::error!("{} session rejected: {e}", self.label);
                Err(BotError::Api(e))
            }
            other => Ok(other),
        }
    }

    pub fn record(&mut self, event: AccountEvent) {
        self.events.push(event);
    }
}

pub trait AccountStep: Send {
    /// Stable name, used in logs.
    fn name(&self) -> &'static str;

    /// Whether the configuration switches this step on.
    fn enabled(&self) -> bool {
        true
    }

    fn run(&mut self, ctx: &mut StepCtx<'_>, state: &mut AccountState) -> BotResult<()>;
}
