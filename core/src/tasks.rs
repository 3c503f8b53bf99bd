//! Daily check-in and task claiming.

use crate::{
    api::{TaskCheck, TASK_COMPLETE},
    clock::day_key_of,
    config::BotConfig,
    error::{ApiError, BotResult},
    event::AccountEvent,
    pacing::TASK_CALL_DELAY,
    step::{AccountState, AccountStep, StepCtx},
    types::TaskId,
};
use std::sync::Arc;

/// Claims the daily login reward once per UTC day.
///
/// The check-in always runs; it costs nothing and the streak resets when a
/// day is missed.
#[derive(Default)]
pub struct DailyCheckIn;

impl DailyCheckIn {
    pub fn new() -> Self {
        Self
    }
}

impl AccountStep for DailyCheckIn {
    fn name(&self) -> &'static str {
        "check-in"
    }

    fn run(&mut self, ctx: &mut StepCtx<'_>, state: &mut AccountState) -> BotResult<()> {
        let today = ctx.pacer.today();
        if let Some(info) = &state.daily_reward {
            if day_key_of(info.last_update).as_deref() == Some(today.as_str()) {
                log::info!(
                    "{} check-in: already claimed today, streak {}",
                    ctx.label, info.consecutive_count
                );
                ctx.record(AccountEvent::DailyRewardAlreadyClaimed { streak: info.consecutive_count });
                return Ok(());
            }
        }

        let streak = state.daily_reward.as_ref().map_or(0, |info| info.consecutive_count);
        match ctx.call(|api| api.claim_daily_reward())? {
            Ok(()) => {
                log::info!("{} check-in: reward claimed", ctx.label);
                ctx.record(AccountEvent::DailyRewardClaimed);
            }
            // The server answers 400 when today's reward is already taken.
            Err(ApiError::Rejected { status: 400, .. }) => {
                log::info!("{} check-in: already claimed today", ctx.label);
                ctx.record(AccountEvent::DailyRewardAlreadyClaimed { streak });
            }
            Err(e) => log::warn!("{} check-in: claim failed: {e}", ctx.label),
        }
        Ok(())
    }
}

/// Executes and verifies every open task not excluded by `SKIP_TASKS`.
pub struct TaskRunner {
    config: Arc<BotConfig>,
}

impl TaskRunner {
    pub fn new(config: Arc<BotConfig>) -> Self {
        Self { config }
    }

    fn is_skipped(&self, task_id: &TaskId) -> bool {
        self.config.skip_tasks.contains(task_id)
    }
}

impl AccountStep for TaskRunner {
    fn name(&self) -> &'static str {
        "tasks"
    }

    fn enabled(&self) -> bool {
        self.config.features.auto_task
    }

    fn run(&mut self, ctx: &mut StepCtx<'_>, state: &mut AccountState) -> BotResult<()> {
        let open: Vec<_> = state
            .tasks
            .iter()
            .filter(|t| t.is_open() && !self.is_skipped(&t.id))
            .cloned()
            .collect();
        if open.is_empty() {
            log::info!("{} tasks: nothing to do", ctx.label);
            return Ok(());
        }

        for task in open {
            log::info!("{} tasks: starting {} | {}", ctx.label, task.id, task.title);
            ctx.pacer.pause(TASK_CALL_DELAY)?;
            if let Err(e) = ctx.call(|api| api.execute_task(&task.id))? {
                log::warn!("{} tasks: {} failed: {e}", ctx.label, task.id);
                ctx.record(AccountEvent::TaskFailed { task_id: task.id.clone(), reason: e.to_string() });
                continue;
            }

            ctx.pacer.pause(TASK_CALL_DELAY)?;
            match ctx.call(|api| api.check_task(&task.id))? {
                Ok(TaskCheck::Completed { reward }) => {
                    log::info!("{} tasks: {} done, reward {reward}", ctx.label, task.id);
                    ctx.record(AccountEvent::TaskCompleted { task_id: task.id.clone(), reward });
                    if let Some(known) = state.tasks.iter_mut().find(|t| t.id == task.id) {
                        known.status = TASK_COMPLETE;
                    }
                }
                Ok(TaskCheck::Pending { description }) => {
                    log::warn!("{} tasks: {} not complete: {description}", ctx.label, task.id);
                    ctx.record(AccountEvent::TaskPending { task_id: task.id.clone(), description });
                }
                Err(e) => {
                    log::warn!("{} tasks: could not verify {}: {e}", ctx.label, task.id);
                    ctx.record(AccountEvent::TaskFailed { task_id: task.id.clone(), reason: e.to_string() });
                }
            }
        }
        Ok(())
    }
}
