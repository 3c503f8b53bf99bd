//! Fixed-size worker pool for one round over all accounts.
//!
//! Jobs go into an mpsc queue shared by the workers; each finished account
//! comes back over a result channel. Workers are scoped threads, so the run
//! closure may borrow from the caller.
//!
//! RULE: one account never takes down the round. Errors and panics inside
//! `run` become that account's failed `AccountOutcome`.

use crate::{
    error::RunResult,
    event::{AccountEvent, RunReport},
    session::AccountSession,
};
use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{mpsc, Mutex};
use std::thread;

#[derive(Debug, Clone)]
pub struct AccountJob {
    pub session: AccountSession,
}

#[derive(Debug, Clone)]
pub struct AccountOutcome {
    pub index:        usize,
    pub display_name: String,
    pub result:       Result<RunReport, FailedRun>,
}

/// Why an account failed, and what it had done by then.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedRun {
    pub reason: String,
    pub events: Vec<AccountEvent>,
}

impl FailedRun {
    pub fn cards_upgraded(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, AccountEvent::CardUpgraded { .. }))
            .count()
    }
}

impl AccountOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

pub struct WorkerPool {
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        Self { size: size.max(1) }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Run `run` for every job on at most `size` threads. Outcomes come back
    /// ordered by account index.
    pub fn run_all<F>(&self, jobs: Vec<AccountJob>, run: F) -> Vec<AccountOutcome>
    where
        F: Fn(&AccountSession) -> RunResult + Sync,
    {
        if jobs.is_empty() {
            return Vec::new();
        }
        let workers = self.size.min(jobs.len());

        let (job_tx, job_rx) = mpsc::channel::<AccountJob>();
        for job in jobs {
            // The receiver is alive until the end of this function.
            let _ = job_tx.send(job);
        }
        drop(job_tx);
        let job_rx = Mutex::new(job_rx);
        let (result_tx, result_rx) = mpsc::channel::<AccountOutcome>();

        thread::scope(|scope| {
            for worker in 0..workers {
                let result_tx = result_tx.clone();
                let job_rx = &job_rx;
                let run = &run;
                scope.spawn(move || loop {
                    let next = match job_rx.lock() {
                        Ok(rx) => rx.recv(),
                        Err(_) => break,
                    };
                    let Ok(job) = next else { break };
                    log::debug!("worker {worker}: picked {}", job.session.label());
                    let outcome = run_guarded(run, &job.session);
                    if result_tx.send(outcome).is_err() {
                        break;
                    }
                });
            }
        });
        drop(result_tx);

        let mut outcomes: Vec<AccountOutcome> = result_rx.into_iter().collect();
        outcomes.sort_by_key(|o| o.index);
        outcomes
    }
}

fn run_guarded<F>(run: &F, session: &AccountSession) -> AccountOutcome
where
    F: Fn(&AccountSession) -> RunResult,
{
    let result = match catch_unwind(AssertUnwindSafe(|| run(session))) {
        Ok(Ok(report)) => Ok(report),
        Ok(Err(failure)) => {
            log::error!("{} failed: {failure}", session.label());
            Err(FailedRun { reason: failure.to_string(), events: failure.events })
        }
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            log::error!("{} panicked: {message}", session.label());
            Err(FailedRun { reason: format!("panicked: {message}"), events: Vec::new() })
        }
    };
    AccountOutcome {
        index: session.index,
        display_name: session.identity.display_name.clone(),
        result,
    }
}
