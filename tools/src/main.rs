//! tsubasa-runner: headless farming loop for Tsubasa Rivals accounts.
//!
//! Usage:
//!   tsubasa-runner --data data.txt
//!   tsubasa-runner --data data.txt --proxies proxy.txt --once --json
//!
//! Settings come from the environment (a `.env` file is loaded first); see
//! `BotConfig::from_env` for the keys.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::env;
use std::fs;
use std::sync::Arc;
use std::thread;
use tsubasa_core::{
    clock::{Clock, SystemClock},
    config::BotConfig,
    engine::AccountEngine,
    error::RunResult,
    event::RunReport,
    http::HttpGameApi,
    pacing::Pacer,
    pool::{AccountJob, AccountOutcome, FailedRun, WorkerPool},
    rng::Jitter,
    session::AccountSession,
};

#[derive(Serialize)]
struct RoundSummary<'a> {
    round:    u64,
    accounts: Vec<AccountSummary<'a>>,
}

#[derive(Serialize)]
struct AccountSummary<'a> {
    index:        usize,
    display_name: &'a str,
    failure:      Option<&'a FailedRun>,
    report:       Option<&'a RunReport>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let data_path = parse_str(&args, "--data").unwrap_or("data.txt");
    let proxy_path = parse_str(&args, "--proxies");
    let once = args.iter().any(|a| a == "--once");
    let json = args.iter().any(|a| a == "--json");
    let seed = parse_arg(&args, "--seed", chrono::Utc::now().timestamp().unsigned_abs());

    let config = Arc::new(BotConfig::from_env().context("invalid configuration")?);
    let sessions = load_sessions(data_path, proxy_path)?;
    if sessions.is_empty() {
        bail!("no usable accounts in {data_path}");
    }

    if !json {
        println!("Tsubasa Rivals: tsubasa-runner");
        println!("  accounts:  {}", sessions.len());
        println!("  proxies:   {}", proxy_path.unwrap_or("none"));
        println!("  workers:   {}", config.max_workers);
        println!("  interval:  {} min", config.tick_interval_min);
        println!("  seed:      {seed}");
        println!();
    }

    let pool = WorkerPool::new(config.max_workers);
    let mut round = 0u64;
    loop {
        round += 1;
        let round_seed = seed.wrapping_add(round);
        let jobs = sessions
            .iter()
            .cloned()
            .map(|session| AccountJob { session })
            .collect();
        let outcomes = pool.run_all(jobs, |session| run_account(&config, session, round_seed));

        if json {
            print_json(round, &outcomes)?;
        } else {
            print_summary(round, &outcomes);
        }

        if once {
            break;
        }
        log::info!("round {round} done, next one in {} minutes", config.tick_interval_min);
        thread::sleep(config.tick_interval());
    }
    Ok(())
}

fn run_account(config: &Arc<BotConfig>, session: &AccountSession, seed: u64) -> RunResult {
    let mut api = HttpGameApi::new(config, session)?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let jitter = Jitter::new(seed, session.index as u64);
    let mut pacer = Pacer::new(clock, jitter, config.request_delay).with_deadline(config.account_timeout);
    let mut engine = AccountEngine::build(Arc::clone(config));
    engine.run(&mut api, &mut pacer, session)
}

/// One `initData` per line; the proxy file, when given, is matched line by
/// line and must cover every account.
fn load_sessions(data_path: &str, proxy_path: Option<&str>) -> Result<Vec<AccountSession>> {
    let data = fs::read_to_string(data_path).with_context(|| format!("cannot read {data_path}"))?;
    let lines: Vec<&str> = data.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

    let proxies: Vec<String> = match proxy_path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("cannot read {path}"))?
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    };
    if proxy_path.is_some() && proxies.len() < lines.len() {
        bail!(
            "{} accounts but only {} proxies; every account needs its own proxy",
            lines.len(),
            proxies.len()
        );
    }

    let mut sessions = Vec::with_capacity(lines.len());
    for (index, line) in lines.into_iter().enumerate() {
        let proxy = proxies.get(index).cloned();
        match AccountSession::new(index, line, proxy) {
            Ok(session) => sessions.push(session),
            Err(e) => log::warn!("[Account {}] skipped: {e}", index + 1),
        }
    }
    Ok(sessions)
}

fn print_summary(round: u64, outcomes: &[AccountOutcome]) {
    let ok = outcomes.iter().filter(|o| o.is_success()).count();
    println!("=== ROUND {round} ===");
    println!("  accounts ok:    {ok}/{}", outcomes.len());
    for outcome in outcomes {
        match &outcome.result {
            Ok(report) => println!(
                "  [{}] {} | balance {} -> {} | cards {} | taps {} | tasks {}",
                outcome.index + 1,
                outcome.display_name,
                report.start_balance,
                report.final_budget,
                report.cards_upgraded(),
                report.total_taps(),
                report.tasks_completed()
            ),
            Err(failed) => println!(
                "  [{}] {} | FAILED: {} | cards before failing {}",
                outcome.index + 1,
                outcome.display_name,
                failed.reason,
                failed.cards_upgraded()
            ),
        }
    }
    println!();
}

fn print_json(round: u64, outcomes: &[AccountOutcome]) -> Result<()> {
    let summary = RoundSummary {
        round,
        accounts: outcomes
            .iter()
            .map(|o| AccountSummary {
                index:        o.index,
                display_name: &o.display_name,
                failure:      o.result.as_ref().err(),
                report:       o.result.as_ref().ok(),
            })
            .collect(),
    };
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn parse_str<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
