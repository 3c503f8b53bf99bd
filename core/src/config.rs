//! Runtime configuration.
//!
//! Loaded once from the environment (after `.env` has been applied by the
//! runner) and handed to every component at construction. Nothing reads the
//! environment after startup.

use crate::types::{Coins, TaskId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.app.ton.tsubasa-rivals.com";

/// Inclusive range of whole seconds to pick a random pause from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DelayRange {
    pub min_secs: u64,
    pub max_secs: u64,
}

impl DelayRange {
    pub const fn new(min_secs: u64, max_secs: u64) -> Self {
        Self { min_secs, max_secs }
    }

    pub const fn none() -> Self {
        Self::new(0, 0)
    }
}

/// Which optional steps of an account run are switched on.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeatureFlags {
    pub auto_task:           bool,
    pub auto_upgrade_card:   bool,
    pub auto_upgrade_tap:    bool,
    pub auto_upgrade_energy: bool,
    pub auto_tap:            bool,
    pub auto_daily_combo:    bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    pub api_base:          String,
    /// Minutes to rest between two rounds over all accounts.
    pub tick_interval_min: u64,
    pub max_workers:       usize,
    /// Ceiling on the price of any single automatic upgrade.
    pub max_upgrade_cost:  Coins,
    pub max_tap_level:     u32,
    pub max_energy_level:  u32,
    pub daily_combo:       Vec<String>,
    pub skip_tasks:        Vec<TaskId>,
    pub features:          FeatureFlags,
    pub request_delay:     DelayRange,
    pub start_delay:       DelayRange,
    pub account_timeout:   Duration,
    pub request_timeout:   Duration,
    pub max_planner_sweeps: usize,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            api_base:          DEFAULT_API_BASE.to_string(),
            tick_interval_min: 8,
            max_workers:       10,
            max_upgrade_cost:  1_000_000,
            max_tap_level:     10,
            max_energy_level:  10,
            daily_combo:       Vec::new(),
            skip_tasks:        Vec::new(),
            features:          FeatureFlags::default(),
            request_delay:     DelayRange::new(1, 5),
            start_delay:       DelayRange::new(1, 15),
            account_timeout:   Duration::from_secs(24 * 60 * 60),
            request_timeout:   Duration::from_secs(15),
            max_planner_sweeps: 500,
        }
    }
}

impl BotConfig {
    /// Load from the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary key lookup. Unset or blank keys keep their
    /// defaults; malformed values are an error naming the key.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let max_workers = match get("MAX_THEADS").or_else(|| get("MAX_THREADS")) {
            Some(raw) => parse_number::<usize>("MAX_THEADS", &raw)?,
            None => defaults.max_workers,
        };
        if max_workers == 0 {
            anyhow::bail!("MAX_THEADS must be at least 1");
        }

        Ok(Self {
            api_base: get("API_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base),
            tick_interval_min: number_or(&get, "TIME_SLEEP", defaults.tick_interval_min)?,
            max_workers,
            max_upgrade_cost: number_or(&get, "MAX_PRICE_UPGRADE_CARD", defaults.max_upgrade_cost)?,
            max_tap_level: number_or(&get, "MAX_LEVEL_TAP", defaults.max_tap_level)?,
            max_energy_level: number_or(&get, "MAX_LEVEL_ENERGY", defaults.max_energy_level)?,
            daily_combo: match get("DAILY_COMBO") {
                Some(raw) => parse_json_list("DAILY_COMBO", &raw)?,
                None => defaults.daily_combo,
            },
            skip_tasks: match get("SKIP_TASKS") {
                Some(raw) => parse_json_list("SKIP_TASKS", &raw)?,
                None => defaults.skip_tasks,
            },
            features: FeatureFlags {
                auto_task:           flag(&get, "AUTO_TASK"),
                auto_upgrade_card:   flag(&get, "AUTO_UPGRADE_CARD"),
                auto_upgrade_tap:    flag(&get, "AUTO_UPGRADE_TAP"),
                auto_upgrade_energy: flag(&get, "AUTO_UPGRADE_ENERGY"),
                auto_tap:            flag(&get, "AUTO_TAP"),
                auto_daily_combo:    flag(&get, "AUTO_DAILY_COMBO"),
            },
            request_delay: delay_or(&get, "DELAY_BETWEEN_REQUESTS", defaults.request_delay)?,
            start_delay: delay_or(&get, "DELAY_START_BOT", defaults.start_delay)?,
            account_timeout: Duration::from_secs(number_or(
                &get,
                "ACCOUNT_TIMEOUT_SECS",
                defaults.account_timeout.as_secs(),
            )?),
            request_timeout: Duration::from_secs(number_or(
                &get,
                "REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )?),
            max_planner_sweeps: number_or(&get, "MAX_PLANNER_SWEEPS", defaults.max_planner_sweeps)?,
        })
    }

    /// Every feature on, no pauses, small deterministic limits.
    /// Used by tests; production code loads from the environment.
    pub fn default_test() -> Self {
        Self {
            api_base: "http://127.0.0.1:9".into(),
            tick_interval_min: 0,
            max_workers: 2,
            max_upgrade_cost: 1_000_000,
            max_tap_level: 5,
            max_energy_level: 5,
            daily_combo: Vec::new(),
            skip_tasks: Vec::new(),
            features: FeatureFlags {
                auto_task:           true,
                auto_upgrade_card:   true,
                auto_upgrade_tap:    true,
                auto_upgrade_energy: true,
                auto_tap:            true,
                auto_daily_combo:    true,
            },
            request_delay: DelayRange::none(),
            start_delay: DelayRange::none(),
            account_timeout: Duration::from_secs(3_600),
            request_timeout: Duration::from_secs(5),
            max_planner_sweeps: 500,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_min * 60)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> anyhow::Result<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| anyhow::anyhow!("{key}: expected a number, got {raw:?}"))
}

fn number_or<T, G>(get: &G, key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => parse_number(key, &raw),
        None => Ok(default),
    }
}

fn flag<G: Fn(&str) -> Option<String>>(get: &G, key: &str) -> bool {
    get(key).is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

/// JSON arrays in `.env` files are often written with single quotes.
fn parse_json_list<T: serde::de::DeserializeOwned>(key: &str, raw: &str) -> anyhow::Result<T> {
    serde_json::from_str(&raw.replace('\'', "\""))
        .map_err(|e| anyhow::anyhow!("{key}: expected a JSON list, got {raw:?}: {e}"))
}

fn delay_or<G: Fn(&str) -> Option<String>>(
    get: &G,
    key: &str,
    default: DelayRange,
) -> anyhow::Result<DelayRange> {
    let Some(raw) = get(key) else {
        return Ok(default);
    };
    let bounds: Vec<u64> = parse_json_list(key, &raw)?;
    match bounds.as_slice() {
        [min, max] if min <= max => Ok(DelayRange::new(*min, *max)),
        _ => anyhow::bail!("{key}: expected [min, max] seconds with min <= max, got {raw:?}"),
    }
}
