//! The game API seam.
//!
//! RULE: steps talk to the server only through `GameApi`. The HTTP adapter
//! lives in `http.rs`; tests substitute a scripted fake.

use crate::{
    card::Card,
    error::ApiResult,
    snapshot::CardSnapshot,
    types::{Coins, TaskId, UnixTime},
};
use serde::{Deserialize, Serialize};

pub trait GameApi: Send {
    /// `/api/start`: account state, open tasks, check-in info.
    fn start(&mut self) -> ApiResult<StartInfo>;

    /// `/api/start` again, reading the card catalogue and daily combo.
    fn card_snapshot(&mut self) -> ApiResult<CardSnapshot>;

    fn tap(&mut self, tap_count: u64) -> ApiResult<UserUpdate>;

    fn recover_energy(&mut self) -> ApiResult<UserUpdate>;

    fn tap_level_up(&mut self) -> ApiResult<UserUpdate>;

    fn energy_level_up(&mut self) -> ApiResult<UserUpdate>;

    /// Raise `card` by one level. `Err(ApiError::Cooldown)` when the
    /// server answers "Wait for cooldown".
    fn card_level_up(&mut self, card: &Card) -> ApiResult<CardLevelUp>;

    fn execute_task(&mut self, task_id: &TaskId) -> ApiResult<()>;

    fn check_task(&mut self, task_id: &TaskId) -> ApiResult<TaskCheck>;

    fn claim_daily_reward(&mut self) -> ApiResult<()>;
}

/// Partial view of `game_data.user`; endpoints return different subsets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserUpdate {
    pub total_coins:       Option<Coins>,
    pub energy:            Option<i64>,
    pub max_energy:        Option<i64>,
    pub multi_tap_count:   Option<i64>,
    pub profit_per_second: Option<f64>,
    pub tap_level:         Option<u32>,
    pub energy_level:      Option<u32>,
}

/// Tap-related account state. Always taken from the latest response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TapState {
    pub energy:            i64,
    pub max_energy:        i64,
    pub multi_tap_count:   i64,
    pub total_coins:       Coins,
    pub tap_level:         u32,
    pub energy_level:      u32,
    pub profit_per_second: f64,
}

impl TapState {
    pub fn from_update(update: &UserUpdate) -> Self {
        let mut state = Self::default();
        state.apply(update);
        state
    }

    /// Overwrite every field the response carried.
    pub fn apply(&mut self, update: &UserUpdate) {
        if let Some(v) = update.total_coins { self.total_coins = v; }
        if let Some(v) = update.energy { self.energy = v; }
        if let Some(v) = update.max_energy { self.max_energy = v; }
        if let Some(v) = update.multi_tap_count { self.multi_tap_count = v; }
        if let Some(v) = update.profit_per_second { self.profit_per_second = v; }
        if let Some(v) = update.tap_level { self.tap_level = v; }
        if let Some(v) = update.energy_level { self.energy_level = v; }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id:     TaskId,
    pub title:  String,
    /// 0 = new, 1 = started, 2 = complete.
    pub status: u8,
    pub reward: Coins,
}

pub const TASK_COMPLETE: u8 = 2;

impl Task {
    pub fn is_open(&self) -> bool {
        self.status == 0 || self.status == 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TaskCheck {
    Completed { reward: Coins },
    Pending { description: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyRewardInfo {
    pub last_update:       UnixTime,
    pub consecutive_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StartInfo {
    pub user:         UserUpdate,
    pub tasks:        Vec<Task>,
    pub daily_reward: Option<DailyRewardInfo>,
    pub master_hash:  Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardLevelUp {
    /// Balance after the upgrade, when the response carried one.
    pub new_balance: Option<Coins>,
}
