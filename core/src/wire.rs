//! JSON shapes of game API responses and their mapping onto domain types.
//!
//! The server is loose with types (numbers as strings, floats for integer
//! balances, `0` for "no timestamp"), so every scalar is read leniently and
//! required structure is checked explicitly, producing `ApiError::Shape`.

use crate::{
    api::{DailyRewardInfo, StartInfo, Task, TaskCheck, UserUpdate, TASK_COMPLETE},
    card::Card,
    error::{ApiError, ApiResult},
    snapshot::{CardSnapshot, DailyCombo},
    types::{GameId, TaskId},
};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Envelope {
    #[serde(default)]
    game_data:         Option<GameData>,
    #[serde(default)]
    card_info:         Option<Vec<WireCategory>>,
    #[serde(default)]
    task_info:         Option<Vec<WireTask>>,
    #[serde(default)]
    daily_combo:       Option<WireCombo>,
    #[serde(default)]
    user_daily_reward: Option<WireDailyReward>,
    #[serde(default)]
    master_hash:       Option<String>,
    #[serde(default)]
    update:            Option<WireUpdate>,
}

#[derive(Debug, Default, Deserialize)]
struct GameData {
    #[serde(default)]
    user: Option<WireUser>,
}

#[derive(Debug, Default, Deserialize)]
struct WireUser {
    #[serde(default, deserialize_with = "lenient_i64")]
    total_coins:       Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    energy:            Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    max_energy:        Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    multi_tap_count:   Option<i64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    profit_per_second: Option<f64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    tap_level:         Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    energy_level:      Option<i64>,
}

#[derive(Debug, Deserialize)]
struct WireCategory {
    #[serde(default)]
    category:  Option<GameId>,
    #[serde(default)]
    card_list: Vec<WireCard>,
}

#[derive(Debug, Deserialize)]
struct WireCard {
    id: GameId,
    #[serde(default)]
    category: Option<GameId>,
    #[serde(default, deserialize_with = "lenient_i64")]
    level: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    cost: Option<i64>,
    #[serde(default)]
    unlocked: Option<bool>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    profit_per_hour: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    next_profit_per_hour: Option<f64>,
    #[serde(default)]
    unlock_card_id: Option<GameId>,
    #[serde(default, deserialize_with = "lenient_i64")]
    unlock_card_level: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    level_up_available_date: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    end_datetime: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct WireTask {
    id: GameId,
    #[serde(default)]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    status: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    reward: Option<i64>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireCombo {
    #[serde(default)]
    card_ids: Vec<Option<GameId>>,
    #[serde(default, deserialize_with = "lenient_string")]
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireDailyReward {
    #[serde(default, deserialize_with = "lenient_i64")]
    last_update: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    consecutive_count: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct WireUpdate {
    #[serde(default)]
    task: Option<WireTask>,
}

fn value_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f as i64),
        _ => None,
    }
}

fn lenient_i64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?.as_ref().and_then(value_i64))
}

fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn level(raw: Option<i64>) -> u32 {
    raw.map(|v| v.clamp(0, u32::MAX as i64) as u32).unwrap_or(0)
}

/// Server timestamps use `0` for "not set".
fn timestamp(raw: Option<i64>) -> Option<i64> {
    raw.filter(|t| *t > 0)
}

impl From<WireUser> for UserUpdate {
    fn from(u: WireUser) -> Self {
        Self {
            total_coins:       u.total_coins,
            energy:            u.energy,
            max_energy:        u.max_energy,
            multi_tap_count:   u.multi_tap_count,
            profit_per_second: u.profit_per_second,
            tap_level:         u.tap_level.map(|v| level(Some(v))),
            energy_level:      u.energy_level.map(|v| level(Some(v))),
        }
    }
}

impl WireCard {
    fn into_card(self, group_category: Option<&GameId>) -> Card {
        let category_id = self
            .category
            .or_else(|| group_category.cloned())
            .unwrap_or_else(|| GameId::new(""));
        Card {
            category_id,
            name: self.name.unwrap_or_else(|| self.id.to_string()),
            card_id: self.id,
            level: level(self.level),
            cost: self.cost.unwrap_or(0),
            unlocked: self.unlocked.unwrap_or(false),
            profit_per_hour: self.profit_per_hour.unwrap_or(0.0),
            next_profit_per_hour: self.next_profit_per_hour.unwrap_or(0.0),
            unlock_card_id: self.unlock_card_id,
            unlock_card_level: level(self.unlock_card_level),
            level_up_available_date: timestamp(self.level_up_available_date),
            end_datetime: timestamp(self.end_datetime),
        }
    }
}

impl From<WireTask> for Task {
    fn from(t: WireTask) -> Self {
        Self {
            title:  t.title.unwrap_or_default(),
            id:     t.id,
            status: t.status.unwrap_or(0).clamp(0, u8::MAX as i64) as u8,
            reward: t.reward.unwrap_or(0),
        }
    }
}

pub(crate) fn parse_envelope(body: &str) -> ApiResult<Envelope> {
    if body.trim().is_empty() {
        return Ok(Envelope::default());
    }
    Ok(serde_json::from_str(body)?)
}

pub(crate) fn user_update(env: Envelope) -> ApiResult<UserUpdate> {
    env.game_data
        .and_then(|g| g.user)
        .map(UserUpdate::from)
        .ok_or_else(|| ApiError::Shape("missing game_data.user".into()))
}

pub(crate) fn start_info(env: Envelope) -> ApiResult<StartInfo> {
    let tasks = env
        .task_info
        .unwrap_or_default()
        .into_iter()
        .map(Task::from)
        .collect();
    let daily_reward = env.user_daily_reward.map(|d| DailyRewardInfo {
        last_update:       d.last_update.unwrap_or(0),
        consecutive_count: level(d.consecutive_count),
    });
    let master_hash = env.master_hash.filter(|h| !h.is_empty());
    let user = env
        .game_data
        .and_then(|g| g.user)
        .map(UserUpdate::from)
        .ok_or_else(|| ApiError::Shape("missing game_data.user".into()))?;
    Ok(StartInfo { user, tasks, daily_reward, master_hash })
}

pub(crate) fn card_snapshot(env: Envelope) -> ApiResult<CardSnapshot> {
    let categories = env
        .card_info
        .ok_or_else(|| ApiError::Shape("missing card_info".into()))?;
    let cards = categories
        .into_iter()
        .flat_map(|group| {
            let category = group.category;
            group
                .card_list
                .into_iter()
                .map(move |card| card.into_card(category.as_ref()))
                .collect::<Vec<_>>()
        })
        .collect();
    let daily_combo = env.daily_combo.map(|c| DailyCombo {
        card_ids: c.card_ids,
        date:     c.date.unwrap_or_default(),
    });
    Ok(CardSnapshot::new(cards, daily_combo))
}

pub(crate) fn task_check(env: Envelope, task_id: &TaskId) -> TaskCheck {
    let from_list = env
        .task_info
        .unwrap_or_default()
        .into_iter()
        .find(|t| &t.id == task_id);
    let updated = from_list.or_else(|| env.update.and_then(|u| u.task));
    match updated {
        Some(t) if t.status == Some(TASK_COMPLETE as i64) => TaskCheck::Completed {
            reward: t.reward.unwrap_or(0),
        },
        Some(t) => TaskCheck::Pending {
            description: t
                .description
                .unwrap_or_else(|| "conditions not met or manual action required".into()),
        },
        None => TaskCheck::Pending {
            description: "conditions not met or manual action required".into(),
        },
    }
}
