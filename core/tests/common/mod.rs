//! Scripted in-memory game server shared by the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tsubasa_core::{
    api::{CardLevelUp, DailyRewardInfo, GameApi, StartInfo, Task, TaskCheck, UserUpdate},
    card::Card,
    clock::{day_key_of, Clock, ManualClock},
    config::DelayRange,
    error::{ApiError, ApiResult},
    event::AccountEvent,
    pacing::Pacer,
    rng::Jitter,
    snapshot::{CardSnapshot, DailyCombo},
    step::StepCtx,
    types::{CardId, Coins, TaskId},
};

/// 2023-11-14T22:13:20Z
pub const NOW: i64 = 1_700_000_000;

pub const INIT_DATA: &str = "query_id=AAH&user=%7B%22id%22%3A5512345678%2C%22first_name%22%3A%22Taro%22%2C%22last_name%22%3A%22Misaki%22%7D&auth_date=1700000000&hash=deadbeef";

pub fn today() -> String {
    day_key_of(NOW).unwrap_or_default()
}

/// An unlocked level-0 card with the given id, name and cost.
pub fn card(id: i64, name: &str, cost: Coins) -> Card {
    Card {
        category_id:             CardId::from(1),
        card_id:                 CardId::from(id),
        level:                   0,
        cost,
        unlocked:                true,
        name:                    name.to_string(),
        profit_per_hour:         0.0,
        next_profit_per_hour:    0.0,
        unlock_card_id:          None,
        unlock_card_level:       0,
        level_up_available_date: None,
        end_datetime:            None,
    }
}

/// A card locked behind `prerequisite` at `level`.
pub fn locked_card(id: i64, name: &str, cost: Coins, prerequisite: i64, level: u32) -> Card {
    Card {
        unlocked: false,
        unlock_card_id: Some(CardId::from(prerequisite)),
        unlock_card_level: level,
        ..card(id, name, cost)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Start,
    Snapshot,
    Tap(u64),
    Recover,
    TapLevelUp,
    EnergyLevelUp,
    CardLevelUp(CardId),
    ExecuteTask(TaskId),
    CheckTask(TaskId),
    ClaimDaily,
}

pub struct FakeGame {
    pub cards:           Vec<Card>,
    pub balance:         Coins,
    pub energy:          i64,
    pub max_energy:      i64,
    pub multi_tap_count: i64,
    pub tap_level:       u32,
    pub energy_level:    u32,
    /// Energy handed back by each recovery call; an empty queue rejects.
    pub recoveries:      VecDeque<i64>,
    /// Cards the server refuses with "Wait for cooldown".
    pub server_cooldown: HashSet<CardId>,
    /// Cards the server refuses with a plain 400 (max level reached).
    pub max_level:       HashSet<CardId>,
    /// Added to a card's cost after every level it gains.
    pub cost_growth:     Coins,
    pub combo:           Option<DailyCombo>,
    /// Cards that count toward today's combo when upgraded.
    pub combo_targets:   Vec<CardId>,
    pub tasks:           Vec<Task>,
    pub task_results:    HashMap<TaskId, TaskCheck>,
    pub daily_reward:    Option<DailyRewardInfo>,
    pub reward_claimed:  bool,
    pub fail_start:      bool,
    pub fail_snapshot:   bool,
    pub fail_tap:        bool,
    /// Every card call answers 401 once this is set.
    pub auth_failure:    bool,
    pub calls:           Vec<Call>,
}

impl Default for FakeGame {
    fn default() -> Self {
        Self {
            cards:           Vec::new(),
            balance:         0,
            energy:          0,
            max_energy:      1000,
            multi_tap_count: 1,
            tap_level:       1,
            energy_level:    1,
            recoveries:      VecDeque::new(),
            server_cooldown: HashSet::new(),
            max_level:       HashSet::new(),
            cost_growth:     0,
            combo:           None,
            combo_targets:   Vec::new(),
            tasks:           Vec::new(),
            task_results:    HashMap::new(),
            daily_reward:    None,
            reward_claimed:  false,
            fail_start:      false,
            fail_snapshot:   false,
            fail_tap:        false,
            auth_failure:    false,
            calls:           Vec::new(),
        }
    }
}

impl FakeGame {
    pub fn with_cards(cards: Vec<Card>, balance: Coins) -> Self {
        Self { cards, balance, ..Self::default() }
    }

    pub fn card(&self, id: i64) -> &Card {
        let id = CardId::from(id);
        self.cards
            .iter()
            .find(|c| c.card_id == id)
            .expect("card exists in fake catalogue")
    }

    pub fn upgrade_calls(&self) -> Vec<CardId> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::CardLevelUp(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }

    fn user(&self) -> UserUpdate {
        UserUpdate {
            total_coins:       Some(self.balance),
            energy:            Some(self.energy),
            max_energy:        Some(self.max_energy),
            multi_tap_count:   Some(self.multi_tap_count),
            profit_per_second: Some(1.5),
            tap_level:         Some(self.tap_level),
            energy_level:      Some(self.energy_level),
        }
    }

    fn unlock_dependents(&mut self, id: &CardId, level: u32) {
        for other in self.cards.iter_mut() {
            if !other.unlocked
                && other.unlock_card_id.as_ref() == Some(id)
                && level >= other.required_prerequisite_level()
            {
                other.unlocked = true;
            }
        }
    }

    fn mark_combo(&mut self, id: &CardId) {
        if !self.combo_targets.contains(id) {
            return;
        }
        let today = today();
        let combo = self.combo.get_or_insert_with(DailyCombo::default);
        if combo.date != today {
            combo.card_ids = vec![None; 3];
            combo.date = today;
        }
        if combo.card_ids.iter().flatten().any(|c| c == id) {
            return;
        }
        if let Some(slot) = combo.card_ids.iter_mut().find(|s| s.is_none()) {
            *slot = Some(id.clone());
        }
    }
}

impl GameApi for FakeGame {
    fn start(&mut self) -> ApiResult<StartInfo> {
        self.calls.push(Call::Start);
        if self.fail_start {
            return Err(ApiError::Transport("connection reset".into()));
        }
        Ok(StartInfo {
            user:         self.user(),
            tasks:        self.tasks.clone(),
            daily_reward: self.daily_reward.clone(),
            master_hash:  Some("hash".into()),
        })
    }

    fn card_snapshot(&mut self) -> ApiResult<CardSnapshot> {
        self.calls.push(Call::Snapshot);
        if self.fail_snapshot {
            return Err(ApiError::Transport("timed out".into()));
        }
        Ok(CardSnapshot::new(self.cards.clone(), self.combo.clone()))
    }

    fn tap(&mut self, tap_count: u64) -> ApiResult<UserUpdate> {
        self.calls.push(Call::Tap(tap_count));
        if self.fail_tap {
            return Err(ApiError::Transport("timed out".into()));
        }
        let spent = tap_count as i64 * self.multi_tap_count;
        self.energy = (self.energy - spent).max(0);
        self.balance += spent;
        Ok(self.user())
    }

    fn recover_energy(&mut self) -> ApiResult<UserUpdate> {
        self.calls.push(Call::Recover);
        match self.recoveries.pop_front() {
            Some(energy) => {
                self.energy = energy;
                Ok(UserUpdate {
                    energy: Some(self.energy),
                    max_energy: Some(self.max_energy),
                    ..UserUpdate::default()
                })
            }
            None => Err(ApiError::Rejected { status: 400, message: "no recovery left".into() }),
        }
    }

    fn tap_level_up(&mut self) -> ApiResult<UserUpdate> {
        self.calls.push(Call::TapLevelUp);
        let cost = 1000 * self.tap_level as i64;
        if self.balance < cost {
            return Err(ApiError::InsufficientFunds("not enough coins".into()));
        }
        self.balance -= cost;
        self.tap_level += 1;
        self.multi_tap_count += 1;
        Ok(self.user())
    }

    fn energy_level_up(&mut self) -> ApiResult<UserUpdate> {
        self.calls.push(Call::EnergyLevelUp);
        let cost = 1000 * self.energy_level as i64;
        if self.balance < cost {
            return Err(ApiError::InsufficientFunds("not enough coins".into()));
        }
        self.balance -= cost;
        self.energy_level += 1;
        self.max_energy += 500;
        Ok(self.user())
    }

    fn card_level_up(&mut self, card: &Card) -> ApiResult<CardLevelUp> {
        self.calls.push(Call::CardLevelUp(card.card_id.clone()));
        if self.auth_failure {
            return Err(ApiError::Auth { status: 401 });
        }
        if self.server_cooldown.contains(&card.card_id) {
            return Err(ApiError::Cooldown);
        }
        if self.max_level.contains(&card.card_id) {
            return Err(ApiError::Rejected { status: 400, message: "max level".into() });
        }
        let growth = self.cost_growth;
        let balance = self.balance;
        let Some(server) = self.cards.iter_mut().find(|c| c.card_id == card.card_id) else {
            return Err(ApiError::Rejected { status: 400, message: "unknown card".into() });
        };
        if !server.unlocked {
            return Err(ApiError::Rejected { status: 400, message: "card is locked".into() });
        }
        if balance < server.cost {
            return Err(ApiError::InsufficientFunds("not enough coins".into()));
        }
        self.balance -= server.cost;
        server.level += 1;
        server.cost += growth;
        let (id, level) = (server.card_id.clone(), server.level);
        self.unlock_dependents(&id, level);
        self.mark_combo(&id);
        Ok(CardLevelUp { new_balance: Some(self.balance) })
    }

    fn execute_task(&mut self, task_id: &TaskId) -> ApiResult<()> {
        self.calls.push(Call::ExecuteTask(task_id.clone()));
        Ok(())
    }

    fn check_task(&mut self, task_id: &TaskId) -> ApiResult<TaskCheck> {
        self.calls.push(Call::CheckTask(task_id.clone()));
        Ok(self
            .task_results
            .get(task_id)
            .cloned()
            .unwrap_or(TaskCheck::Pending { description: "not done yet".into() }))
    }

    fn claim_daily_reward(&mut self) -> ApiResult<()> {
        self.calls.push(Call::ClaimDaily);
        if self.reward_claimed {
            return Err(ApiError::Rejected { status: 400, message: "already claimed".into() });
        }
        self.reward_claimed = true;
        Ok(())
    }
}

/// A fake server plus a manual clock and a pacer with no jitter.
pub struct Harness {
    pub game:  FakeGame,
    pub clock: Arc<ManualClock>,
    pub pacer: Pacer,
}

impl Harness {
    pub fn new(game: FakeGame) -> Self {
        Self::with_deadline(game, Duration::from_secs(3_600))
    }

    pub fn with_deadline(game: FakeGame, timeout: Duration) -> Self {
        Self::paced(game, timeout, DelayRange::none())
    }

    pub fn paced(game: FakeGame, timeout: Duration, request_delay: DelayRange) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let clock = Arc::new(ManualClock::at(NOW));
        let shared: Arc<dyn Clock> = clock.clone();
        let pacer = Pacer::new(shared, Jitter::new(7, 0), request_delay).with_deadline(timeout);
        Self { game, clock, pacer }
    }

    /// Run `f` inside a fresh step context; returns its result and events.
    pub fn with_ctx<R>(&mut self, f: impl FnOnce(&mut StepCtx<'_>) -> R) -> (R, Vec<AccountEvent>) {
        let mut ctx = StepCtx::new(&mut self.game, &mut self.pacer, "[Account 1]");
        let result = f(&mut ctx);
        (result, ctx.events)
    }

    pub fn elapsed_secs(&self) -> i64 {
        self.clock.now_unix() - NOW
    }
}
