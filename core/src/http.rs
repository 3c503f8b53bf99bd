//! `reqwest` adapter for the game API.
//!
//! RULE: only this module knows URLs, headers and status codes. Everything
//! it returns is already classified into `ApiError`.

use crate::{
    api::{CardLevelUp, GameApi, StartInfo, TaskCheck, UserUpdate},
    card::Card,
    config::BotConfig,
    error::{ApiError, ApiResult, BotError, BotResult},
    session::AccountSession,
    snapshot::CardSnapshot,
    types::TaskId,
    wire::{self, Envelope},
};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, ORIGIN, REFERER, USER_AGENT};
use serde_json::{json, Value};

const WEB_ORIGIN: &str = "https://app.ton.tsubasa-rivals.com";
const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/115.0.0.0 Safari/537.36";
/// Sent until `/api/start` hands out the current one.
const INITIAL_MASTER_HASH: &str =
    "fcd309c672b6ede14f2416cca64caa8ceae4040470f67e83a6964aeb68594bbc";
const COOLDOWN_MESSAGE: &str = "Wait for cooldown";

pub struct HttpGameApi {
    client:      Client,
    base_url:    String,
    init_data:   String,
    master_hash: String,
}

impl HttpGameApi {
    pub fn new(config: &BotConfig, session: &AccountSession) -> BotResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ORIGIN, HeaderValue::from_static(WEB_ORIGIN));
        headers.insert(REFERER, HeaderValue::from_static("https://app.ton.tsubasa-rivals.com/"));
        headers.insert(USER_AGENT, HeaderValue::from_static(DESKTOP_USER_AGENT));
        let player_id = HeaderValue::from_str(&session.identity.user_id)
            .map_err(|e| BotError::Session(format!("user id is not a valid header: {e}")))?;
        headers.insert("x-player-id", player_id);

        let mut builder = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout);
        builder = match &session.proxy {
            Some(proxy) => {
                let proxy = reqwest::Proxy::all(proxy.as_str())
                    .map_err(|e| BotError::Config(format!("invalid proxy {proxy}: {e}")))?;
                builder.proxy(proxy)
            }
            // Only proxies from the proxy file are used.
            None => builder.no_proxy(),
        };
        let client = builder
            .build()
            .map_err(|e| BotError::Config(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.api_base.clone(),
            init_data: session.init_data.clone(),
            master_hash: INITIAL_MASTER_HASH.to_string(),
        })
    }

    /// POST and return the raw body of a 2xx response.
    fn send(&self, path: &str, mut body: Value) -> ApiResult<String> {
        body["initData"] = Value::from(self.init_data.as_str());
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .header("x-masterhash", self.master_hash.as_str())
            .json(&body)
            .send()?;
        let status = response.status().as_u16();
        let text = response.text()?;
        log::debug!("POST {path} -> {status}");
        if !(200..300).contains(&status) {
            return Err(classify(status, &text));
        }
        Ok(text)
    }

    /// POST where the caller needs the response body.
    fn post(&self, path: &str, body: Value) -> ApiResult<Envelope> {
        wire::parse_envelope(&self.send(path, body)?)
    }
}

/// Read a successful `card/levelup` body. Any 2xx counts as bought, so an
/// unreadable body only loses the balance hint.
pub fn card_level_up_result(body: &str) -> CardLevelUp {
    let new_balance = wire::parse_envelope(body)
        .and_then(wire::user_update)
        .ok()
        .and_then(|u| u.total_coins);
    CardLevelUp { new_balance }
}

/// Map a non-2xx response onto the error taxonomy.
pub fn classify(status: u16, body: &str) -> ApiError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().chars().take(200).collect());

    match status {
        401 | 403 => ApiError::Auth { status },
        400 if message == COOLDOWN_MESSAGE => ApiError::Cooldown,
        400 if is_insufficient(&message) => ApiError::InsufficientFunds(message),
        408 | 429 | 500..=599 => ApiError::Transport(format!("HTTP {status}: {message}")),
        _ => ApiError::Rejected { status, message },
    }
}

fn is_insufficient(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("not enough") || lower.contains("insufficient")
}

impl GameApi for HttpGameApi {
    fn start(&mut self) -> ApiResult<StartInfo> {
        let env = self.post("/api/start", json!({ "lang_code": "en" }))?;
        let info = wire::start_info(env)?;
        if let Some(hash) = &info.master_hash {
            self.master_hash = hash.clone();
        }
        Ok(info)
    }

    fn card_snapshot(&mut self) -> ApiResult<CardSnapshot> {
        let env = self.post("/api/start", json!({ "lang_code": "en" }))?;
        wire::card_snapshot(env)
    }

    fn tap(&mut self, tap_count: u64) -> ApiResult<UserUpdate> {
        wire::user_update(self.post("/api/tap", json!({ "tapCount": tap_count }))?)
    }

    fn recover_energy(&mut self) -> ApiResult<UserUpdate> {
        wire::user_update(self.post("/api/energy/recovery", json!({}))?)
    }

    fn tap_level_up(&mut self) -> ApiResult<UserUpdate> {
        wire::user_update(self.post("/api/tap/levelup", json!({}))?)
    }

    fn energy_level_up(&mut self) -> ApiResult<UserUpdate> {
        wire::user_update(self.post("/api/energy/levelup", json!({}))?)
    }

    fn card_level_up(&mut self, card: &Card) -> ApiResult<CardLevelUp> {
        let body = self.send(
            "/api/card/levelup",
            json!({
                "category_id": card.category_id.to_json(),
                "card_id": card.card_id.to_json(),
            }),
        )?;
        Ok(card_level_up_result(&body))
    }

    fn execute_task(&mut self, task_id: &TaskId) -> ApiResult<()> {
        self.send("/api/task/execute", json!({ "task_id": task_id.to_json() }))
            .map(|_| ())
    }

    fn check_task(&mut self, task_id: &TaskId) -> ApiResult<TaskCheck> {
        let env = self.post("/api/task/achievement", json!({ "task_id": task_id.to_json() }))?;
        Ok(wire::task_check(env, task_id))
    }

    fn claim_daily_reward(&mut self) -> ApiResult<()> {
        self.send("/api/daily_reward/claim", json!({})).map(|_| ())
    }
}
