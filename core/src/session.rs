//! Account identity, parsed from the Telegram `initData` blob.
//!
//! The blob is a URL-encoded query string whose `user` field holds a JSON
//! object. This module is the only place that looks inside it.

use crate::error::{BotError, BotResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id:      String,
    pub display_name: String,
}

#[derive(Deserialize)]
struct TelegramUser {
    id:         serde_json::Value,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name:  Option<String>,
    #[serde(default)]
    username:   Option<String>,
}

/// Extract `{ user_id, display_name }` from raw `initData`.
pub fn parse_init_data(init_data: &str) -> BotResult<Identity> {
    let raw = init_data.trim();
    let query = raw.split_once('?').map(|(_, q)| q).unwrap_or(raw);
    // Reuse the URL parser for form decoding of the query string.
    let url = reqwest::Url::parse(&format!("https://init.invalid/?{query}"))
        .map_err(|e| BotError::Session(format!("initData is not a query string: {e}")))?;
    let user_json = url
        .query_pairs()
        .find(|(key, _)| key == "user")
        .map(|(_, value)| value.into_owned())
        .ok_or_else(|| BotError::Session("initData has no user field".into()))?;

    let user: TelegramUser = serde_json::from_str(&user_json)
        .map_err(|e| BotError::Session(format!("user field is not valid JSON: {e}")))?;
    let user_id = match &user.id {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) if !s.is_empty() => s.clone(),
        _ => return Err(BotError::Session("user field has no id".into())),
    };

    let full_name = [user.first_name, user.last_name]
        .into_iter()
        .flatten()
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    let display_name = if !full_name.is_empty() {
        full_name
    } else {
        user.username.unwrap_or_else(|| user_id.clone())
    };

    Ok(Identity { user_id, display_name })
}

/// One configured account: its position in `data.txt`, raw auth blob,
/// parsed identity and optional proxy.
#[derive(Debug, Clone)]
pub struct AccountSession {
    pub index:     usize,
    pub init_data: String,
    pub identity:  Identity,
    pub proxy:     Option<String>,
}

impl AccountSession {
    pub fn new(index: usize, init_data: impl Into<String>, proxy: Option<String>) -> BotResult<Self> {
        let init_data = init_data.into();
        let identity = parse_init_data(&init_data)?;
        Ok(Self { index, init_data, identity, proxy })
    }

    /// Log prefix, numbered from 1 like the accounts file.
    pub fn label(&self) -> String {
        format!("[Account {}]", self.index + 1)
    }
}
