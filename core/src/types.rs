//! Shared primitive types used across the whole client.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// In-game currency. The server reports it as an integer balance.
pub type Coins = i64;

/// Seconds since the Unix epoch, as the game API reports timestamps.
pub type UnixTime = i64;

/// An identifier issued by the game server.
///
/// The API is inconsistent about ids: some endpoints send JSON numbers,
/// others strings. Both are normalised to a string here and re-emitted as a
/// number when they look numeric, so request payloads match what the server
/// handed out.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct GameId(String);

impl GameId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// JSON form for request bodies.
    pub fn to_json(&self) -> serde_json::Value {
        match self.0.parse::<i64>() {
            Ok(n) => serde_json::Value::from(n),
            Err(_) => serde_json::Value::from(self.0.clone()),
        }
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GameId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<i64> for GameId {
    fn from(raw: i64) -> Self {
        Self(raw.to_string())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Int(i64),
    Float(f64),
    Text(String),
}

impl<'de> Deserialize<'de> for GameId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawId::deserialize(deserializer)? {
            RawId::Int(n) => GameId(n.to_string()),
            RawId::Float(f) => GameId((f as i64).to_string()),
            RawId::Text(s) => GameId(s),
        })
    }
}

pub type CardId = GameId;
pub type CategoryId = GameId;
pub type TaskId = GameId;
