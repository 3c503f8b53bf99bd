use crate::event::{AccountEvent, RunReport};
use thiserror::Error;

/// Failure of a single game API call.
///
/// Every variant except `Auth` is local to the call that produced it:
/// callers convert it to a tagged outcome and keep going.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("network error: {0}")]
    Transport(String),

    #[error("wait for cooldown")]
    Cooldown,

    #[error("insufficient balance: {0}")]
    InsufficientFunds(String),

    #[error("session rejected by server (HTTP {status})")]
    Auth { status: u16 },

    #[error("unexpected response shape: {0}")]
    Shape(String),

    #[error("request rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },
}

impl ApiError {
    /// Fatal errors abort the whole account run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ApiError::Auth { .. })
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Shape(e.to_string())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Shape(e.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Invalid session data: {0}")]
    Session(String),

    #[error("Account run exceeded its deadline of {secs}s")]
    Timeout { secs: u64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type BotResult<T> = Result<T, BotError>;

/// A run that stopped on a fatal error, with what it did before that.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct AccountFailure {
    pub error:  BotError,
    pub events: Vec<AccountEvent>,
}

impl From<BotError> for AccountFailure {
    fn from(error: BotError) -> Self {
        Self { error, events: Vec::new() }
    }
}

pub type RunResult = Result<RunReport, AccountFailure>;
