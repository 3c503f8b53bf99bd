//! tsubasa-core: per-account automation for the Tsubasa Rivals web game.
//!
//! The interesting part is card spending: `resolver` walks unlock chains,
//! `planner` buys the most profitable affordable upgrade sweep after sweep.
//! Everything else (tapping, check-in, tasks, daily combo) is a step the
//! `engine` runs in a fixed order, and `pool` runs many accounts at once.

pub mod api;
pub mod card;
pub mod clock;
pub mod combo;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod http;
pub mod pacing;
pub mod planner;
pub mod pool;
pub mod resolver;
pub mod rng;
pub mod session;
pub mod snapshot;
pub mod step;
pub mod tap;
pub mod tasks;
pub mod types;
pub mod upgrade;

mod wire;
