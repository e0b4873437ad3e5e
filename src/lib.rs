//! rusty-ship: a Battleship-variant rules engine and probabilistic
//! targeting bot, playing a 12x12, six-ship, avenger-power-up variant
//! across 200 boards per game.
//!
//! `geometry`/`board`/`placement` are the authoritative rules engine;
//! `belief`/`propagate`/`enumerate`/`targeting`/`bias` are the bot's
//! inference and targeting stack; `storage`/`session`/`http`/`config` are
//! the ambient server plumbing described in the design notes.

pub mod belief;
pub mod bias;
pub mod board;
pub mod config;
pub mod enumerate;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod http;
pub mod placement;
pub mod propagate;
pub mod session;
pub mod storage;
pub mod targeting;
