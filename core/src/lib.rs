//! Deterministic financial-life simulation core.
//!
//! One player = one `Game` aggregate persisted in SQLite. Every player
//! action runs through [`processor::ActionProcessor`] as an atomic unit
//! of work: load, mutate, append events, commit with an optimistic
//! version check. Randomness comes only from per-purpose seeded streams,
//! so two games with the same seed and action script produce identical
//! event logs.

pub mod action;
pub mod cards;
pub mod config;
pub mod error;
pub mod event;
pub mod formulas;
pub mod game;
pub mod processor;
pub mod rewards;
pub mod rng;
pub mod scenario;
pub mod store;
pub mod types;
