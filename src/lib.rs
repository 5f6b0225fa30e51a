//! Session core of a real-time multiplayer quiz game.
//!
//! A host drives a shared session through lobby, question, reveal, and
//! scoreboard phases; players join via a short code, answer four-option
//! questions against a countdown, and earn speed-weighted scores. The crate
//! provides the state machine, scoring, synchronization feed, countdown, and
//! the store contract they run against; persistence backends and any
//! HTTP/UI surface live outside it.

/// Game rules configuration.
pub mod config;
/// Store contract, records, and the in-memory backend.
pub mod dao;
/// Service-level error types.
pub mod error;
/// Join code generation and parsing.
pub mod game_code;
/// Question bank and scoring.
pub mod quiz;
/// Host, player, and synchronization services.
pub mod services;
/// Session phase state machine.
pub mod state;
/// Host-local countdown.
pub mod timer;
