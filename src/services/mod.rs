/// Host-side game lifecycle and session transitions.
pub mod game_service;
/// Player-facing join and answer submission flow.
pub mod player_service;
/// Converging per-participant views of one game.
pub mod sync_service;
