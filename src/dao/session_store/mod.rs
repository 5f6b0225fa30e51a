//! The store contract the game core runs against.
//!
//! The core needs point reads, ordered filtered queries, inserts, partial
//! updates, and a change-notification stream per table scoped to one game.
//! Each table's stream delivers its changes in commit order; nothing is
//! guaranteed about interleaving across tables, and consumers must not
//! assume any.

/// In-memory reference backend.
pub mod memory;

use std::time::SystemTime;

use futures::{future::BoxFuture, stream::BoxStream};
use uuid::Uuid;

use crate::{
    dao::{
        models::{AnswerRecord, GameRecord, PlayerRecord, QuizRecord, SessionRecord},
        storage::StoreResult,
    },
    game_code::GameCode,
    state::SessionPhase,
};

/// A single change notification for one record of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change<T> {
    /// A record was inserted.
    Created(T),
    /// A record was updated; carries the full record after the write.
    Updated(T),
    /// A record was deleted, identified by its primary key.
    Deleted(Uuid),
}

/// Stream of change notifications; dropping it releases the subscription.
pub type ChangeStream<T> = BoxStream<'static, Change<T>>;

/// Partial update of a session record.
///
/// Only the fields present are written (last-write-wins per field). The
/// doubly-optional start time distinguishes "stamp it", "clear it", and
/// "leave it alone".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionPatch {
    /// New phase, if it changes.
    pub phase: Option<SessionPhase>,
    /// New question index, if it changes.
    pub current_question: Option<usize>,
    /// New round number, if it changes.
    pub current_round: Option<u32>,
    /// `Some(Some(t))` stamps the question clock, `Some(None)` clears it,
    /// `None` leaves it untouched.
    pub question_started_at: Option<Option<SystemTime>>,
}

/// Abstraction over the persistence layer for games, players, sessions and
/// answers.
///
/// Backends enforce the core's uniqueness invariants as conflicts: join
/// codes are unique across games, a game has at most one session, and a
/// player answers each question at most once.
pub trait SessionStore: Send + Sync {
    /// Insert a quiz.
    fn insert_quiz(&self, quiz: QuizRecord) -> BoxFuture<'static, StoreResult<QuizRecord>>;
    /// Insert a game; conflicts when its join code is already taken.
    fn insert_game(&self, game: GameRecord) -> BoxFuture<'static, StoreResult<GameRecord>>;
    /// Insert a game's session; conflicts when the game already has one.
    fn insert_session(
        &self,
        session: SessionRecord,
    ) -> BoxFuture<'static, StoreResult<SessionRecord>>;
    /// Insert a player.
    fn insert_player(&self, player: PlayerRecord)
    -> BoxFuture<'static, StoreResult<PlayerRecord>>;
    /// Insert an answer; conflicts when the player already answered this
    /// question in this game.
    fn insert_answer(&self, answer: AnswerRecord)
    -> BoxFuture<'static, StoreResult<AnswerRecord>>;

    /// Point read of a game by id.
    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StoreResult<Option<GameRecord>>>;
    /// Point read of a game by its (normalized) join code.
    fn find_game_by_code(
        &self,
        code: GameCode,
    ) -> BoxFuture<'static, StoreResult<Option<GameRecord>>>;
    /// Point read of a quiz by id.
    fn find_quiz(&self, id: Uuid) -> BoxFuture<'static, StoreResult<Option<QuizRecord>>>;
    /// All quizzes, default quizzes first, then newest first.
    fn list_quizzes(&self) -> BoxFuture<'static, StoreResult<Vec<QuizRecord>>>;
    /// Point read of a game's session.
    fn session(&self, game_id: Uuid) -> BoxFuture<'static, StoreResult<Option<SessionRecord>>>;
    /// A game's players, highest score first, earliest join breaking ties.
    fn list_players(&self, game_id: Uuid) -> BoxFuture<'static, StoreResult<Vec<PlayerRecord>>>;
    /// A game's answers in submission order, optionally for one question.
    fn list_answers(
        &self,
        game_id: Uuid,
        question_index: Option<usize>,
    ) -> BoxFuture<'static, StoreResult<Vec<AnswerRecord>>>;

    /// Apply a partial update to a game's session, returning the record
    /// after the write, or `None` when the game has no session.
    fn update_session(
        &self,
        game_id: Uuid,
        patch: SessionPatch,
    ) -> BoxFuture<'static, StoreResult<Option<SessionRecord>>>;
    /// Increment a player's score by exactly `points`, returning the record
    /// after the write, or `None` when the player does not exist.
    fn add_player_points(
        &self,
        player_id: Uuid,
        points: u32,
    ) -> BoxFuture<'static, StoreResult<Option<PlayerRecord>>>;

    /// Subscribe to session changes for one game.
    fn subscribe_session(&self, game_id: Uuid) -> ChangeStream<SessionRecord>;
    /// Subscribe to player changes for one game.
    fn subscribe_players(&self, game_id: Uuid) -> ChangeStream<PlayerRecord>;
    /// Subscribe to answer changes for one game.
    fn subscribe_answers(&self, game_id: Uuid) -> ChangeStream<AnswerRecord>;
}
