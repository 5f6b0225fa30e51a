//! In-memory store backend.
//!
//! Keeps every table in a [`DashMap`] and fans change notifications out
//! through per-game broadcast channels. This is the reference backend used
//! by the demo binary and the test suite; durable backends implement the
//! same [`SessionStore`] contract.

use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use futures::{StreamExt, future::BoxFuture};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;
use uuid::Uuid;

use crate::{
    dao::{
        models::{AnswerRecord, GameRecord, PlayerRecord, QuizRecord, SessionRecord},
        session_store::{Change, ChangeStream, SessionPatch, SessionStore},
        storage::{StoreError, StoreResult},
    },
    game_code::GameCode,
};

/// Buffered notifications per (table, game) channel before slow
/// subscribers start losing them.
const CHANNEL_CAPACITY: usize = 64;

/// In-memory [`SessionStore`] implementation.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    quizzes: DashMap<Uuid, QuizRecord>,
    games: DashMap<Uuid, GameRecord>,
    /// Normalized join code -> game id, enforcing code uniqueness.
    codes: DashMap<String, Uuid>,
    /// Keyed by game id: the 1:1 game/session invariant.
    sessions: DashMap<Uuid, SessionRecord>,
    players: DashMap<Uuid, PlayerRecord>,
    answers: DashMap<Uuid, AnswerRecord>,
    /// (game, player, question) -> answer id, enforcing one answer each.
    answer_keys: DashMap<(Uuid, Uuid, usize), Uuid>,
    session_hub: ChangeHub<SessionRecord>,
    player_hub: ChangeHub<PlayerRecord>,
    answer_hub: ChangeHub<AnswerRecord>,
}

/// Per-game broadcast channels for one table's change notifications.
struct ChangeHub<T> {
    channels: DashMap<Uuid, broadcast::Sender<Change<T>>>,
}

impl<T> Default for ChangeHub<T> {
    fn default() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }
}

impl<T: Clone> ChangeHub<T> {
    /// Register a new subscriber for one game's changes.
    fn subscribe(&self, game_id: Uuid) -> broadcast::Receiver<Change<T>> {
        self.channels
            .entry(game_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Notify subscribers of one game, if any, ignoring delivery errors.
    fn publish(&self, game_id: Uuid, change: Change<T>) {
        if let Some(sender) = self.channels.get(&game_id) {
            let _ = sender.send(change);
        }
    }
}

/// Adapt a broadcast receiver into a [`ChangeStream`].
///
/// A subscriber that falls behind the channel capacity skips the lost
/// notifications and keeps going; list-shaped consumers re-query on every
/// notification anyway, and session notifications carry full records.
fn hub_stream<T: Clone + Send + 'static>(mut rx: broadcast::Receiver<Change<T>>) -> ChangeStream<T> {
    async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(change) => yield change,
                Err(RecvError::Closed) => break,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "change subscriber lagged; skipping missed notifications");
                }
            }
        }
    }
    .boxed()
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryInner {
    fn insert_quiz(&self, quiz: QuizRecord) -> StoreResult<QuizRecord> {
        self.quizzes.insert(quiz.id, quiz.clone());
        Ok(quiz)
    }

    fn insert_game(&self, game: GameRecord) -> StoreResult<GameRecord> {
        match self.codes.entry(game.code.as_str().to_owned()) {
            Entry::Occupied(_) => Err(StoreError::conflict(format!(
                "join code `{}` is already in use",
                game.code
            ))),
            Entry::Vacant(slot) => {
                slot.insert(game.id);
                self.games.insert(game.id, game.clone());
                Ok(game)
            }
        }
    }

    fn insert_session(&self, session: SessionRecord) -> StoreResult<SessionRecord> {
        match self.sessions.entry(session.game_id) {
            Entry::Occupied(_) => Err(StoreError::conflict(format!(
                "game `{}` already has a session",
                session.game_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(session.clone());
                self.session_hub
                    .publish(session.game_id, Change::Created(session.clone()));
                Ok(session)
            }
        }
    }

    fn insert_player(&self, player: PlayerRecord) -> StoreResult<PlayerRecord> {
        self.players.insert(player.id, player.clone());
        self.player_hub
            .publish(player.game_id, Change::Created(player.clone()));
        Ok(player)
    }

    fn insert_answer(&self, answer: AnswerRecord) -> StoreResult<AnswerRecord> {
        let key = (answer.game_id, answer.player_id, answer.question_index);
        match self.answer_keys.entry(key) {
            Entry::Occupied(_) => Err(StoreError::conflict(format!(
                "player `{}` already answered question {}",
                answer.player_id, answer.question_index
            ))),
            Entry::Vacant(slot) => {
                slot.insert(answer.id);
                self.answers.insert(answer.id, answer.clone());
                self.answer_hub
                    .publish(answer.game_id, Change::Created(answer.clone()));
                Ok(answer)
            }
        }
    }

    fn update_session(
        &self,
        game_id: Uuid,
        patch: SessionPatch,
    ) -> StoreResult<Option<SessionRecord>> {
        let updated = {
            let Some(mut entry) = self.sessions.get_mut(&game_id) else {
                return Ok(None);
            };
            let session = entry.value_mut();
            if let Some(phase) = patch.phase {
                session.phase = phase;
            }
            if let Some(question) = patch.current_question {
                session.current_question = question;
            }
            if let Some(round) = patch.current_round {
                session.current_round = round;
            }
            if let Some(stamp) = patch.question_started_at {
                session.question_started_at = stamp;
            }
            session.clone()
        };
        self.session_hub
            .publish(game_id, Change::Updated(updated.clone()));
        Ok(Some(updated))
    }

    fn add_player_points(&self, player_id: Uuid, points: u32) -> StoreResult<Option<PlayerRecord>> {
        let updated = {
            let Some(mut entry) = self.players.get_mut(&player_id) else {
                return Ok(None);
            };
            let player = entry.value_mut();
            player.score += points;
            player.clone()
        };
        self.player_hub
            .publish(updated.game_id, Change::Updated(updated.clone()));
        Ok(Some(updated))
    }

    fn list_players(&self, game_id: Uuid) -> Vec<PlayerRecord> {
        let mut players: Vec<PlayerRecord> = self
            .players
            .iter()
            .filter(|entry| entry.value().game_id == game_id)
            .map(|entry| entry.value().clone())
            .collect();
        players.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.joined_at.cmp(&b.joined_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        players
    }

    fn list_answers(&self, game_id: Uuid, question_index: Option<usize>) -> Vec<AnswerRecord> {
        let mut answers: Vec<AnswerRecord> = self
            .answers
            .iter()
            .filter(|entry| {
                let answer = entry.value();
                answer.game_id == game_id
                    && question_index.is_none_or(|index| answer.question_index == index)
            })
            .map(|entry| entry.value().clone())
            .collect();
        answers.sort_by(|a, b| a.answered_at.cmp(&b.answered_at).then_with(|| a.id.cmp(&b.id)));
        answers
    }

    fn list_quizzes(&self) -> Vec<QuizRecord> {
        let mut quizzes: Vec<QuizRecord> = self
            .quizzes
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        quizzes.sort_by(|a, b| {
            b.is_default
                .cmp(&a.is_default)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        quizzes
    }
}

impl SessionStore for MemoryStore {
    fn insert_quiz(&self, quiz: QuizRecord) -> BoxFuture<'static, StoreResult<QuizRecord>> {
        let inner = self.inner.clone();
        Box::pin(async move { inner.insert_quiz(quiz) })
    }

    fn insert_game(&self, game: GameRecord) -> BoxFuture<'static, StoreResult<GameRecord>> {
        let inner = self.inner.clone();
        Box::pin(async move { inner.insert_game(game) })
    }

    fn insert_session(
        &self,
        session: SessionRecord,
    ) -> BoxFuture<'static, StoreResult<SessionRecord>> {
        let inner = self.inner.clone();
        Box::pin(async move { inner.insert_session(session) })
    }

    fn insert_player(
        &self,
        player: PlayerRecord,
    ) -> BoxFuture<'static, StoreResult<PlayerRecord>> {
        let inner = self.inner.clone();
        Box::pin(async move { inner.insert_player(player) })
    }

    fn insert_answer(
        &self,
        answer: AnswerRecord,
    ) -> BoxFuture<'static, StoreResult<AnswerRecord>> {
        let inner = self.inner.clone();
        Box::pin(async move { inner.insert_answer(answer) })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StoreResult<Option<GameRecord>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.games.get(&id).map(|entry| entry.value().clone())) })
    }

    fn find_game_by_code(
        &self,
        code: GameCode,
    ) -> BoxFuture<'static, StoreResult<Option<GameRecord>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let Some(game_id) = inner.codes.get(code.as_str()).map(|entry| *entry.value()) else {
                return Ok(None);
            };
            Ok(inner.games.get(&game_id).map(|entry| entry.value().clone()))
        })
    }

    fn find_quiz(&self, id: Uuid) -> BoxFuture<'static, StoreResult<Option<QuizRecord>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.quizzes.get(&id).map(|entry| entry.value().clone())) })
    }

    fn list_quizzes(&self) -> BoxFuture<'static, StoreResult<Vec<QuizRecord>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.list_quizzes()) })
    }

    fn session(&self, game_id: Uuid) -> BoxFuture<'static, StoreResult<Option<SessionRecord>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.sessions.get(&game_id).map(|entry| entry.value().clone())) })
    }

    fn list_players(&self, game_id: Uuid) -> BoxFuture<'static, StoreResult<Vec<PlayerRecord>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.list_players(game_id)) })
    }

    fn list_answers(
        &self,
        game_id: Uuid,
        question_index: Option<usize>,
    ) -> BoxFuture<'static, StoreResult<Vec<AnswerRecord>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.list_answers(game_id, question_index)) })
    }

    fn update_session(
        &self,
        game_id: Uuid,
        patch: SessionPatch,
    ) -> BoxFuture<'static, StoreResult<Option<SessionRecord>>> {
        let inner = self.inner.clone();
        Box::pin(async move { inner.update_session(game_id, patch) })
    }

    fn add_player_points(
        &self,
        player_id: Uuid,
        points: u32,
    ) -> BoxFuture<'static, StoreResult<Option<PlayerRecord>>> {
        let inner = self.inner.clone();
        Box::pin(async move { inner.add_player_points(player_id, points) })
    }

    fn subscribe_session(&self, game_id: Uuid) -> ChangeStream<SessionRecord> {
        hub_stream(self.inner.session_hub.subscribe(game_id))
    }

    fn subscribe_players(&self, game_id: Uuid) -> ChangeStream<PlayerRecord> {
        hub_stream(self.inner.player_hub.subscribe(game_id))
    }

    fn subscribe_answers(&self, game_id: Uuid) -> ChangeStream<AnswerRecord> {
        hub_stream(self.inner.answer_hub.subscribe(game_id))
    }
}
