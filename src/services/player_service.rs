//! Player-facing flow: joining a game by code and submitting answers.

use std::{sync::Arc, time::SystemTime};

use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::GameRules,
    dao::{
        models::{AnswerRecord, GameRecord, PlayerRecord},
        session_store::SessionStore,
        storage::StoreError,
    },
    error::ServiceError,
    game_code::{GameCode, ParseCodeError},
    quiz::{QuestionBank, scoring},
    state::SessionPhase,
};

/// A request to join a game: the code from the shared screen, a display
/// name, and an optional self-drawn portrait.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct JoinRequest {
    /// Join code as typed by the player, any case.
    pub code: String,
    /// Display name for the roster and scoreboard.
    #[validate(length(min = 1, max = 32))]
    pub name: String,
    /// Optional portrait as an opaque encoded image blob.
    pub portrait: Option<String>,
}

/// One player's answer to the currently open question.
#[derive(Debug, Clone, Copy)]
pub struct SubmitAnswer {
    /// The game being played.
    pub game_id: Uuid,
    /// The submitting player.
    pub player_id: Uuid,
    /// Absolute index of the question the player is answering.
    pub question_index: usize,
    /// Index of the chosen option.
    pub choice: usize,
}

/// Resolve a join code to its game.
///
/// Codes are normalized (trimmed, uppercased) before lookup; an unknown
/// code is `NotFound` so callers can show their "game not found" message
/// and return to the entry screen.
pub async fn lookup_game(
    store: &Arc<dyn SessionStore>,
    code: &str,
) -> Result<GameRecord, ServiceError> {
    let code: GameCode = code
        .parse()
        .map_err(|err: ParseCodeError| ServiceError::InvalidInput(err.to_string()))?;
    store
        .find_game_by_code(code.clone())
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("no game with code `{code}`")))
}

/// Join a game, receiving the player identity scoped to it.
pub async fn join_game(
    store: &Arc<dyn SessionStore>,
    request: JoinRequest,
) -> Result<PlayerRecord, ServiceError> {
    request.validate()?;
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ServiceError::InvalidInput(
            "player name must not be blank".into(),
        ));
    }

    let game = lookup_game(store, &request.code).await?;
    let player = store
        .insert_player(PlayerRecord {
            id: Uuid::new_v4(),
            game_id: game.id,
            name: name.to_owned(),
            portrait: request.portrait,
            score: 0,
            joined_at: SystemTime::now(),
        })
        .await?;

    info!(game_id = %game.id, player_id = %player.id, name = %player.name, "player joined");
    Ok(player)
}

/// Submit an answer to the currently open question.
///
/// The authoritative gate is the session phase, not any countdown: a
/// submission arriving after the phase has left `question` (or aimed at a
/// stale question index) is refused. A duplicate submission for the same
/// question conflicts in the store and is absorbed as a silent no-op,
/// returning `None`; duplicates are not a user-visible failure. An accepted
/// correct answer increments the player's score by exactly the points it
/// earned.
pub async fn submit_answer(
    store: &Arc<dyn SessionStore>,
    rules: &GameRules,
    bank: &QuestionBank,
    submit: SubmitAnswer,
) -> Result<Option<AnswerRecord>, ServiceError> {
    let session = store.session(submit.game_id).await?.ok_or_else(|| {
        ServiceError::NotFound(format!("game `{}` has no session", submit.game_id))
    })?;

    if session.phase != SessionPhase::Question
        || session.current_question != submit.question_index
    {
        return Err(ServiceError::InvalidState(format!(
            "answers are closed for question {}",
            submit.question_index
        )));
    }

    let question = bank.question_at(submit.question_index).ok_or_else(|| {
        ServiceError::InvalidInput(format!(
            "question index {} is out of range",
            submit.question_index
        ))
    })?;
    if submit.choice >= question.options.len() {
        return Err(ServiceError::InvalidInput(format!(
            "choice {} is out of range",
            submit.choice
        )));
    }

    let answered_at = SystemTime::now();
    let is_correct = submit.choice == question.correct;
    // The stamp is always present in the question phase; a missing one
    // would mean a clock we cannot trust, so treat the answer as instant.
    let started_at = session.question_started_at.unwrap_or(answered_at);
    let points = scoring::score(is_correct, started_at, answered_at, rules.question_seconds);

    let answer = AnswerRecord {
        id: Uuid::new_v4(),
        game_id: submit.game_id,
        player_id: submit.player_id,
        question_index: submit.question_index,
        choice: submit.choice,
        is_correct,
        points_earned: points,
        answered_at,
    };

    let answer = match store.insert_answer(answer).await {
        Ok(answer) => answer,
        Err(StoreError::Conflict(_)) => {
            debug!(
                player_id = %submit.player_id,
                question = submit.question_index,
                "duplicate answer ignored"
            );
            return Ok(None);
        }
        Err(err) => return Err(err.into()),
    };

    if points > 0 {
        store
            .add_player_points(submit.player_id, points)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("player `{}` not found", submit.player_id))
            })?;
    }

    debug!(
        player_id = %submit.player_id,
        question = submit.question_index,
        correct = is_correct,
        points,
        "answer recorded"
    );
    Ok(Some(answer))
}
