//! Host-side game lifecycle: creating games and driving session transitions.

use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use tokio::{
    sync::Mutex,
    time::{self, MissedTickBehavior},
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    config::GameRules,
    dao::{
        models::{GameRecord, QuizRecord, SessionRecord},
        session_store::SessionStore,
        storage::StoreError,
    },
    error::ServiceError,
    game_code::GameCode,
    quiz::QuestionBank,
    services::sync_service::{GameFeed, GameView},
    state::{self, SessionEvent, SessionPhase},
    timer::Countdown,
};

/// How often game creation retries a colliding join code before giving up.
const CODE_ATTEMPTS: usize = 5;

/// Quizzes offered to the host when creating a game, default-first.
pub async fn available_quizzes(
    store: &Arc<dyn SessionStore>,
) -> Result<Vec<QuizRecord>, ServiceError> {
    Ok(store.list_quizzes().await?)
}

/// Create a game for the chosen quiz, together with its lobby session.
///
/// The join code is generated client-side; when it collides with an
/// existing game the insert conflicts and a fresh code is tried, a handful
/// of times. The session record is created immediately after the game so
/// observers joining via the code always find one.
pub async fn create_game(
    store: &Arc<dyn SessionStore>,
    quiz_id: Uuid,
) -> Result<(GameRecord, SessionRecord), ServiceError> {
    if store.find_quiz(quiz_id).await?.is_none() {
        return Err(ServiceError::NotFound(format!("quiz `{quiz_id}` not found")));
    }

    for _ in 0..CODE_ATTEMPTS {
        let game = GameRecord {
            id: Uuid::new_v4(),
            code: GameCode::generate(),
            created_at: SystemTime::now(),
            quiz_id,
        };
        match store.insert_game(game).await {
            Ok(game) => {
                let session = store.insert_session(SessionRecord::lobby(game.id)).await?;
                info!(game_id = %game.id, code = %game.code, "created game");
                return Ok((game, session));
            }
            Err(StoreError::Conflict(_)) => {
                debug!("join code collided; retrying with a fresh one");
            }
            Err(err) => return Err(err.into()),
        }
    }

    Err(ServiceError::Conflict(
        "could not allocate a unique join code".into(),
    ))
}

/// The host's handle on one game's session.
///
/// All transitions funnel through here. A gate serializes them so the host
/// never has two writes in flight, and every transition re-reads the
/// authoritative session record before planning, so local state is derived
/// from what was last observed rather than predicted.
pub struct HostController {
    store: Arc<dyn SessionStore>,
    bank: QuestionBank,
    game_id: Uuid,
    gate: Mutex<()>,
}

impl HostController {
    /// Create a controller for one game.
    pub fn new(store: Arc<dyn SessionStore>, bank: QuestionBank, game_id: Uuid) -> Self {
        Self {
            store,
            bank,
            game_id,
            gate: Mutex::new(()),
        }
    }

    /// The question bank this game plays.
    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    /// The game this controller drives.
    pub fn game_id(&self) -> Uuid {
        self.game_id
    }

    /// Leave the lobby and open the first question.
    pub async fn start(&self) -> Result<SessionRecord, ServiceError> {
        self.apply(SessionEvent::Start).await
    }

    /// Close the current question and show the answer.
    ///
    /// Safe to trigger from both the countdown and a host action racing each
    /// other: the gate serializes them and the loser observes the phase
    /// already flipped, returning `None` without writing anything.
    pub async fn reveal(&self) -> Result<Option<SessionRecord>, ServiceError> {
        let _gate = self.gate.lock().await;
        let session = self.current_session().await?;
        if session.phase == SessionPhase::Reveal {
            debug!(game_id = %self.game_id, "reveal already applied; ignoring duplicate trigger");
            return Ok(None);
        }
        let advance = state::plan_advance(
            &self.bank,
            session.phase,
            session.current_question,
            SessionEvent::RevealAnswer,
        )?;
        Ok(Some(self.write(advance).await?))
    }

    /// Leave the reveal: next question, or the round/final scoreboard.
    pub async fn next(&self) -> Result<SessionRecord, ServiceError> {
        self.apply(SessionEvent::Next).await
    }

    /// Leave a round scoreboard and open the next round.
    ///
    /// Rejected on the final scoreboard, which has no way out.
    pub async fn continue_round(&self) -> Result<SessionRecord, ServiceError> {
        self.apply(SessionEvent::ContinueRound).await
    }

    async fn apply(&self, event: SessionEvent) -> Result<SessionRecord, ServiceError> {
        let _gate = self.gate.lock().await;
        let session = self.current_session().await?;
        let advance =
            state::plan_advance(&self.bank, session.phase, session.current_question, event)?;
        self.write(advance).await
    }

    async fn current_session(&self) -> Result<SessionRecord, ServiceError> {
        self.store.session(self.game_id).await?.ok_or_else(|| {
            ServiceError::NotFound(format!("game `{}` has no session", self.game_id))
        })
    }

    async fn write(&self, advance: state::Advance) -> Result<SessionRecord, ServiceError> {
        let patch = advance.to_patch(SystemTime::now());
        let updated = self
            .store
            .update_session(self.game_id, patch)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("game `{}` has no session", self.game_id))
            })?;
        info!(
            game_id = %self.game_id,
            phase = ?updated.phase,
            question = updated.current_question,
            round = updated.current_round,
            "session advanced"
        );
        Ok(updated)
    }
}

/// Whether everyone in the roster has answered the current question.
pub fn everyone_answered(view: &GameView) -> bool {
    view.session.phase == SessionPhase::Question
        && !view.players.is_empty()
        && view.answered_count(view.session.current_question) >= view.players.len()
}

/// Run the host's side of one question phase to completion.
///
/// Owns the one-second cadence of the countdown while folding feed updates
/// into the host's view. Once every player has answered and more than the
/// grace window remains, the countdown is restarted at the grace window, so
/// the reveal still arrives through the normal completion path instead of
/// abruptly. Returns once the session has moved to reveal, whether this
/// loop's countdown triggered it or a racing host action did.
pub async fn run_question_phase(
    ctrl: &HostController,
    rules: &GameRules,
    view: &mut GameView,
    feed: &mut GameFeed,
) -> Result<(), ServiceError> {
    let grace = rules.all_answered_grace_seconds;
    let mut countdown = Countdown::new(rules.question_seconds);
    countdown.start();
    if everyone_answered(view) && countdown.remaining() > grace {
        countdown.restart(Some(grace));
    }

    let mut ticks = time::interval(Duration::from_secs(1));
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // An interval's first tick completes immediately; consume it so the
    // countdown starts a full second out.
    ticks.tick().await;

    loop {
        tokio::select! {
            _ = ticks.tick() => {
                if countdown.tick() {
                    let _ = ctrl.reveal().await?;
                    return Ok(());
                }
            }
            update = feed.next() => {
                let Some(update) = update else {
                    return Err(ServiceError::InvalidState(
                        "change feed closed while a question was running".into(),
                    ));
                };
                view.apply(update);
                if view.session.phase == SessionPhase::Reveal {
                    return Ok(());
                }
                if everyone_answered(view) && countdown.remaining() > grace {
                    debug!(
                        game_id = %ctrl.game_id(),
                        grace,
                        "all players answered; shortening countdown"
                    );
                    countdown.restart(Some(grace));
                }
            }
        }
    }
}
