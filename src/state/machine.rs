//! The session state machine driving a game from lobby to final scoreboard.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{dao::session_store::SessionPatch, quiz::QuestionBank};

/// Coarse-grained phase of a running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Players are joining; nothing has been asked yet.
    Lobby,
    /// The current question is open for answers.
    Question,
    /// The correct answer is on screen; answers are closed.
    Reveal,
    /// Standings after a round, or the final standings.
    Scoreboard,
}

/// External triggers that can advance a session.
///
/// All of them originate from the host, except [`SessionEvent::RevealAnswer`]
/// which the host's countdown fires on expiry as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Leave the lobby and open the first question.
    Start,
    /// Close the current question and show the answer.
    RevealAnswer,
    /// Leave the reveal: next question, or the round/final scoreboard.
    Next,
    /// Leave a round scoreboard and open the next round's first question.
    ContinueRound,
}

/// Error returned when an event cannot be applied in the current phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// Phase the session was in when the event arrived.
    pub from: SessionPhase,
    /// The event that cannot be applied from that phase.
    pub event: SessionEvent,
}

/// A validated transition: the position the session moves to.
///
/// Applying an advance is a single partial update of the one session record;
/// it never touches players or answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advance {
    /// Phase after the transition.
    pub phase: SessionPhase,
    /// Absolute question index after the transition.
    pub current_question: usize,
    /// 1-based round after the transition.
    pub current_round: u32,
}

impl Advance {
    /// Express this advance as a partial session update.
    ///
    /// Entering `question` stamps a fresh start time, entering `scoreboard`
    /// clears it, and `reveal` keeps the stamp so late consumers can still
    /// compute elapsed time for the question just closed.
    pub fn to_patch(&self, now: std::time::SystemTime) -> SessionPatch {
        SessionPatch {
            phase: Some(self.phase),
            current_question: Some(self.current_question),
            current_round: Some(self.current_round),
            question_started_at: match self.phase {
                SessionPhase::Question => Some(Some(now)),
                SessionPhase::Lobby | SessionPhase::Scoreboard => Some(None),
                SessionPhase::Reveal => None,
            },
        }
    }
}

/// Plan the transition an event causes from the given position.
///
/// Pure: the caller reads the authoritative session record, plans, and
/// writes the resulting patch. Returns [`InvalidTransition`] for any event
/// the current phase does not permit, including `ContinueRound` on the final
/// scoreboard, which has no way out.
pub fn plan_advance(
    bank: &QuestionBank,
    phase: SessionPhase,
    current_question: usize,
    event: SessionEvent,
) -> Result<Advance, InvalidTransition> {
    let next = match (phase, event) {
        (SessionPhase::Lobby, SessionEvent::Start) => Advance {
            phase: SessionPhase::Question,
            current_question: 0,
            current_round: 1,
        },
        (SessionPhase::Question, SessionEvent::RevealAnswer) => Advance {
            phase: SessionPhase::Reveal,
            current_question,
            current_round: bank.round_of(current_question),
        },
        (SessionPhase::Reveal, SessionEvent::Next) => {
            if bank.is_last_of_round(current_question) {
                Advance {
                    phase: SessionPhase::Scoreboard,
                    current_question,
                    current_round: bank.round_of(current_question),
                }
            } else {
                open_question(bank, current_question + 1)
            }
        }
        (SessionPhase::Scoreboard, SessionEvent::ContinueRound)
            if !bank.is_last_overall(current_question) =>
        {
            open_question(bank, current_question + 1)
        }
        (from, event) => return Err(InvalidTransition { from, event }),
    };

    Ok(next)
}

/// Position for opening a question at the given index.
fn open_question(bank: &QuestionBank, index: usize) -> Advance {
    Advance {
        phase: SessionPhase::Question,
        current_question: index,
        current_round: bank.round_of(index),
    }
}
