use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::time::SystemTime;
use uuid::Uuid;

use crate::{game_code::GameCode, state::SessionPhase};

/// One play-through instance of a quiz, reachable by its join code.
///
/// Immutable once created; the core never mutates or deletes games.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameRecord {
    /// Primary key of the game.
    pub id: Uuid,
    /// Join code shown on the host screen.
    pub code: GameCode,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
    /// The quiz this game plays.
    pub quiz_id: Uuid,
}

/// A quiz: an ordered, immutable list of questions.
///
/// Owned independently of games; many games may share one quiz.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuizRecord {
    /// Primary key of the quiz.
    pub id: Uuid,
    /// Display name shown in the host's quiz picker.
    pub name: String,
    /// Optional blurb describing the quiz.
    pub description: Option<String>,
    /// The ordered question list.
    pub questions: Vec<QuestionRecord>,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Whether this quiz is offered first in the picker.
    pub is_default: bool,
}

/// A single four-option question.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionRecord {
    /// The question text shown on the shared screen.
    pub prompt: String,
    /// Exactly four answer options.
    pub options: [String; 4],
    /// Index into `options` of the correct answer.
    pub correct: usize,
    /// Optional image shown alongside the prompt.
    pub image: Option<String>,
}

/// A participant who joined a game via its code.
///
/// The score is the only field ever mutated, and it only grows: each
/// accepted answer adds exactly its `points_earned`.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerRecord {
    /// Primary key of the player.
    pub id: Uuid,
    /// The game this player belongs to.
    pub game_id: Uuid,
    /// Display name chosen when joining.
    pub name: String,
    /// Optional self-drawn portrait, as an opaque encoded image blob.
    pub portrait: Option<String>,
    /// Cumulative score, starting at zero.
    pub score: u32,
    /// When the player joined.
    pub joined_at: SystemTime,
}

/// The single shared mutable record every participant watches.
///
/// Exactly one exists per game, created with it in the lobby phase. Only the
/// host writes it, one transition at a time.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionRecord {
    /// The game this session belongs to.
    pub game_id: Uuid,
    /// Current phase of play.
    pub phase: SessionPhase,
    /// 0-based absolute index into the quiz's question list.
    pub current_question: usize,
    /// 1-based round, cached from the question index.
    pub current_round: u32,
    /// When the current question opened; `None` outside question/reveal.
    pub question_started_at: Option<SystemTime>,
}

impl SessionRecord {
    /// The session a freshly created game starts with.
    pub fn lobby(game_id: Uuid) -> Self {
        Self {
            game_id,
            phase: SessionPhase::Lobby,
            current_question: 0,
            current_round: 1,
            question_started_at: None,
        }
    }
}

/// One player's answer to one question. Append-only; at most one exists per
/// (game, player, question) and it is never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerRecord {
    /// Primary key of the answer.
    pub id: Uuid,
    /// The game the answer belongs to.
    pub game_id: Uuid,
    /// The player who answered.
    pub player_id: Uuid,
    /// Absolute index of the question being answered.
    pub question_index: usize,
    /// Index of the chosen option.
    pub choice: usize,
    /// Whether the chosen option was the correct one.
    pub is_correct: bool,
    /// Points the answer earned, already speed-weighted.
    pub points_earned: u32,
    /// When the answer landed.
    pub answered_at: SystemTime,
}
