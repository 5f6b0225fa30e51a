//! Application-level configuration: the rules a game session runs under.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the rules file is looked up.
const DEFAULT_CONFIG_PATH: &str = "config/rules.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "PIXELQUIZ_CONFIG_PATH";

/// Questions per round unless configured otherwise.
pub const DEFAULT_ROUND_SIZE: usize = 5;
/// Seconds a question stays open unless configured otherwise.
pub const DEFAULT_QUESTION_SECONDS: u32 = 20;
/// Seconds left on the clock once every player has answered.
pub const DEFAULT_GRACE_SECONDS: u32 = 3;

#[derive(Debug, Clone)]
/// Immutable game rules shared across the application.
pub struct GameRules {
    /// Number of questions per round; the final round may be shorter.
    pub round_size: usize,
    /// How long each question stays open, in whole seconds.
    pub question_seconds: u32,
    /// Countdown remainder applied once every player has answered.
    pub all_answered_grace_seconds: u32,
}

impl GameRules {
    /// Load the rules from disk, falling back to the built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawRules>(&contents) {
                Ok(raw) => {
                    let rules: Self = raw.into();
                    info!(path = %path.display(), ?rules, "loaded game rules from config");
                    rules
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse rules; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "rules file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read rules; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            round_size: DEFAULT_ROUND_SIZE,
            question_seconds: DEFAULT_QUESTION_SECONDS,
            all_answered_grace_seconds: DEFAULT_GRACE_SECONDS,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the rules file; every field is optional so a
/// partial file only overrides what it names.
struct RawRules {
    round_size: Option<usize>,
    question_seconds: Option<u32>,
    all_answered_grace_seconds: Option<u32>,
}

impl From<RawRules> for GameRules {
    fn from(value: RawRules) -> Self {
        Self {
            round_size: value.round_size.unwrap_or(DEFAULT_ROUND_SIZE).max(1),
            question_seconds: value
                .question_seconds
                .unwrap_or(DEFAULT_QUESTION_SECONDS)
                .max(1),
            all_answered_grace_seconds: value
                .all_answered_grace_seconds
                .unwrap_or(DEFAULT_GRACE_SECONDS),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
