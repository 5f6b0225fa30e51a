//! Join code generation and parsing.
//!
//! Games are identified on screen by a short code that players type on their
//! phones. The alphabet excludes characters that are easy to confuse when
//! read off a projector (no `0`/`O`, no `1`/`I`), and parsing is
//! case-insensitive so players can type the code however they like.

use std::{fmt::Display, str::FromStr};

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Number of characters in a join code.
pub const CODE_LENGTH: usize = 6;

/// Characters allowed in a join code, with visually ambiguous ones removed.
const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// A six character join code identifying a game to joining players.
///
/// Always stored normalized to uppercase; lookups are therefore
/// case-insensitive by construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GameCode(String);

/// Error returned when a string does not parse as a join code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseCodeError {
    /// The code does not have exactly [`CODE_LENGTH`] characters.
    #[error("join code must be exactly {CODE_LENGTH} characters")]
    WrongLength,
    /// The code contains a character outside the code alphabet.
    #[error("join code contains invalid character `{0}`")]
    InvalidCharacter(char),
}

impl GameCode {
    /// Generate a random join code.
    ///
    /// Uniqueness is not guaranteed here; the store rejects duplicate codes
    /// with a conflict and game creation retries with a fresh one.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let code = (0..CODE_LENGTH)
            .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    /// The normalized (uppercase) code text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for GameCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for GameCode {
    type Err = ParseCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        if normalized.len() != CODE_LENGTH {
            return Err(ParseCodeError::WrongLength);
        }
        if let Some(bad) = normalized
            .chars()
            .find(|c| !u8::try_from(*c).is_ok_and(|b| ALPHABET.contains(&b)))
        {
            return Err(ParseCodeError::InvalidCharacter(bad));
        }
        Ok(Self(normalized))
    }
}

impl Serialize for GameCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for GameCode {
    fn deserialize<D>(deserializer: D) -> Result<GameCode, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        GameCode::from_str(&s).map_err(serde::de::Error::custom)
    }
}
