/// Core types shared by the game and network layers
use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::network::name_generator;

/// Player name as seen by the piece authority
///
/// A PlayerId must be a valid single-chunk keyexpr:
/// - Non-empty UTF-8 string
/// - Cannot contain: / * $ ? # @
/// - Cannot contain `:` or whitespace, which would break the standings format
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(String);

impl PlayerId {
    /// Generate a readable random name with a numeric suffix
    pub fn generate() -> Self {
        PlayerId(name_generator::generate_unique_name())
    }

    /// Create from a specific name, rejecting names that cannot be used on the wire
    pub fn from_name(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(PlayerId(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(s: &str) -> Result<()> {
        if s.is_empty() {
            return Err(GameError::InvalidPlayerName(
                "Player name cannot be empty".to_string(),
            ));
        }

        for ch in s.chars() {
            if matches!(ch, '/' | '*' | '$' | '?' | '#' | '@' | ':') || ch.is_whitespace() {
                return Err(GameError::InvalidPlayerName(format!(
                    "Player name '{}' contains invalid character '{}'",
                    s, ch
                )));
            }
        }

        Ok(())
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PlayerId {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self> {
        PlayerId::from_name(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        for name in ["alice", "Theron_42", "player-1", "ünïcode"] {
            assert_eq!(PlayerId::from_name(name).unwrap().as_str(), name);
        }
    }

    #[test]
    fn test_invalid_names() {
        for name in ["", "a/b", "a*", "$x", "q?", "#1", "me@host", "a:b", "two words"] {
            assert!(
                matches!(PlayerId::from_name(name), Err(GameError::InvalidPlayerName(_))),
                "'{}' should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_generated_names_are_valid() {
        for _ in 0..20 {
            let id = PlayerId::generate();
            assert!(PlayerId::from_name(id.as_str()).is_ok(), "{}", id);
        }
    }
}
