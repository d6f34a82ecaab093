//! Line-oriented text messages exchanged with the piece authority
//!
//! ```text
//! player -> authority: PIECE | SCORE <n> | LIVES <n> | DIE | SCORES
//!                      HISCORES | HISCORE <name:score>
//! authority -> player: PIECE <id> | SCORES <name:score:lives>\n...
//!                      HISCORES <name:score>\n... | NEWSCORE
//! ```
//!
//! A dead player is listed as `name:score:DEAD` in the standings.
//! `HISCORES` is the online high-score list kept by the authority;
//! `NEWSCORE` acknowledges a submitted score that entered it.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::piece::PIECE_COUNT;
use crate::scores::ScoreEntry;

/// Messages sent by a player
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// Request one piece identifier
    Piece,
    /// Report the running score
    Score(u32),
    /// Report remaining lives
    Lives(u32),
    /// The player's game has ended
    Die,
    /// Request the current standings
    Scores,
    /// Request the online high-score list
    HiScores,
    /// Submit a score to the online high-score list
    HiScore(ScoreEntry),
}

impl std::fmt::Display for ClientMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientMessage::Piece => write!(f, "PIECE"),
            ClientMessage::Score(score) => write!(f, "SCORE {}", score),
            ClientMessage::Lives(lives) => write!(f, "LIVES {}", lives),
            ClientMessage::Die => write!(f, "DIE"),
            ClientMessage::Scores => write!(f, "SCORES"),
            ClientMessage::HiScores => write!(f, "HISCORES"),
            ClientMessage::HiScore(entry) => write!(f, "HISCORE {}", entry),
        }
    }
}

fn parse_number(command: &str, value: Option<&str>) -> Result<u32, GameError> {
    value
        .and_then(|v| v.trim().parse().ok())
        .ok_or_else(|| GameError::InvalidMessage(format!("{} needs a number", command)))
}

impl FromStr for ClientMessage {
    type Err = GameError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (command, rest) = match line.split_once(' ') {
            Some((command, rest)) => (command, Some(rest)),
            None => (line, None),
        };
        match command {
            "PIECE" => Ok(ClientMessage::Piece),
            "SCORE" => Ok(ClientMessage::Score(parse_number(command, rest)?)),
            "LIVES" => Ok(ClientMessage::Lives(parse_number(command, rest)?)),
            "DIE" => Ok(ClientMessage::Die),
            "SCORES" => Ok(ClientMessage::Scores),
            "HISCORES" => Ok(ClientMessage::HiScores),
            "HISCORE" => rest
                .ok_or_else(|| GameError::InvalidMessage("HISCORE needs name:score".to_string()))?
                .parse()
                .map(ClientMessage::HiScore),
            _ => Err(GameError::InvalidMessage(line.to_string())),
        }
    }
}

/// One player's line in the standings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub name: String,
    pub score: u32,
    /// Remaining lives, `None` once the player is dead
    pub lives: Option<u32>,
}

impl std::fmt::Display for Standing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.lives {
            Some(lives) => write!(f, "{}:{}:{}", self.name, self.score, lives),
            None => write!(f, "{}:{}:DEAD", self.name, self.score),
        }
    }
}

impl FromStr for Standing {
    type Err = GameError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let invalid = || GameError::InvalidMessage(format!("bad standing '{}'", line));
        let mut parts = line.trim().split(':');
        let name = parts.next().filter(|n| !n.is_empty()).ok_or_else(invalid)?;
        let score = parts
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(invalid)?;
        let lives = match parts.next() {
            Some("DEAD") => None,
            Some(lives) => Some(lives.parse().map_err(|_| invalid())?),
            None => return Err(invalid()),
        };
        Ok(Standing {
            name: name.to_string(),
            score,
            lives,
        })
    }
}

/// Messages sent by the piece authority
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Deliver one piece identifier
    Piece(u8),
    /// Current standings of every player
    Scores(Vec<Standing>),
    /// Online high-score list, best first
    HiScores(Vec<ScoreEntry>),
    /// A submitted score entered the online list
    NewScore,
}

fn write_lines<T: std::fmt::Display>(f: &mut std::fmt::Formatter<'_>, items: &[T]) -> std::fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            writeln!(f)?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

fn parse_lines<T: FromStr<Err = GameError>>(text: &str) -> Result<Vec<T>, GameError> {
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .map(str::parse)
        .collect()
}

impl std::fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerMessage::Piece(id) => write!(f, "PIECE {}", id),
            ServerMessage::Scores(standings) => {
                write!(f, "SCORES ")?;
                write_lines(f, standings)
            }
            ServerMessage::HiScores(entries) => {
                write!(f, "HISCORES ")?;
                write_lines(f, entries)
            }
            ServerMessage::NewScore => write!(f, "NEWSCORE"),
        }
    }
}

impl FromStr for ServerMessage {
    type Err = GameError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        match command {
            "PIECE" => {
                let id: i64 = rest
                    .trim()
                    .parse()
                    .map_err(|_| GameError::InvalidMessage(line.to_string()))?;
                if !(0..PIECE_COUNT as i64).contains(&id) {
                    return Err(GameError::InvalidPiece(id));
                }
                Ok(ServerMessage::Piece(id as u8))
            }
            "SCORES" => parse_lines(rest).map(ServerMessage::Scores),
            "HISCORES" => parse_lines(rest).map(ServerMessage::HiScores),
            "NEWSCORE" => Ok(ServerMessage::NewScore),
            _ => Err(GameError::InvalidMessage(line.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_messages_on_the_wire() {
        assert_eq!(ClientMessage::Piece.to_string(), "PIECE");
        assert_eq!(ClientMessage::Score(420).to_string(), "SCORE 420");
        assert_eq!(ClientMessage::Lives(2).to_string(), "LIVES 2");
        assert_eq!(ClientMessage::Die.to_string(), "DIE");
        assert_eq!("SCORE 17\n".parse::<ClientMessage>().unwrap(), ClientMessage::Score(17));
        assert_eq!(" DIE ".parse::<ClientMessage>().unwrap(), ClientMessage::Die);
    }

    #[test]
    fn test_client_message_rejects_garbage() {
        assert!("SCORE".parse::<ClientMessage>().is_err());
        assert!("SCORE lots".parse::<ClientMessage>().is_err());
        assert!("HELLO".parse::<ClientMessage>().is_err());
        assert!("HISCORE".parse::<ClientMessage>().is_err());
        assert!("HISCORE ann".parse::<ClientMessage>().is_err());
    }

    #[test]
    fn test_hiscore_messages() {
        let submit = ClientMessage::HiScore(ScoreEntry::new("ann", 640));
        assert_eq!(submit.to_string(), "HISCORE ann:640");
        assert_eq!("HISCORE ann:640".parse::<ClientMessage>().unwrap(), submit);
        assert_eq!("HISCORES".parse::<ClientMessage>().unwrap(), ClientMessage::HiScores);

        let list = "HISCORES Garnet:1200\nann:640";
        let parsed = list.parse::<ServerMessage>().unwrap();
        assert_eq!(
            parsed,
            ServerMessage::HiScores(vec![ScoreEntry::new("Garnet", 1200), ScoreEntry::new("ann", 640)])
        );
        assert_eq!(parsed.to_string(), list);
        assert_eq!("NEWSCORE".parse::<ServerMessage>().unwrap(), ServerMessage::NewScore);
        assert!("HISCORES ann:lots".parse::<ServerMessage>().is_err());
    }

    #[test]
    fn test_parse_piece() {
        assert_eq!("PIECE 14".parse::<ServerMessage>().unwrap(), ServerMessage::Piece(14));
        assert_eq!("PIECE 0\n".parse::<ServerMessage>().unwrap(), ServerMessage::Piece(0));
        assert!(matches!(
            "PIECE 15".parse::<ServerMessage>(),
            Err(GameError::InvalidPiece(15))
        ));
        assert!("PIECE -1".parse::<ServerMessage>().is_err());
        assert!("PIECE".parse::<ServerMessage>().is_err());
        assert!("MSG hello".parse::<ServerMessage>().is_err());
    }

    #[test]
    fn test_parse_scores() {
        let message = "SCORES alice:1200:2\nbob:300:DEAD";
        let parsed = message.parse::<ServerMessage>().unwrap();
        assert_eq!(
            parsed,
            ServerMessage::Scores(vec![
                Standing { name: "alice".into(), score: 1200, lives: Some(2) },
                Standing { name: "bob".into(), score: 300, lives: None },
            ])
        );
        assert_eq!(parsed.to_string(), message);
    }

    #[test]
    fn test_parse_scores_rejects_bad_line() {
        assert!("SCORES alice:12".parse::<ServerMessage>().is_err());
        assert!("SCORES :12:1".parse::<ServerMessage>().is_err());
        assert_eq!("SCORES".parse::<ServerMessage>().unwrap(), ServerMessage::Scores(vec![]));
    }
}
