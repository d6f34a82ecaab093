//! Piece authority: hands out one shared piece sequence, keeps standings
//! and the online high-score list

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::piece::PIECE_COUNT;
use crate::protocol::{ClientMessage, ServerMessage, Standing};
use crate::scores::ScoreTable;
use crate::types::PlayerId;

#[derive(Debug, Clone)]
struct PlayerRecord {
    cursor: usize,
    score: u32,
    lives: u32,
    alive: bool,
}

/// Server side of the piece protocol, independent of any transport
///
/// Every player receives the same piece sequence, each at its own pace.
/// Players are registered on their first game message; high-score requests
/// do not register anyone.
pub struct PieceAuthority {
    rng: StdRng,
    sequence: Vec<u8>,
    players: BTreeMap<PlayerId, PlayerRecord>,
    starting_lives: u32,
    hiscores: ScoreTable,
}

impl PieceAuthority {
    pub fn new(starting_lives: u32) -> Self {
        Self::with_rng(StdRng::from_os_rng(), starting_lives)
    }

    /// Authority whose piece sequence is reproducible
    pub fn seeded(seed: u64, starting_lives: u32) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), starting_lives)
    }

    fn with_rng(rng: StdRng, starting_lives: u32) -> Self {
        Self {
            rng,
            sequence: Vec::new(),
            players: BTreeMap::new(),
            starting_lives,
            hiscores: ScoreTable::default(),
        }
    }

    /// Replace the online high-score list, e.g. with one loaded from disk
    pub fn with_hiscores(mut self, hiscores: ScoreTable) -> Self {
        self.hiscores = hiscores;
        self
    }

    pub fn hiscores(&self) -> &ScoreTable {
        &self.hiscores
    }

    // Sequence is extended on demand so late joiners see the same pieces
    fn piece_at(&mut self, index: usize) -> u8 {
        while self.sequence.len() <= index {
            let id = self.rng.random_range(0..PIECE_COUNT);
            self.sequence.push(id);
        }
        self.sequence[index]
    }

    fn record(&mut self, player: &PlayerId) -> &mut PlayerRecord {
        let starting_lives = self.starting_lives;
        self.players.entry(player.clone()).or_insert_with(|| {
            tracing::info!("Player '{}' joined", player);
            PlayerRecord {
                cursor: 0,
                score: 0,
                lives: starting_lives,
                alive: true,
            }
        })
    }

    /// Process one line from a player, returning the reply if there is one
    ///
    /// Lines that do not parse are logged and ignored.
    pub fn handle(&mut self, player: &PlayerId, line: &str) -> Option<ServerMessage> {
        let message = match line.parse::<ClientMessage>() {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("Ignoring message from '{}': {}", player, e);
                return None;
            }
        };

        match message {
            ClientMessage::Piece => {
                let record = self.record(player);
                let cursor = record.cursor;
                record.cursor += 1;
                let id = self.piece_at(cursor);
                tracing::debug!("Piece #{} ({}) for '{}'", cursor, id, player);
                Some(ServerMessage::Piece(id))
            }
            ClientMessage::Score(score) => {
                self.record(player).score = score;
                None
            }
            ClientMessage::Lives(lives) => {
                self.record(player).lives = lives;
                None
            }
            ClientMessage::Die => {
                let record = self.record(player);
                if record.alive {
                    record.alive = false;
                    tracing::info!("Player '{}' is out with score {}", player, record.score);
                }
                None
            }
            ClientMessage::Scores => {
                self.record(player);
                Some(ServerMessage::Scores(self.standings()))
            }
            ClientMessage::HiScores => Some(ServerMessage::HiScores(self.hiscores.entries().to_vec())),
            ClientMessage::HiScore(entry) => {
                let submitted = entry.to_string();
                match self.hiscores.insert(entry) {
                    Some(rank) => {
                        tracing::info!("High score {} from '{}' at rank {}", submitted, player, rank + 1);
                        Some(ServerMessage::NewScore)
                    }
                    None => {
                        tracing::debug!("High score {} from '{}' did not qualify", submitted, player);
                        None
                    }
                }
            }
        }
    }

    /// Mark a player dead because its link went away
    pub fn disconnect(&mut self, player: &PlayerId) {
        if let Some(record) = self.players.get_mut(player) {
            if record.alive {
                record.alive = false;
                tracing::info!("Player '{}' disconnected", player);
            }
        }
    }

    /// Every known player, best score first
    pub fn standings(&self) -> Vec<Standing> {
        let mut standings: Vec<Standing> = self
            .players
            .iter()
            .map(|(player, record)| Standing {
                name: player.to_string(),
                score: record.score,
                lives: record.alive.then_some(record.lives),
            })
            .collect();
        // stable sort keeps name order among equal scores
        standings.sort_by(|a, b| b.score.cmp(&a.score));
        standings
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_alive(&self, player: &PlayerId) -> bool {
        self.players.get(player).is_some_and(|record| record.alive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scores::ScoreEntry;

    fn player(name: &str) -> PlayerId {
        PlayerId::from_name(name).unwrap()
    }

    fn piece(reply: Option<ServerMessage>) -> u8 {
        match reply {
            Some(ServerMessage::Piece(id)) => id,
            other => panic!("expected a piece, got {:?}", other),
        }
    }

    #[test]
    fn test_players_share_one_sequence() {
        let mut authority = PieceAuthority::seeded(3, 3);
        let (alice, bob) = (player("alice"), player("bob"));

        let first: Vec<u8> = (0..10).map(|_| piece(authority.handle(&alice, "PIECE"))).collect();
        let second: Vec<u8> = (0..10).map(|_| piece(authority.handle(&bob, "PIECE"))).collect();
        assert_eq!(first, second);
        assert!(first.iter().all(|id| *id < PIECE_COUNT));
    }

    #[test]
    fn test_interleaved_requests_keep_separate_cursors() {
        let mut authority = PieceAuthority::seeded(11, 3);
        let (alice, bob) = (player("alice"), player("bob"));
        let a0 = piece(authority.handle(&alice, "PIECE"));
        let a1 = piece(authority.handle(&alice, "PIECE"));
        let b0 = piece(authority.handle(&bob, "PIECE"));
        let a2 = piece(authority.handle(&alice, "PIECE"));
        let b1 = piece(authority.handle(&bob, "PIECE"));
        let b2 = piece(authority.handle(&bob, "PIECE"));
        assert_eq!((a0, a1, a2), (b0, b1, b2));
    }

    #[test]
    fn test_standings() {
        let mut authority = PieceAuthority::seeded(1, 3);
        let (alice, bob, carol) = (player("alice"), player("bob"), player("carol"));
        assert_eq!(authority.handle(&alice, "SCORE 120"), None);
        assert_eq!(authority.handle(&alice, "LIVES 2"), None);
        authority.handle(&bob, "SCORE 400");
        authority.handle(&bob, "DIE");
        authority.handle(&carol, "PIECE");

        let reply = authority.handle(&carol, "SCORES");
        assert_eq!(
            reply,
            Some(ServerMessage::Scores(vec![
                Standing { name: "bob".into(), score: 400, lives: None },
                Standing { name: "alice".into(), score: 120, lives: Some(2) },
                Standing { name: "carol".into(), score: 0, lives: Some(3) },
            ]))
        );
        assert_eq!(authority.player_count(), 3);
    }

    #[test]
    fn test_disconnect_marks_dead() {
        let mut authority = PieceAuthority::seeded(1, 3);
        let alice = player("alice");
        authority.handle(&alice, "SCORE 10");
        assert!(authority.is_alive(&alice));
        authority.disconnect(&alice);
        assert!(!authority.is_alive(&alice));
        assert_eq!(authority.standings()[0].to_string(), "alice:10:DEAD");

        // unknown players are not registered by a disconnect
        authority.disconnect(&player("ghost"));
        assert_eq!(authority.player_count(), 1);
    }

    #[test]
    fn test_online_hiscores() {
        let mut authority = PieceAuthority::seeded(1, 3);
        let alice = player("alice");
        let Some(ServerMessage::HiScores(list)) = authority.handle(&alice, "HISCORES") else {
            panic!("expected the high-score list");
        };
        assert_eq!(list, ScoreTable::default().entries());

        // the seed table is full, its lowest entry is 100
        assert_eq!(authority.handle(&alice, "HISCORE alice:100"), None);
        assert_eq!(authority.handle(&alice, "HISCORE alice:650"), Some(ServerMessage::NewScore));
        let Some(ServerMessage::HiScores(list)) = authority.handle(&alice, "HISCORES") else {
            panic!("expected the high-score list");
        };
        assert_eq!(list.len(), 10);
        assert_eq!(list[2], ScoreEntry::new("alice", 650));
        assert_eq!(authority.hiscores().entries(), list.as_slice());
        assert_eq!(authority.player_count(), 0);
    }

    #[test]
    fn test_hiscores_from_a_given_table() {
        let table = ScoreTable::parse("bo:30\n", 3);
        let mut authority = PieceAuthority::seeded(1, 3).with_hiscores(table);
        assert_eq!(
            authority.handle(&player("cy"), "HISCORE cy:5"),
            Some(ServerMessage::NewScore)
        );
        assert_eq!(
            authority.handle(&player("cy"), "HISCORES").map(|m| m.to_string()),
            Some("HISCORES bo:30\ncy:5".to_string())
        );
    }

    #[test]
    fn test_unknown_messages_ignored() {
        let mut authority = PieceAuthority::seeded(1, 3);
        let alice = player("alice");
        assert_eq!(authority.handle(&alice, "HELLO"), None);
        assert_eq!(authority.handle(&alice, "SCORE many"), None);
        assert_eq!(authority.player_count(), 0);
    }
}
