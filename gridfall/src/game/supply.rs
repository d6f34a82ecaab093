use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{GameError, Result};
use crate::piece::PIECE_COUNT;
use crate::protocol::ClientMessage;

/// Where a game gets its pieces from and where it reports progress to
///
/// Every method is called with the game lock held, so implementations must
/// not block.
pub trait PieceSupply: Send + 'static {
    /// Pieces for the current and following slots when the game starts
    ///
    /// `None` means they will be delivered later.
    fn opening_pieces(&mut self) -> Result<Option<[u8; 2]>> {
        Ok(Some([self.next_piece_id()?, self.next_piece_id()?]))
    }

    /// Identifier of the piece that becomes the new following piece
    fn next_piece_id(&mut self) -> Result<u8>;

    /// Called after every scoring event with the running total
    fn on_score_changed(&mut self, _score: u32) {}

    /// Called after a life was lost
    fn on_lives_changed(&mut self, _lives: u32) {}

    /// Called exactly once when the game ends
    fn on_game_over(&mut self) {}
}

/// Uniform random draw from the whole catalog
pub struct RandomSupply {
    rng: StdRng,
}

impl RandomSupply {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Reproducible sequence for a seed
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomSupply {
    fn default() -> Self {
        Self::new()
    }
}

impl PieceSupply for RandomSupply {
    fn next_piece_id(&mut self) -> Result<u8> {
        Ok(self.rng.random_range(0..PIECE_COUNT))
    }
}

/// Pieces delivered by a remote authority over a text channel
///
/// Holds the backlog of identifiers received but not yet promoted to the
/// current/following slots. Each consumed piece is replaced by exactly one
/// new `PIECE` request, which keeps the backlog ahead of consumption.
pub struct RemoteSupply {
    outbound: flume::Sender<String>,
    backlog: VecDeque<u8>,
    prefetch: usize,
}

impl RemoteSupply {
    pub fn new(outbound: flume::Sender<String>, prefetch: usize) -> Self {
        Self {
            outbound,
            backlog: VecDeque::new(),
            prefetch,
        }
    }

    /// Fire-and-forget; a closed channel is only logged
    pub fn send(&self, message: ClientMessage) {
        if let Err(e) = self.outbound.send(message.to_string()) {
            tracing::warn!("Failed to send '{}' to piece authority: {}", message, e);
        }
    }

    pub(crate) fn enqueue(&mut self, id: u8) {
        self.backlog.push_back(id);
    }

    pub fn backlog(&self) -> impl Iterator<Item = u8> + '_ {
        self.backlog.iter().copied()
    }
}

impl PieceSupply for RemoteSupply {
    fn opening_pieces(&mut self) -> Result<Option<[u8; 2]>> {
        self.backlog.clear();
        for _ in 0..self.prefetch {
            self.send(ClientMessage::Piece);
        }
        Ok(None)
    }

    fn next_piece_id(&mut self) -> Result<u8> {
        let id = self.backlog.pop_front().ok_or(GameError::BacklogExhausted)?;
        self.send(ClientMessage::Piece);
        Ok(id)
    }

    fn on_score_changed(&mut self, score: u32) {
        self.send(ClientMessage::Score(score));
    }

    fn on_lives_changed(&mut self, lives: u32) {
        self.send(ClientMessage::Lives(lives));
    }

    fn on_game_over(&mut self) {
        self.send(ClientMessage::Die);
    }
}

/// Fixed cycle of identifiers for tests
#[cfg(test)]
pub(crate) struct ScriptedSupply {
    ids: Vec<u8>,
    cursor: usize,
    pub(crate) scores: Vec<u32>,
    pub(crate) lives: Vec<u32>,
    pub(crate) game_overs: usize,
}

#[cfg(test)]
impl ScriptedSupply {
    pub(crate) fn new(ids: &[u8]) -> Self {
        Self {
            ids: ids.to_vec(),
            cursor: 0,
            scores: Vec::new(),
            lives: Vec::new(),
            game_overs: 0,
        }
    }
}

#[cfg(test)]
impl PieceSupply for ScriptedSupply {
    fn next_piece_id(&mut self) -> Result<u8> {
        let id = self.ids[self.cursor % self.ids.len()];
        self.cursor += 1;
        Ok(id)
    }

    fn on_score_changed(&mut self, score: u32) {
        self.scores.push(score);
    }

    fn on_lives_changed(&mut self, lives: u32) {
        self.lives.push(lives);
    }

    fn on_game_over(&mut self) {
        self.game_overs += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_supply_stays_in_catalog() {
        let mut supply = RandomSupply::seeded(7);
        let mut seen = [false; PIECE_COUNT as usize];
        for _ in 0..2000 {
            let id = supply.next_piece_id().unwrap();
            assert!(id < PIECE_COUNT);
            seen[id as usize] = true;
        }
        assert!(seen.iter().all(|s| *s), "every piece should eventually be drawn");
    }

    #[test]
    fn test_random_supply_seed_is_reproducible() {
        let mut a = RandomSupply::seeded(42);
        let mut b = RandomSupply::seeded(42);
        let left: Vec<u8> = (0..20).map(|_| a.next_piece_id().unwrap()).collect();
        let right: Vec<u8> = (0..20).map(|_| b.next_piece_id().unwrap()).collect();
        assert_eq!(left, right);
    }

    #[test]
    fn test_remote_supply_prefetches() {
        let (tx, rx) = flume::unbounded();
        let mut supply = RemoteSupply::new(tx, 7);
        assert_eq!(supply.opening_pieces().unwrap(), None);
        let sent: Vec<String> = rx.drain().collect();
        assert_eq!(sent, vec!["PIECE"; 7]);
    }

    #[test]
    fn test_remote_supply_pairs_consumption_with_request() {
        let (tx, rx) = flume::unbounded();
        let mut supply = RemoteSupply::new(tx, 7);
        supply.enqueue(4);
        supply.enqueue(9);

        assert_eq!(supply.next_piece_id().unwrap(), 4);
        assert_eq!(rx.drain().collect::<Vec<_>>(), vec!["PIECE"]);
        assert_eq!(supply.backlog().collect::<Vec<_>>(), vec![9]);
    }

    #[test]
    fn test_remote_supply_exhausted_backlog() {
        let (tx, rx) = flume::unbounded();
        let mut supply = RemoteSupply::new(tx, 7);
        assert!(matches!(supply.next_piece_id(), Err(GameError::BacklogExhausted)));
        // no replacement request for a piece that was never consumed
        assert!(rx.is_empty());
    }

    #[test]
    fn test_remote_supply_reports() {
        let (tx, rx) = flume::unbounded();
        let mut supply = RemoteSupply::new(tx, 7);
        supply.on_score_changed(150);
        supply.on_lives_changed(2);
        supply.on_game_over();
        assert_eq!(
            rx.drain().collect::<Vec<_>>(),
            vec!["SCORE 150", "LIVES 2", "DIE"]
        );
    }
}
