use std::time::Duration;

use crate::config::GameConfig;
use crate::error::{GameError, Result};
use crate::game::supply::{PieceSupply, RemoteSupply};
use crate::game::types::{ClearReport, GameEvent, GameSnapshot, GameStats, Placement};
use crate::grid::Grid;
use crate::piece::Piece;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Idle,
    Running,
    Over,
}

/// What the timer should do after a tick fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickOutcome {
    /// The tick was superseded by a placement or the game is not running
    Stale,
    /// Wait again for the given generation
    Rearmed { generation: u64, delay: Duration },
    /// The game is over, stop the timer
    Over,
}

/// Mutable state of one game, always accessed under the game lock
///
/// `generation` identifies the currently armed tick. Every (re)arm bumps it,
/// so a tick armed before a placement expires as stale.
pub(crate) struct GameState<S> {
    config: GameConfig,
    grid: Grid,
    pub(crate) supply: S,
    current: Option<Piece>,
    following: Option<Piece>,
    score: u32,
    level: u32,
    lives: u32,
    multiplier: u32,
    phase: Phase,
    generation: u64,
    events: flume::Sender<GameEvent>,
}

impl<S: PieceSupply> GameState<S> {
    pub(crate) fn new(config: GameConfig, supply: S, events: flume::Sender<GameEvent>) -> Self {
        let grid = Grid::new(config.cols, config.rows);
        let lives = config.lives;
        GameState {
            config,
            grid,
            supply,
            current: None,
            following: None,
            score: 0,
            level: 0,
            lives,
            multiplier: 1,
            phase: Phase::Idle,
            generation: 0,
            events,
        }
    }

    fn emit(&self, event: GameEvent) {
        // The owning game keeps a receiver alive, so this cannot fail
        let _ = self.events.send(event);
    }

    fn emit_pieces(&self) {
        if let (Some(current), Some(following)) = (self.current, self.following) {
            self.emit(GameEvent::NextPiece { current, following });
        }
    }

    pub(crate) fn stats(&self) -> GameStats {
        GameStats {
            score: self.score,
            level: self.level,
            lives: self.lives,
            multiplier: self.multiplier,
        }
    }

    pub(crate) fn is_over(&self) -> bool {
        self.phase == Phase::Over
    }

    pub(crate) fn timer_delay(&self) -> Duration {
        self.config.timer_delay(self.level)
    }

    /// Reset counters, draw the opening pieces and arm the first tick
    pub(crate) fn begin(&mut self) -> Result<(u64, Duration)> {
        if self.phase != Phase::Idle {
            return Err(GameError::Internal("game was already started".to_string()));
        }
        self.grid.reset();
        self.score = 0;
        self.level = 0;
        self.lives = self.config.lives;
        self.multiplier = 1;
        self.current = None;
        self.following = None;

        if let Some([current, following]) = self.supply.opening_pieces()? {
            self.current = Some(Piece::from_id(current)?);
            self.following = Some(Piece::from_id(following)?);
        }
        self.phase = Phase::Running;
        tracing::info!(
            "Game started on a {}x{} board with {} lives",
            self.grid.cols(),
            self.grid.rows(),
            self.lives
        );
        self.emit_pieces();
        self.emit(GameEvent::Stats(self.stats()));
        Ok(self.rearm())
    }

    /// Invalidate the pending tick and return the one to arm next
    pub(crate) fn rearm(&mut self) -> (u64, Duration) {
        self.generation += 1;
        let delay = self.timer_delay();
        self.emit(GameEvent::Loop { delay });
        (self.generation, delay)
    }

    // Draw a new following piece; the supply is only consulted once both slots are filled
    fn draw_following(&mut self) -> Result<Option<Piece>> {
        if self.current.is_none() || self.following.is_none() {
            return Ok(None);
        }
        let id = self.supply.next_piece_id()?;
        Ok(Some(Piece::from_id(id)?))
    }

    fn promote(&mut self, next: Piece) {
        self.current = self.following;
        self.following = Some(next);
        self.emit_pieces();
    }

    /// Discard the current piece in favour of the following one
    ///
    /// Does nothing unless the game is running.
    pub(crate) fn advance_piece(&mut self) -> Result<()> {
        if self.phase != Phase::Running {
            return Ok(());
        }
        if let Some(next) = self.draw_following()? {
            self.promote(next);
        }
        Ok(())
    }

    /// Place the current piece centered on `(x, y)`
    ///
    /// The replacement piece is drawn before the grid is touched, so a failing
    /// supply leaves the game unchanged.
    pub(crate) fn try_place(&mut self, x: isize, y: isize) -> Result<Placement> {
        if self.phase != Phase::Running {
            return Ok(Placement::Rejected);
        }
        let (Some(piece), Some(_)) = (self.current, self.following) else {
            tracing::debug!("Placement at ({}, {}) ignored, pieces not delivered yet", x, y);
            return Ok(Placement::Rejected);
        };
        if !self.grid.can_place(&piece, x, y) {
            tracing::debug!("Cannot place {} at ({}, {})", piece, x, y);
            return Ok(Placement::Rejected);
        }

        let Some(next) = self.draw_following()? else {
            return Ok(Placement::Rejected);
        };
        self.grid.place(&piece, x, y);
        tracing::debug!("Placed {} at ({}, {})", piece, x, y);
        self.promote(next);
        Ok(Placement::Placed(self.apply_clear()))
    }

    /// Clear complete lines and update score, level and multiplier
    pub(crate) fn apply_clear(&mut self) -> ClearReport {
        let mut report = ClearReport::detect(&self.grid);
        if report.is_empty() {
            self.multiplier = 1;
            self.emit(GameEvent::Stats(self.stats()));
            return report;
        }

        self.grid.clear(&report.cells);
        let lines = report.lines() as u32;
        let blocks = report.blocks() as u32;
        report.points = lines
            .saturating_mul(blocks)
            .saturating_mul(self.config.points_per_block)
            .saturating_mul(self.multiplier);
        self.score = self.score.saturating_add(report.points);
        self.level = self.config.level_for(self.score);
        tracing::debug!(
            "Cleared {} lines ({} blocks) at x{} for {} points",
            lines,
            blocks,
            self.multiplier,
            report.points
        );
        self.multiplier += 1;

        self.emit(GameEvent::LinesCleared(report.clone()));
        self.supply.on_score_changed(self.score);
        self.emit(GameEvent::Stats(self.stats()));
        report
    }

    /// Handle a fired tick
    ///
    /// Costs the current piece and one life. The loop notification is emitted
    /// even when this tick ends the game.
    pub(crate) fn expire(&mut self, generation: u64) -> Result<TickOutcome> {
        if self.phase != Phase::Running || generation != self.generation {
            return Ok(TickOutcome::Stale);
        }

        self.advance_piece()?;
        self.lives = self.lives.saturating_sub(1);
        self.multiplier = 1;
        tracing::debug!("Turn expired, {} lives left", self.lives);
        self.supply.on_lives_changed(self.lives);
        self.emit(GameEvent::Stats(self.stats()));

        if self.lives == 0 {
            self.emit(GameEvent::Loop {
                delay: self.timer_delay(),
            });
            self.finish();
            return Ok(TickOutcome::Over);
        }
        let (generation, delay) = self.rearm();
        Ok(TickOutcome::Rearmed { generation, delay })
    }

    /// Enter the terminal phase
    ///
    /// Returns false, without any notification, if the game is already over
    /// or was never started.
    pub(crate) fn finish(&mut self) -> bool {
        if self.phase != Phase::Running {
            return false;
        }
        self.phase = Phase::Over;
        self.generation += 1;
        tracing::info!("Game over with score {}", self.score);
        self.supply.on_game_over();
        self.emit(GameEvent::GameOver(self.stats()));
        true
    }

    pub(crate) fn rotate_right(&mut self) {
        if self.is_over() {
            return;
        }
        if let Some(piece) = self.current.as_mut() {
            piece.rotate_right();
            self.emit_pieces();
        }
    }

    pub(crate) fn rotate_left(&mut self) {
        if self.is_over() {
            return;
        }
        if let Some(piece) = self.current.as_mut() {
            piece.rotate_left();
            self.emit_pieces();
        }
    }

    pub(crate) fn swap(&mut self) {
        if self.is_over() {
            return;
        }
        if let (Some(current), Some(following)) = (self.current, self.following) {
            self.current = Some(following);
            self.following = Some(current);
            self.emit_pieces();
        }
    }

    pub(crate) fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            stats: self.stats(),
            timer_delay: self.timer_delay(),
            current: self.current,
            following: self.following,
            grid: self.grid.clone(),
            running: self.phase == Phase::Running,
            over: self.is_over(),
        }
    }

    pub(crate) fn emit_standings(&self, standings: Vec<crate::protocol::Standing>) {
        self.emit(GameEvent::Standings(standings));
    }

    pub(crate) fn emit_hiscores(&self, entries: Vec<crate::scores::ScoreEntry>) {
        self.emit(GameEvent::HiScores(entries));
    }

    #[cfg(test)]
    pub(crate) fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }
}

impl GameState<RemoteSupply> {
    /// Slot a piece received from the authority
    ///
    /// Fills current, then following, then the backlog.
    pub(crate) fn deliver_piece(&mut self, id: u8) -> Result<()> {
        let piece = Piece::from_id(id)?;
        if self.is_over() {
            return Ok(());
        }
        if self.current.is_none() {
            self.current = Some(piece);
        } else if self.following.is_none() {
            self.following = Some(piece);
            self.emit_pieces();
        } else {
            self.supply.enqueue(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::supply::ScriptedSupply;
    use crate::piece::PieceKind;

    fn running(config: GameConfig, ids: &[u8]) -> (GameState<ScriptedSupply>, flume::Receiver<GameEvent>) {
        let (tx, rx) = flume::unbounded();
        let mut state = GameState::new(config, ScriptedSupply::new(ids), tx);
        state.begin().unwrap();
        rx.drain();
        (state, rx)
    }

    fn dot() -> u8 {
        PieceKind::Dot.id()
    }

    #[test]
    fn test_begin_deals_two_pieces() {
        let (tx, rx) = flume::unbounded();
        let mut state = GameState::new(GameConfig::default(), ScriptedSupply::new(&[0, 5, 9]), tx);
        let (generation, delay) = state.begin().unwrap();
        assert_eq!(generation, 1);
        assert_eq!(delay, Duration::from_millis(12000));

        let snapshot = state.snapshot();
        assert_eq!(snapshot.current.map(|p| p.kind()), Some(PieceKind::Line));
        assert_eq!(snapshot.following.map(|p| p.kind()), Some(PieceKind::L));
        assert_eq!(snapshot.stats.lives, 3);
        assert_eq!(snapshot.stats.multiplier, 1);
        assert!(snapshot.running);

        let events: Vec<GameEvent> = rx.drain().collect();
        assert!(matches!(events[0], GameEvent::NextPiece { .. }));
        assert!(matches!(events.last(), Some(GameEvent::Loop { .. })));
        assert!(state.begin().is_err());
    }

    #[test]
    fn test_row_clear() {
        let (mut state, rx) = running(GameConfig::default(), &[dot()]);
        for x in 0..4 {
            state.grid_mut().set(x, 0, 2);
        }
        let Placement::Placed(report) = state.try_place(4, 0).unwrap() else {
            panic!("dot should fit");
        };
        assert_eq!(report.lines(), 1);
        assert_eq!(report.blocks(), 5);
        assert_eq!(report.points, 50);
        assert!(state.snapshot().grid.is_empty());
        assert_eq!(state.stats().score, 50);
        assert_eq!(state.stats().multiplier, 2);
        assert_eq!(state.supply.scores, vec![50]);
        assert!(rx.drain().any(|e| matches!(e, GameEvent::LinesCleared(_))));
    }

    #[test]
    fn test_row_and_column_share_a_cell() {
        let (mut state, _rx) = running(GameConfig::default(), &[dot()]);
        for i in 1..5 {
            state.grid_mut().set(i, 0, 3);
            state.grid_mut().set(0, i, 3);
        }
        let Placement::Placed(report) = state.try_place(0, 0).unwrap() else {
            panic!("dot should fit in the corner");
        };
        assert_eq!(report.rows, vec![0]);
        assert_eq!(report.columns, vec![0]);
        assert_eq!(report.lines(), 2);
        assert_eq!(report.blocks(), 5 + 5 - 1);
        assert_eq!(report.points, 2 * 9 * 10);
        assert!(state.snapshot().grid.is_empty());
    }

    #[test]
    fn test_multiplier_progression() {
        let (mut state, _rx) = running(GameConfig::default(), &[dot()]);
        for x in 0..4 {
            state.grid_mut().set(x, 0, 2);
            state.grid_mut().set(x, 1, 2);
        }
        state.try_place(4, 0).unwrap();
        assert_eq!(state.stats().score, 50);
        // second consecutive clear is worth double
        state.try_place(4, 1).unwrap();
        assert_eq!(state.stats().score, 150);
        assert_eq!(state.stats().multiplier, 3);

        // nothing cleared resets the multiplier
        state.try_place(2, 2).unwrap();
        assert_eq!(state.stats().multiplier, 1);
        for x in 0..4 {
            state.grid_mut().set(x, 4, 2);
        }
        let Placement::Placed(report) = state.try_place(4, 4).unwrap() else {
            panic!("dot should fit");
        };
        assert_eq!(report.points, 50);
    }

    #[test]
    fn test_level_follows_score() {
        let config = GameConfig::default().with_board(20, 3);
        let (mut state, _rx) = running(config, &[dot()]);
        for x in 0..19 {
            state.grid_mut().set(x, 0, 2);
        }
        state.try_place(19, 0).unwrap();
        assert_eq!(state.stats().score, 200);
        assert_eq!(state.stats().level, 0);
        for _ in 0..4 {
            for x in 0..19 {
                state.grid_mut().set(x, 0, 2);
            }
            state.try_place(19, 0).unwrap();
        }
        // 200 * (1 + 2 + 3 + 4 + 5)
        assert_eq!(state.stats().score, 3000);
        assert_eq!(state.stats().level, 3);
        assert_eq!(state.timer_delay(), Duration::from_millis(10500));
    }

    #[test]
    fn test_rejected_placement_changes_nothing() {
        let (mut state, rx) = running(GameConfig::default(), &[PieceKind::Line.id()]);
        state.grid_mut().set(2, 2, 1);
        let before = state.snapshot();
        assert_eq!(state.try_place(2, 2).unwrap(), Placement::Rejected);
        assert_eq!(state.try_place(0, 0).unwrap(), Placement::Rejected);
        assert_eq!(state.snapshot(), before);
        assert!(rx.is_empty());
    }

    #[test]
    fn test_placement_promotes_following() {
        let (mut state, _rx) = running(GameConfig::default(), &[0, 1, 2, 3]);
        state.try_place(2, 2).unwrap();
        let snapshot = state.snapshot();
        assert_eq!(snapshot.current.map(|p| p.id()), Some(1));
        assert_eq!(snapshot.following.map(|p| p.id()), Some(2));
    }

    #[test]
    fn test_expire_costs_a_life() {
        let (mut state, rx) = running(GameConfig::default(), &[0, 1, 2]);
        for x in 0..2 {
            state.grid_mut().set(x, 0, 2);
        }
        assert!(state.try_place(3, 0).unwrap().is_placed());
        assert_eq!(state.stats().multiplier, 2);
        let generation = state.rearm().0;
        rx.drain();

        let outcome = state.expire(generation).unwrap();
        assert!(matches!(outcome, TickOutcome::Rearmed { .. }));
        assert_eq!(state.stats().lives, 2);
        assert_eq!(state.stats().multiplier, 1);
        assert_eq!(state.supply.lives, vec![2]);
        let events: Vec<GameEvent> = rx.drain().collect();
        assert!(events.iter().any(|e| matches!(e, GameEvent::NextPiece { .. })));
        assert!(events
            .iter()
            .any(|e| *e == GameEvent::Loop { delay: Duration::from_millis(12000) }));
    }

    #[test]
    fn test_stale_tick_is_ignored() {
        let (mut state, _rx) = running(GameConfig::default(), &[dot()]);
        let stale = state.rearm().0;
        state.try_place(2, 2).unwrap();
        state.rearm();
        assert_eq!(state.expire(stale).unwrap(), TickOutcome::Stale);
        assert_eq!(state.stats().lives, 3);
    }

    #[test]
    fn test_last_life_ends_the_game() {
        let (mut state, rx) = running(GameConfig::default().with_lives(1), &[dot()]);
        let generation = state.rearm().0;
        assert_eq!(state.expire(generation).unwrap(), TickOutcome::Over);
        assert!(state.is_over());
        assert_eq!(state.supply.game_overs, 1);

        assert!(!state.finish());
        assert_eq!(state.supply.game_overs, 1);
        let events: Vec<GameEvent> = rx.drain().collect();
        let game_overs = events.iter().filter(|e| matches!(e, GameEvent::GameOver(_))).count();
        assert_eq!(game_overs, 1);
        // the final tick still reports its loop, right before the game over
        let over_at = events
            .iter()
            .position(|e| matches!(e, GameEvent::GameOver(_)))
            .unwrap();
        assert!(over_at > 0);
        assert_eq!(
            events[over_at - 1],
            GameEvent::Loop {
                delay: state.timer_delay()
            }
        );
        assert_eq!(state.try_place(2, 2).unwrap(), Placement::Rejected);
    }

    #[test]
    fn test_finish_before_begin_is_silent() {
        let (tx, rx) = flume::unbounded();
        let mut state = GameState::new(GameConfig::default(), ScriptedSupply::new(&[dot()]), tx);
        assert!(!state.finish());
        assert!(!state.is_over());
        assert_eq!(state.supply.game_overs, 0);
        assert!(rx.is_empty());
        assert!(state.begin().is_ok());
    }

    #[test]
    fn test_advance_after_game_over_is_ignored() {
        let (mut state, rx) = running(GameConfig::default(), &[0, 5, 9]);
        assert!(state.finish());
        rx.drain();
        let before = state.snapshot();
        state.advance_piece().unwrap();
        assert_eq!(state.snapshot(), before);
        assert!(rx.is_empty());
    }

    #[test]
    fn test_swap_and_rotate() {
        let (mut state, rx) = running(GameConfig::default(), &[5, 9]);
        state.swap();
        let snapshot = state.snapshot();
        assert_eq!(snapshot.current.map(|p| p.kind()), Some(PieceKind::T));
        assert_eq!(snapshot.following.map(|p| p.kind()), Some(PieceKind::L));

        state.rotate_right();
        state.rotate_left();
        state.rotate_left();
        let current = state.snapshot().current.unwrap();
        assert_eq!(current.rotation(), crate::piece::Rotation::R270);
        assert_eq!(rx.drain().count(), 4);
    }

    #[test]
    fn test_deliver_fills_slots_then_backlog() {
        let (tx, _rx) = flume::unbounded();
        let (out_tx, out_rx) = flume::unbounded();
        let supply = RemoteSupply::new(out_tx, 7);
        let mut state = GameState::new(GameConfig::default(), supply, tx);
        state.begin().unwrap();
        assert_eq!(out_rx.drain().count(), 7);

        for id in [3, 4, 5, 6] {
            state.deliver_piece(id).unwrap();
        }
        let snapshot = state.snapshot();
        assert_eq!(snapshot.current.map(|p| p.id()), Some(3));
        assert_eq!(snapshot.following.map(|p| p.id()), Some(4));
        assert_eq!(state.supply.backlog().collect::<Vec<_>>(), vec![5, 6]);
        assert!(matches!(state.deliver_piece(15), Err(GameError::InvalidPiece(15))));
    }
}
