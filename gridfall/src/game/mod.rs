//! Game state machine and its turn timer

pub(crate) mod state;
pub mod supply;
pub(crate) mod timer;
pub mod types;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::config::GameConfig;
use crate::error::{GameError, Result};
use state::{GameState, TickOutcome};
use supply::{PieceSupply, RandomSupply};
use timer::TimerCommand;
use types::{GameEvent, GameSnapshot, GameStats, Placement};

/// A running game
///
/// Placements, rotations and timer ticks are serialized through one lock;
/// the timer itself runs as a single tokio task spawned by [`Game::start`].
/// Notifications are delivered on the channel returned by [`Game::events`].
pub struct Game<S: PieceSupply> {
    state: Arc<Mutex<GameState<S>>>,
    timer_tx: flume::Sender<TimerCommand>,
    timer_rx: flume::Receiver<TimerCommand>,
    timer_task: Option<JoinHandle<()>>,
    events: flume::Receiver<GameEvent>,
}

impl Game<RandomSupply> {
    /// Single-player game drawing pieces at random
    pub fn single_player(config: GameConfig) -> Self {
        Game::new(config, RandomSupply::new())
    }
}

impl<S: PieceSupply> Game<S> {
    pub fn new(config: GameConfig, supply: S) -> Self {
        let (events_tx, events) = flume::unbounded();
        let (timer_tx, timer_rx) = flume::unbounded();
        Game {
            state: Arc::new(Mutex::new(GameState::new(config, supply, events_tx))),
            timer_tx,
            timer_rx,
            timer_task: None,
            events,
        }
    }

    pub(crate) fn locked(state: &Mutex<GameState<S>>) -> MutexGuard<'_, GameState<S>> {
        state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, GameState<S>> {
        Self::locked(&self.state)
    }

    pub(crate) fn shared_state(&self) -> Arc<Mutex<GameState<S>>> {
        Arc::clone(&self.state)
    }

    fn arm(&self, generation: u64, delay: Duration) {
        // The game holds a receiver, so the channel never disconnects
        let _ = self.timer_tx.send(TimerCommand::Arm { generation, delay });
    }

    /// Deal the opening pieces and start the turn timer
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| GameError::Internal(format!("no tokio runtime for the game timer: {}", e)))?;
        let (generation, delay) = self.lock().begin()?;
        self.arm(generation, delay);

        let state = Arc::clone(&self.state);
        let commands = self.timer_rx.clone();
        self.timer_task = Some(runtime.spawn(timer::run(commands, move |generation| {
            Self::expire(&state, generation)
        })));
        Ok(())
    }

    fn expire(state: &Mutex<GameState<S>>, generation: u64) -> TickOutcome {
        let mut state = Self::locked(state);
        match state.expire(generation) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Turn expiry failed, ending the game: {}", e);
                state.finish();
                TickOutcome::Over
            }
        }
    }

    /// Try to place the current piece centered on `(x, y)`
    ///
    /// A successful placement re-arms the timer with the delay of the level
    /// reached. Placing after game over is rejected without error.
    pub fn place(&self, x: isize, y: isize) -> Result<Placement> {
        let mut state = self.lock();
        let placement = state.try_place(x, y)?;
        if placement.is_placed() {
            let (generation, delay) = state.rearm();
            self.arm(generation, delay);
        }
        Ok(placement)
    }

    /// Discard the current piece without placing it
    pub fn next_piece(&self) -> Result<()> {
        self.lock().advance_piece()
    }

    pub fn rotate_left(&self) {
        self.lock().rotate_left();
    }

    pub fn rotate_right(&self) {
        self.lock().rotate_right();
    }

    /// Exchange the current and following pieces
    pub fn swap_pieces(&self) {
        self.lock().swap();
    }

    /// End the game and cancel the timer. Safe to call more than once.
    ///
    /// Does nothing before [`Game::start`].
    pub fn end(&self) {
        if self.lock().finish() {
            tracing::info!("Game ended by the player");
            let _ = self.timer_tx.send(TimerCommand::Stop);
        }
    }

    pub fn snapshot(&self) -> GameSnapshot {
        self.lock().snapshot()
    }

    pub fn stats(&self) -> GameStats {
        self.lock().stats()
    }

    pub fn timer_delay(&self) -> Duration {
        self.lock().timer_delay()
    }

    pub fn is_over(&self) -> bool {
        self.lock().is_over()
    }

    /// Notification channel
    ///
    /// Receivers are clones of one channel: every event goes to exactly one of them.
    pub fn events(&self) -> flume::Receiver<GameEvent> {
        self.events.clone()
    }

    /// Whether the timer task is still running
    pub fn timer_active(&self) -> bool {
        self.timer_task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl<S: PieceSupply> Drop for Game<S> {
    fn drop(&mut self) {
        let _ = self.timer_tx.send(TimerCommand::Stop);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::supply::ScriptedSupply;
    use crate::piece::PieceKind;

    fn dots(config: GameConfig) -> Game<ScriptedSupply> {
        Game::new(config, ScriptedSupply::new(&[PieceKind::Dot.id()]))
    }

    #[test]
    fn test_start_needs_a_runtime() {
        let mut game = dots(GameConfig::default());
        assert!(matches!(game.start(), Err(GameError::Internal(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_costs_a_life() {
        let mut game = dots(GameConfig::default());
        game.start().unwrap();
        assert!(game.timer_active());

        tokio::time::sleep(Duration::from_millis(11_999)).await;
        assert_eq!(game.stats().lives, 3);
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(game.stats().lives, 2);
        assert_eq!(game.stats().multiplier, 1);
        assert!(!game.is_over());
    }

    #[tokio::test(start_paused = true)]
    async fn test_placement_rearms_timer() {
        let mut game = dots(GameConfig::default());
        game.start().unwrap();

        tokio::time::sleep(Duration::from_millis(11_000)).await;
        assert!(game.place(2, 2).unwrap().is_placed());
        // the original deadline passes without a tick
        tokio::time::sleep(Duration::from_millis(11_000)).await;
        assert_eq!(game.stats().lives, 3);
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(game.stats().lives, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_placement_keeps_timer() {
        let mut game = dots(GameConfig::default());
        game.start().unwrap();
        game.lock().grid_mut().set(2, 2, 1);

        tokio::time::sleep(Duration::from_millis(11_000)).await;
        assert_eq!(game.place(2, 2).unwrap(), Placement::Rejected);
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(game.stats().lives, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_game_over_after_last_life() {
        let mut game = dots(GameConfig::default());
        let events = game.events();
        game.start().unwrap();

        tokio::time::sleep(Duration::from_millis(36_100)).await;
        assert!(game.is_over());
        assert_eq!(game.stats().lives, 0);
        assert!(!game.timer_active());

        let seen: Vec<GameEvent> = events.drain().collect();
        let over_at = seen
            .iter()
            .position(|e| matches!(e, GameEvent::GameOver(_)))
            .expect("game over event");
        assert_eq!(seen.iter().filter(|e| matches!(e, GameEvent::GameOver(_))).count(), 1);
        assert!(!seen[over_at..].iter().any(|e| matches!(e, GameEvent::Loop { .. })));
        assert_eq!(
            seen[over_at - 1],
            GameEvent::Loop {
                delay: Duration::from_millis(12_000)
            }
        );

        // no further ticks and no second notification
        tokio::time::sleep(Duration::from_millis(60_000)).await;
        game.end();
        assert!(events.is_empty());
        assert_eq!(game.place(2, 2).unwrap(), Placement::Rejected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_is_idempotent() {
        let mut game = dots(GameConfig::default());
        let events = game.events();
        game.start().unwrap();
        game.end();
        game.end();
        tokio::time::sleep(Duration::from_millis(50_000)).await;

        assert!(!game.timer_active());
        assert_eq!(game.stats().lives, 3);
        let game_overs = events.drain().filter(|e| matches!(e, GameEvent::GameOver(_))).count();
        assert_eq!(game_overs, 1);
        assert!(game.start().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_speeds_up_with_level() {
        let config = GameConfig::default().with_board(20, 20);
        let mut game = dots(config);
        let events = game.events();
        game.start().unwrap();
        {
            let mut state = game.lock();
            for y in 0..5 {
                for x in 0..19 {
                    state.grid_mut().set(x, y, 2);
                }
            }
        }
        // five clearing rows in a row: 200 + 400 + 600 + 800 + 1000
        for y in 0..5 {
            assert!(game.place(19, y).unwrap().is_placed());
        }
        assert_eq!(game.stats().level, 3);
        assert_eq!(game.timer_delay(), Duration::from_millis(10_500));
        let last_loop = events
            .drain()
            .filter_map(|e| match e {
                GameEvent::Loop { delay } => Some(delay),
                _ => None,
            })
            .last();
        assert_eq!(last_loop, Some(Duration::from_millis(10_500)));

        tokio::time::sleep(Duration::from_millis(10_400)).await;
        assert_eq!(game.stats().lives, 3);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(game.stats().lives, 2);
    }
}
