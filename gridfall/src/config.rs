//! Configuration for games and network hosts

use std::time::Duration;

use zenoh::key_expr::KeyExpr;

use crate::error::{GameError, Result};
use crate::types::PlayerId;

/// Main configuration for a Game
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameConfig {
    /// Board width
    pub cols: usize,

    /// Board height
    pub rows: usize,

    /// Lives at the start of a game
    pub lives: u32,

    /// Turn time at level 0 (in milliseconds)
    pub base_delay_ms: u64,

    /// Turn time removed per level (in milliseconds)
    pub delay_step_ms: u64,

    /// Shortest turn time regardless of level (in milliseconds)
    pub min_delay_ms: u64,

    /// Points per cleared block before line count and multiplier are applied
    pub points_per_block: u32,

    /// Score needed per level
    pub points_per_level: u32,

    /// Piece requests sent up front in multiplayer games
    pub prefetch: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            cols: 5,
            rows: 5,
            lives: 3,
            base_delay_ms: 12000,
            delay_step_ms: 500,
            min_delay_ms: 2500,
            points_per_block: 10,
            points_per_level: 1000,
            prefetch: 7,
        }
    }
}

impl GameConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the board size
    pub fn with_board(mut self, cols: usize, rows: usize) -> Self {
        self.cols = cols;
        self.rows = rows;
        self
    }

    /// Set the starting lives
    pub fn with_lives(mut self, lives: u32) -> Self {
        self.lives = lives;
        self
    }

    /// Set the turn time curve: `max(base - step * level, min)`
    pub fn with_delay_curve(mut self, base_ms: u64, step_ms: u64, min_ms: u64) -> Self {
        self.base_delay_ms = base_ms;
        self.delay_step_ms = step_ms;
        self.min_delay_ms = min_ms;
        self
    }

    /// Set the number of piece requests sent when a multiplayer game starts
    pub fn with_prefetch(mut self, prefetch: usize) -> Self {
        self.prefetch = prefetch;
        self
    }

    /// Turn time for a level
    pub fn timer_delay(&self, level: u32) -> Duration {
        let reduction = self.delay_step_ms.saturating_mul(level as u64);
        let delay = self.base_delay_ms.saturating_sub(reduction);
        Duration::from_millis(delay.max(self.min_delay_ms))
    }

    /// Level reached with a score
    pub fn level_for(&self, score: u32) -> u32 {
        score / self.points_per_level.max(1)
    }
}

/// Network configuration shared by players and the piece authority
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Optional player name (auto-generated if None)
    pub player_name: Option<String>,

    /// Zenoh configuration
    pub zenoh_config: zenoh::Config,

    /// Key expression prefix for all game traffic
    pub keyexpr_prefix: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            player_name: None,
            zenoh_config: zenoh::Config::default(),
            keyexpr_prefix: "gridfall".to_string(),
        }
    }
}

impl HostConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the player name
    pub fn with_player_name(mut self, name: String) -> Self {
        self.player_name = Some(name);
        self
    }

    /// Set the Zenoh configuration
    pub fn with_zenoh_config(mut self, config: zenoh::Config) -> Self {
        self.zenoh_config = config;
        self
    }

    /// Set the key expression prefix
    pub fn with_keyexpr_prefix(mut self, prefix: String) -> Self {
        self.keyexpr_prefix = prefix;
        self
    }

    /// Validated prefix as a key expression
    pub fn prefix(&self) -> Result<KeyExpr<'static>> {
        KeyExpr::try_from(self.keyexpr_prefix.clone())
            .map_err(|e| GameError::InvalidKeyexpr(format!("{}: {}", self.keyexpr_prefix, e)))
    }

    /// Player name from the configuration, or a generated one
    pub fn player_id(&self) -> Result<PlayerId> {
        match &self.player_name {
            Some(name) => PlayerId::from_name(name.clone()),
            None => Ok(PlayerId::generate()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_delay_curve() {
        let config = GameConfig::default();
        assert_eq!(config.timer_delay(0), Duration::from_millis(12000));
        assert_eq!(config.timer_delay(5), Duration::from_millis(9500));
        assert_eq!(config.timer_delay(18), Duration::from_millis(3000));
        for level in [19, 20, 25, 1000, u32::MAX] {
            assert_eq!(config.timer_delay(level), Duration::from_millis(2500));
        }
    }

    #[test]
    fn test_level_for_score() {
        let config = GameConfig::default();
        assert_eq!(config.level_for(0), 0);
        assert_eq!(config.level_for(999), 0);
        assert_eq!(config.level_for(1000), 1);
        assert_eq!(config.level_for(5430), 5);
    }

    #[test]
    fn test_builder() {
        let config = GameConfig::new()
            .with_board(8, 6)
            .with_lives(1)
            .with_delay_curve(1000, 100, 200)
            .with_prefetch(3);
        assert_eq!((config.cols, config.rows), (8, 6));
        assert_eq!(config.lives, 1);
        assert_eq!(config.prefetch, 3);
        assert_eq!(config.timer_delay(9), Duration::from_millis(200));
    }

    #[test]
    fn test_host_config() {
        let config = HostConfig::new()
            .with_player_name("alice".to_string())
            .with_keyexpr_prefix("games/grid".to_string());
        assert_eq!(config.prefix().unwrap().as_str(), "games/grid");
        assert_eq!(config.player_id().unwrap().as_str(), "alice");

        assert!(HostConfig::new().player_id().is_ok());
        let bad = HostConfig::new().with_player_name("a/b".to_string());
        assert!(bad.player_id().is_err());
        let bad = HostConfig::new().with_keyexpr_prefix("a//b".to_string());
        assert!(matches!(bad.prefix(), Err(GameError::InvalidKeyexpr(_))));
    }
}
