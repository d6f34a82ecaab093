//! # gridfall
//!
//! A block-placement puzzle game engine with a networked multiplayer mode built on top of Zenoh.
//!
//! ## Overview
//!
//! Players drop pieces from a fixed catalog of 15 shapes onto a small grid.
//! Completing a row or a column clears it and scores points; failing to place
//! a piece before the turn timer runs out costs a life.
//!
//! ## Key Features
//!
//! - Grid placement and row/column clearing
//! - Score, level and multiplier progression with a level-dependent turn timer
//! - Pluggable piece supply: local random draw or a remote piece authority
//! - Text protocol (`PIECE`, `SCORE`, `LIVES`, `DIE`, `SCORES`, `HISCORES`) over any line channel
//! - Local and online high-score tables
//! - Zenoh binding for players and the authority, with liveliness tracking
//!
//! ## Example
//!
//! ```rust,no_run
//! use gridfall::{Game, GameConfig, GameEvent};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut game = Game::single_player(GameConfig::default());
//!     let events = game.events();
//!     game.start()?;
//!     game.place(2, 2)?;
//!
//!     while let Ok(event) = events.recv_async().await {
//!         if let GameEvent::GameOver(stats) = event {
//!             println!("{}", stats);
//!             break;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod authority;
pub mod config;
pub mod error;
pub mod game;
pub mod grid;
pub mod multiplayer;
pub mod network;
pub mod piece;
pub mod protocol;
pub mod scores;
pub mod types;

// Re-exports for convenience
pub use authority::PieceAuthority;
pub use config::{GameConfig, HostConfig};
pub use error::{GameError, Result};
pub use game::supply::{PieceSupply, RandomSupply, RemoteSupply};
pub use game::types::{ClearReport, GameEvent, GameSnapshot, GameStats, Placement};
pub use game::Game;
pub use grid::{Coord, Grid};
pub use multiplayer::{Channel, MultiplayerGame};
pub use piece::{Piece, PieceKind, Rotation, PIECE_COUNT, PIECE_SIZE};
pub use protocol::{ClientMessage, ServerMessage, Standing};
pub use scores::{ScoreEntry, ScoreTable};
pub use types::PlayerId;
