//! Values produced by a running game

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::grid::{Coord, Grid};
use crate::piece::Piece;
use crate::protocol::Standing;
use crate::scores::ScoreEntry;

/// Score counters of a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStats {
    pub score: u32,
    pub level: u32,
    pub lives: u32,
    pub multiplier: u32,
}

impl std::fmt::Display for GameStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Score: {}  Level: {}  Lives: {}  Multiplier: x{}",
            self.score, self.level, self.lives, self.multiplier
        )
    }
}

/// Lines completed by one placement
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearReport {
    /// Indices of complete rows
    pub rows: Vec<usize>,
    /// Indices of complete columns
    pub columns: Vec<usize>,
    /// Every cell on a complete line, each counted once
    pub cells: BTreeSet<Coord>,
    /// Points awarded for the clear
    pub points: u32,
}

impl ClearReport {
    /// Scan a grid for complete rows and columns
    ///
    /// Rows and columns are swept independently since a cell can complete
    /// both at once; `points` is left at zero.
    pub fn detect(grid: &Grid) -> Self {
        let rows: Vec<usize> = (0..grid.rows()).filter(|y| grid.is_row_complete(*y)).collect();
        let columns: Vec<usize> = (0..grid.cols())
            .filter(|x| grid.is_column_complete(*x))
            .collect();

        let mut cells = BTreeSet::new();
        for y in &rows {
            cells.extend((0..grid.cols()).map(|x| Coord::new(x, *y)));
        }
        for x in &columns {
            cells.extend((0..grid.rows()).map(|y| Coord::new(*x, y)));
        }

        ClearReport {
            rows,
            columns,
            cells,
            points: 0,
        }
    }

    pub fn lines(&self) -> usize {
        self.rows.len() + self.columns.len()
    }

    pub fn blocks(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Outcome of a placement attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// The piece did not fit, or the game is not running. Nothing changed.
    Rejected,
    /// The piece was placed; the report is empty when no line was completed
    Placed(ClearReport),
}

impl Placement {
    pub fn is_placed(&self) -> bool {
        matches!(self, Placement::Placed(_))
    }
}

/// Notifications emitted by a game
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// The current or following piece changed
    NextPiece { current: Piece, following: Piece },
    /// Lines were completed and their cells emptied
    LinesCleared(ClearReport),
    /// Counters changed
    Stats(GameStats),
    /// The turn timer was armed with this delay
    Loop { delay: Duration },
    /// Standings received from the piece authority
    Standings(Vec<Standing>),
    /// Online high-score list received from the piece authority
    HiScores(Vec<ScoreEntry>),
    /// The game ended with these final counters
    GameOver(GameStats),
}

/// Point-in-time copy of a game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub stats: GameStats,
    pub timer_delay: Duration,
    pub current: Option<Piece>,
    pub following: Option<Piece>,
    pub grid: Grid,
    pub running: bool,
    pub over: bool,
}
