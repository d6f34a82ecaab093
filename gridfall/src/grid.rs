//! Board model: cell storage and placement primitives

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::piece::{Piece, PIECE_SIZE};

/// Value returned by [`Grid::get`] for coordinates outside the board
pub const OUT_OF_BOUNDS: i32 = -1;

/// Cell coordinate on a grid, column first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub x: usize,
    pub y: usize,
}

impl Coord {
    pub fn new(x: usize, y: usize) -> Self {
        Coord { x, y }
    }
}

/// Rectangular board of cell values
///
/// Every cell holds a value in `[0, 15]`: 0 is empty, anything else is the
/// color class of the piece that filled it.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Grid {
    cols: usize,
    rows: usize,
    // Row-major cell values
    cells: Vec<u8>,
}

impl Grid {
    pub fn new(cols: usize, rows: usize) -> Self {
        assert!(cols > 0 && rows > 0, "grid must have at least one cell");
        Grid {
            cols,
            rows,
            cells: vec![0; cols * rows],
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    fn contains(&self, x: isize, y: isize) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.cols && (y as usize) < self.rows
    }

    /// Cell value at `(x, y)`, or [`OUT_OF_BOUNDS`] outside the board
    pub fn get(&self, x: isize, y: isize) -> i32 {
        if !self.contains(x, y) {
            return OUT_OF_BOUNDS;
        }
        self.cells[y as usize * self.cols + x as usize] as i32
    }

    /// Write a cell value. The caller guarantees `(x, y)` is on the board.
    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        assert!(
            x < self.cols && y < self.rows,
            "cell ({}, {}) outside {}x{} grid",
            x,
            y,
            self.cols,
            self.rows
        );
        self.cells[y * self.cols + x] = value;
    }

    // Grid coordinate of pattern cell (i, j) when the piece center sits on the anchor
    fn project(piece: &Piece, anchor_x: isize, anchor_y: isize, i: usize, j: usize) -> (isize, isize) {
        let center = piece.center() as isize;
        (anchor_x - center + i as isize, anchor_y - center + j as isize)
    }

    /// Whether every occupied cell of `piece`, centered on the anchor, lands on an empty cell
    pub fn can_place(&self, piece: &Piece, anchor_x: isize, anchor_y: isize) -> bool {
        piece.occupied().all(|(i, j, _)| {
            let (x, y) = Self::project(piece, anchor_x, anchor_y, i, j);
            self.get(x, y) == 0
        })
    }

    /// Write the piece onto the grid. Must only follow a successful [`Grid::can_place`].
    pub fn place(&mut self, piece: &Piece, anchor_x: isize, anchor_y: isize) {
        debug_assert!(self.can_place(piece, anchor_x, anchor_y));
        for (i, j, value) in piece.occupied() {
            let (x, y) = Self::project(piece, anchor_x, anchor_y, i, j);
            self.set(x as usize, y as usize, value);
        }
    }

    /// Whether the piece fits at any anchor in its current orientation
    ///
    /// Not consulted by the game loop; a board with no legal placement is only
    /// ever resolved by timeouts.
    pub fn can_place_anywhere(&self, piece: &Piece) -> bool {
        let margin = PIECE_SIZE as isize;
        (-margin..self.rows as isize + margin).any(|y| {
            (-margin..self.cols as isize + margin).any(|x| self.can_place(piece, x, y))
        })
    }

    pub fn is_row_complete(&self, y: usize) -> bool {
        (0..self.cols).all(|x| self.cells[y * self.cols + x] != 0)
    }

    pub fn is_column_complete(&self, x: usize) -> bool {
        (0..self.rows).all(|y| self.cells[y * self.cols + x] != 0)
    }

    /// Empty every listed cell
    pub fn clear(&mut self, cells: &BTreeSet<Coord>) {
        for coord in cells {
            self.set(coord.x, coord.y, 0);
        }
    }

    pub fn reset(&mut self) {
        self.cells.fill(0);
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|v| *v == 0)
    }
}
