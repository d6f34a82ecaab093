use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};

/// Side length of every piece pattern
pub const PIECE_SIZE: usize = 3;

/// Number of shapes in the catalog
pub const PIECE_COUNT: u8 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    // Rotate left
    pub fn rotate_left(&self) -> Rotation {
        match self {
            Rotation::R0 => Rotation::R270,
            Rotation::R90 => Rotation::R0,
            Rotation::R180 => Rotation::R90,
            Rotation::R270 => Rotation::R180,
        }
    }
    // Rotate right
    pub fn rotate_right(&self) -> Rotation {
        match self {
            Rotation::R0 => Rotation::R90,
            Rotation::R90 => Rotation::R180,
            Rotation::R180 => Rotation::R270,
            Rotation::R270 => Rotation::R0,
        }
    }
}

type Pattern = [[bool; PIECE_SIZE]; PIECE_SIZE];

const X: bool = true;
const O: bool = false;

// Patterns are written row by row, top row first.
const PATTERNS: [Pattern; PIECE_COUNT as usize] = [
    [[O, O, O], [X, X, X], [O, O, O]], // line
    [[O, O, O], [X, X, X], [X, O, X]], // C
    [[O, X, O], [X, X, X], [O, X, O]], // plus
    [[O, O, O], [O, X, O], [O, O, O]], // dot
    [[X, X, O], [X, X, O], [O, O, O]], // square
    [[O, O, O], [X, X, X], [O, O, X]], // L
    [[O, O, X], [X, X, X], [O, O, O]], // J
    [[O, O, O], [O, X, X], [X, X, O]], // S
    [[X, X, O], [O, X, X], [O, O, O]], // Z
    [[X, O, O], [X, X, O], [X, O, O]], // T
    [[X, O, X], [O, X, O], [X, O, X]], // X
    [[O, O, O], [X, X, O], [X, O, O]], // corner
    [[X, O, O], [X, X, O], [O, O, O]], // inverse corner
    [[X, O, O], [O, X, O], [O, O, X]], // diagonal
    [[O, X, O], [O, X, O], [O, O, O]], // double
];

/// The fixed catalog of piece shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceKind {
    Line,
    C,
    Plus,
    Dot,
    Square,
    L,
    J,
    S,
    Z,
    T,
    X,
    Corner,
    InverseCorner,
    Diagonal,
    Double,
}

impl PieceKind {
    /// Every kind, ordered by identifier
    pub const ALL: [PieceKind; PIECE_COUNT as usize] = [
        PieceKind::Line,
        PieceKind::C,
        PieceKind::Plus,
        PieceKind::Dot,
        PieceKind::Square,
        PieceKind::L,
        PieceKind::J,
        PieceKind::S,
        PieceKind::Z,
        PieceKind::T,
        PieceKind::X,
        PieceKind::Corner,
        PieceKind::InverseCorner,
        PieceKind::Diagonal,
        PieceKind::Double,
    ];

    /// Look up a kind by its identifier in `[0, 15)`
    pub fn from_id(id: u8) -> Option<PieceKind> {
        Self::ALL.get(id as usize).copied()
    }

    pub fn id(&self) -> u8 {
        *self as u8
    }

    /// Cell value written to the grid for this kind, in `[1, 15]`
    pub fn color(&self) -> u8 {
        self.id() + 1
    }

    pub fn name(&self) -> &'static str {
        match self {
            PieceKind::Line => "Line",
            PieceKind::C => "C",
            PieceKind::Plus => "Plus",
            PieceKind::Dot => "Dot",
            PieceKind::Square => "Square",
            PieceKind::L => "L",
            PieceKind::J => "J",
            PieceKind::S => "S",
            PieceKind::Z => "Z",
            PieceKind::T => "T",
            PieceKind::X => "X",
            PieceKind::Corner => "Corner",
            PieceKind::InverseCorner => "Inverse Corner",
            PieceKind::Diagonal => "Diagonal",
            PieceKind::Double => "Double",
        }
    }

    fn pattern(&self) -> &'static Pattern {
        &PATTERNS[self.id() as usize]
    }
}

impl std::fmt::Display for PieceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A catalog shape in a given orientation
///
/// The pattern is a `PIECE_SIZE` square whose center cell is the anchor used
/// when the piece is tested against or written into a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    kind: PieceKind,
    rotation: Rotation,
}

impl Piece {
    pub fn new(kind: PieceKind) -> Self {
        Piece {
            kind,
            rotation: Rotation::R0,
        }
    }

    /// Create a piece from a wire identifier
    pub fn from_id(id: u8) -> Result<Self> {
        PieceKind::from_id(id)
            .map(Piece::new)
            .ok_or(GameError::InvalidPiece(id as i64))
    }

    pub fn kind(&self) -> PieceKind {
        self.kind
    }

    pub fn id(&self) -> u8 {
        self.kind.id()
    }

    pub fn color(&self) -> u8 {
        self.kind.color()
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Offset from the pattern origin to its anchor cell
    pub fn center(&self) -> usize {
        PIECE_SIZE / 2
    }

    pub fn rotate_right(&mut self) {
        self.rotation = self.rotation.rotate_right();
    }

    pub fn rotate_left(&mut self) {
        self.rotation = self.rotation.rotate_left();
    }

    /// Color value at pattern column `x`, row `y` in the current orientation, 0 if empty
    pub fn cell(&self, x: usize, y: usize) -> u8 {
        let n = PIECE_SIZE - 1;
        let pattern = self.kind.pattern();
        let occupied = match self.rotation {
            Rotation::R0 => pattern[y][x],
            Rotation::R90 => pattern[n - x][y],
            Rotation::R180 => pattern[n - y][n - x],
            Rotation::R270 => pattern[x][n - y],
        };
        if occupied {
            self.color()
        } else {
            0
        }
    }

    /// Occupied cells as `(x, y, color)` in pattern coordinates
    pub fn occupied(&self) -> impl Iterator<Item = (usize, usize, u8)> + '_ {
        (0..PIECE_SIZE).flat_map(move |y| {
            (0..PIECE_SIZE).filter_map(move |x| {
                let value = self.cell(x, y);
                (value != 0).then_some((x, y, value))
            })
        })
    }
}

impl std::fmt::Display for Piece {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)
    }
}
