use gridfall::{Coord, GameSnapshot, Grid, Piece, Standing, PIECE_SIZE};

#[derive(Clone, PartialEq, Debug)]
pub enum TermCell {
    /// Board or preview cell holding a color class, 0 for empty
    FieldCell(u8),
    /// Cell covered by the piece under the cursor
    Ghost { fits: bool },
    BorderVertical,
    BorderHorizontal,
    BorderTopLeft,
    BorderTopRight,
    BorderBottomLeft,
    BorderBottomRight,
    Space,
    Message(String),
}

pub trait TermStyle {
    fn display<'a>(&self, cell: &'a TermCell) -> &'a str;
    fn width(&self, cell: &TermCell) -> usize;
}

pub trait TermRender {
    fn output(&self, style: &impl TermStyle) -> Vec<Vec<TermCell>>;
    fn render(&self, style: &impl TermStyle) -> Vec<String> {
        self.output(style)
            .iter()
            .map(|row| row.iter().map(|cell| style.display(cell)).collect())
            .collect()
    }
}

fn cells_width(row: &[TermCell], style: &impl TermStyle) -> usize {
    row.iter().map(|c| style.width(c)).sum()
}

// Make all lines in block the same width by padding with TermCell::Space
pub fn pad_block_right(block: &mut [Vec<TermCell>], style: &impl TermStyle) {
    assert_eq!(style.width(&TermCell::Space), 1);
    let width = block.iter().map(|row| cells_width(row, style)).max().unwrap_or(0);
    for row in block.iter_mut() {
        let padding = width - cells_width(row, style);
        row.extend(std::iter::repeat_n(TermCell::Space, padding));
    }
}

fn frame(mut lines: Vec<Vec<TermCell>>, inner_cols: usize) -> Vec<Vec<TermCell>> {
    for line in &mut lines {
        line.insert(0, TermCell::BorderVertical);
        line.push(TermCell::BorderVertical);
    }
    let edge = |left: TermCell, right: TermCell| {
        let mut line = vec![left];
        line.extend(std::iter::repeat_n(TermCell::BorderHorizontal, inner_cols));
        line.push(right);
        line
    };
    lines.insert(0, edge(TermCell::BorderTopLeft, TermCell::BorderTopRight));
    lines.push(edge(TermCell::BorderBottomLeft, TermCell::BorderBottomRight));
    lines
}

pub struct PlainTermStyle;

impl TermStyle for PlainTermStyle {
    fn display<'a>(&self, cell: &'a TermCell) -> &'a str {
        match cell {
            TermCell::FieldCell(0) => " .",
            TermCell::FieldCell(_) => "[]",
            TermCell::Ghost { fits: true } => "<>",
            TermCell::Ghost { fits: false } => "xx",
            TermCell::BorderVertical => "|",
            TermCell::BorderTopLeft
            | TermCell::BorderTopRight
            | TermCell::BorderBottomLeft
            | TermCell::BorderBottomRight => "+",
            TermCell::BorderHorizontal => "--",
            TermCell::Space => " ",
            TermCell::Message(s) => s.as_str(),
        }
    }
    fn width(&self, cell: &TermCell) -> usize {
        match cell {
            TermCell::FieldCell(_) | TermCell::Ghost { .. } | TermCell::BorderHorizontal => 2,
            TermCell::Message(s) => s.chars().count(),
            _ => 1,
        }
    }
}

pub struct AnsiTermStyle;

impl TermStyle for AnsiTermStyle {
    fn display<'a>(&self, cell: &'a TermCell) -> &'a str {
        match cell {
            TermCell::FieldCell(0) => "\x1b[0;90m .\x1b[0m",
            TermCell::FieldCell(color) => match color % 6 {
                1 => "\x1b[0;31m[]\x1b[0m",
                2 => "\x1b[0;32m[]\x1b[0m",
                3 => "\x1b[0;33m[]\x1b[0m",
                4 => "\x1b[0;34m[]\x1b[0m",
                5 => "\x1b[0;35m[]\x1b[0m",
                _ => "\x1b[0;36m[]\x1b[0m",
            },
            TermCell::Ghost { fits: true } => "\x1b[1;37m<>\x1b[0m",
            TermCell::Ghost { fits: false } => "\x1b[1;31mxx\x1b[0m",
            TermCell::BorderVertical => "│",
            TermCell::BorderTopLeft => "┌",
            TermCell::BorderTopRight => "┐",
            TermCell::BorderBottomLeft => "└",
            TermCell::BorderHorizontal => "──",
            TermCell::BorderBottomRight => "┘",
            TermCell::Space => " ",
            TermCell::Message(s) => s.as_str(),
        }
    }
    fn width(&self, cell: &TermCell) -> usize {
        PlainTermStyle.width(cell)
    }
}

/// Board with the current piece drawn at the cursor
pub struct BoardView<'a> {
    grid: &'a Grid,
    piece: Option<Piece>,
    cursor: Coord,
    game_over: bool,
}

impl<'a> BoardView<'a> {
    pub fn new(grid: &'a Grid, piece: Option<Piece>, cursor: Coord, game_over: bool) -> Self {
        Self { grid, piece, cursor, game_over }
    }

    fn ghost_cells(&self) -> Vec<Coord> {
        let Some(piece) = self.piece else {
            return Vec::new();
        };
        let center = piece.center() as isize;
        piece
            .occupied()
            .filter_map(|(i, j, _)| {
                let x = self.cursor.x as isize - center + i as isize;
                let y = self.cursor.y as isize - center + j as isize;
                (x >= 0 && y >= 0).then(|| Coord::new(x as usize, y as usize))
            })
            .collect()
    }
}

impl TermRender for BoardView<'_> {
    fn output(&self, style: &impl TermStyle) -> Vec<Vec<TermCell>> {
        let ghost = if self.game_over { Vec::new() } else { self.ghost_cells() };
        let fits = self.piece.is_some_and(|piece| {
            self.grid
                .can_place(&piece, self.cursor.x as isize, self.cursor.y as isize)
        });

        let mut lines: Vec<Vec<TermCell>> = (0..self.grid.rows())
            .map(|y| {
                (0..self.grid.cols())
                    .map(|x| {
                        if ghost.contains(&Coord::new(x, y)) {
                            TermCell::Ghost { fits }
                        } else {
                            let value = self.grid.get(x as isize, y as isize);
                            TermCell::FieldCell(value.max(0) as u8)
                        }
                    })
                    .collect()
            })
            .collect();

        if self.game_over && !lines.is_empty() {
            // cut to the board width so the frame stays aligned
            let width = self.grid.cols() * style.width(&TermCell::FieldCell(0));
            let text: String = " GAME OVER".chars().take(width).collect();
            let middle = lines.len() / 2;
            lines[middle] = vec![TermCell::Message(text)];
            pad_block_right(&mut lines, style);
        }
        frame(lines, self.grid.cols())
    }
}

/// A 3x3 framed piece, blank when no piece is held
pub struct PiecePreview(pub Option<Piece>);

impl TermRender for PiecePreview {
    fn output(&self, _style: &impl TermStyle) -> Vec<Vec<TermCell>> {
        let lines = (0..PIECE_SIZE)
            .map(|y| {
                (0..PIECE_SIZE)
                    .map(|x| TermCell::FieldCell(self.0.map_or(0, |piece| piece.cell(x, y))))
                    .collect()
            })
            .collect();
        frame(lines, PIECE_SIZE)
    }
}

/// Whole screen: board on the left, pieces and counters on the right
pub struct GameScreen<'a> {
    snapshot: &'a GameSnapshot,
    cursor: Coord,
    player: &'a str,
    time_left: f32,
    standings: &'a [Standing],
    message: Vec<String>,
}

impl<'a> GameScreen<'a> {
    pub fn new(
        snapshot: &'a GameSnapshot,
        cursor: Coord,
        player: &'a str,
        time_left: f32,
        standings: &'a [Standing],
        message: Vec<String>,
    ) -> Self {
        Self { snapshot, cursor, player, time_left, standings, message }
    }

    fn countdown(&self) -> String {
        const WIDTH: usize = 16;
        let filled = ((self.time_left.clamp(0.0, 1.0) * WIDTH as f32).round()) as usize;
        format!("[{}{}]", "#".repeat(filled), "-".repeat(WIDTH - filled))
    }

    fn side_panel(&self, style: &impl TermStyle) -> Vec<Vec<TermCell>> {
        let mut current = PiecePreview(self.snapshot.current).output(style);
        let following = PiecePreview(self.snapshot.following).output(style);
        for (line, next) in current.iter_mut().zip(following) {
            line.push(TermCell::Space);
            line.extend(next);
        }

        let stats = &self.snapshot.stats;
        let mut text = vec![
            String::new(),
            format!("Player: {}", self.player),
            format!("Score: {}", stats.score),
            format!("Level: {}", stats.level),
            format!("Lives: {}", stats.lives),
            format!("Multiplier: x{}", stats.multiplier),
            self.countdown(),
        ];
        if !self.standings.is_empty() {
            text.push(String::new());
            text.push("Standings:".to_string());
            text.extend(self.standings.iter().map(|s| match s.lives {
                Some(lives) => format!("  {} {} ({} lives)", s.name, s.score, lives),
                None => format!("  {} {} (out)", s.name, s.score),
            }));
        }
        text.extend(self.message.iter().cloned());

        current.extend(text.into_iter().map(|t| vec![TermCell::Message(t)]));
        current
    }
}

impl TermRender for GameScreen<'_> {
    fn output(&self, style: &impl TermStyle) -> Vec<Vec<TermCell>> {
        let mut board = BoardView::new(
            &self.snapshot.grid,
            self.snapshot.current,
            self.cursor,
            self.snapshot.over,
        )
        .output(style);
        let mut panel = self.side_panel(style);
        pad_block_right(&mut board, style);
        pad_block_right(&mut panel, style);

        let board_width = board.first().map_or(0, |row| cells_width(row, style));
        let height = board.len().max(panel.len());
        let mut lines = Vec::with_capacity(height);
        for i in 0..height {
            let mut line = board
                .get(i)
                .cloned()
                .unwrap_or_else(|| vec![TermCell::Space; board_width]);
            line.extend([TermCell::Space, TermCell::Space]);
            if let Some(row) = panel.get(i) {
                line.extend(row.iter().cloned());
            }
            lines.push(line);
        }
        lines
    }
}
