use serde::{Deserialize, Serialize};

pub const SIZE: usize = 8;

const DIRECTIONS: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Disc color. Serialized as "B"/"W" on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    #[serde(rename = "B")]
    Black,
    #[serde(rename = "W")]
    White,
}

impl Color {
    pub fn opponent(self) -> Color {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Color::Black => "Black",
            Color::White => "White",
        }
    }
}

pub type Cell = Option<Color>;

/// A board coordinate, row-major from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Square {
    pub row: usize,
    pub col: usize,
}

/// Piece tally for both colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Score {
    pub black: u32,
    pub white: u32,
}

/// Fixed 8x8 grid of cells. `Copy`, so move application works on a fresh
/// value and prior snapshots stay readable by anyone still holding one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    cells: [[Cell; SIZE]; SIZE],
}

impl Board {
    pub fn empty() -> Self {
        Self {
            cells: [[None; SIZE]; SIZE],
        }
    }

    /// Standard Reversi start: the four center cells, each color's pair on
    /// one diagonal.
    pub fn standard_start() -> Self {
        let mut board = Self::empty();
        board.set(3, 3, Some(Color::White));
        board.set(3, 4, Some(Color::Black));
        board.set(4, 3, Some(Color::Black));
        board.set(4, 4, Some(Color::White));
        board
    }

    /// Parses a board from 8 rows of 8 characters: 'B', 'W' or '.'.
    pub fn from_rows(rows: [&str; SIZE]) -> Result<Self, String> {
        let mut board = Self::empty();
        for (r, row) in rows.iter().enumerate() {
            if row.len() != SIZE {
                return Err(format!("row {r} has length {}, expected {SIZE}", row.len()));
            }
            for (c, ch) in row.chars().enumerate() {
                board.cells[r][c] = match ch {
                    'B' => Some(Color::Black),
                    'W' => Some(Color::White),
                    '.' => None,
                    _ => return Err(format!("bad cell '{ch}' at ({r},{c})")),
                };
            }
        }
        Ok(board)
    }

    pub fn get(&self, row: usize, col: usize) -> Cell {
        self.cells[row][col]
    }

    pub fn set(&mut self, row: usize, col: usize, cell: Cell) {
        self.cells[row][col] = cell;
    }

    /// Cells captured by `color` playing at `(row,col)`: for each direction,
    /// the run of opponent discs that terminates on one of `color`'s own.
    /// Empty when the move is illegal (including out of bounds or occupied).
    pub fn legal_flips(&self, color: Color, row: usize, col: usize) -> Vec<Square> {
        if row >= SIZE || col >= SIZE || self.cells[row][col].is_some() {
            return Vec::new();
        }
        let opp = color.opponent();
        let mut flips = Vec::new();

        for (dr, dc) in DIRECTIONS {
            let mut r = row as i32 + dr;
            let mut c = col as i32 + dc;
            let line_start = flips.len();
            while in_bounds(r, c) && self.cells[r as usize][c as usize] == Some(opp) {
                flips.push(Square {
                    row: r as usize,
                    col: c as usize,
                });
                r += dr;
                c += dc;
            }
            let closed = in_bounds(r, c) && self.cells[r as usize][c as usize] == Some(color);
            if !closed {
                flips.truncate(line_start);
            }
        }
        flips
    }

    /// Every empty cell where `color` has at least one flip.
    pub fn valid_moves(&self, color: Color) -> Vec<Square> {
        let mut moves = Vec::new();
        for row in 0..SIZE {
            for col in 0..SIZE {
                if !self.legal_flips(color, row, col).is_empty() {
                    moves.push(Square { row, col });
                }
            }
        }
        moves
    }

    pub fn score(&self) -> Score {
        let mut score = Score { black: 0, white: 0 };
        for row in self.cells.iter() {
            for cell in row {
                match cell {
                    Some(Color::Black) => score.black += 1,
                    Some(Color::White) => score.white += 1,
                    None => {}
                }
            }
        }
        score
    }

    pub fn empty_count(&self) -> u32 {
        SIZE as u32 * SIZE as u32 - self.score().black - self.score().white
    }
}

fn in_bounds(row: i32, col: i32) -> bool {
    (0..SIZE as i32).contains(&row) && (0..SIZE as i32).contains(&col)
}
