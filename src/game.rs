use serde::Serialize;

use crate::board::{Board, Color, Score};
use crate::error::GameError;

pub const WAITING_FOR_OPPONENT: &str = "Waiting for opponent...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Waiting,
    Playing,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Winner {
    #[serde(rename = "B")]
    Black,
    #[serde(rename = "W")]
    White,
    #[serde(rename = "D")]
    Draw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LastMove {
    pub row: usize,
    pub col: usize,
    pub by: Color,
}

/// Authoritative state of one game. Replaced wholesale by `apply_move`;
/// never mutated in place on a move, so a snapshot handed to an in-flight
/// broadcast stays valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub board: Board,
    /// Whose move is legal next. Meaningless unless status is Playing.
    pub turn: Color,
    pub status: Status,
    pub winner: Option<Winner>,
    pub last_move: Option<LastMove>,
    /// Human-readable status line. Derived, not authoritative.
    pub message: String,
}

impl GameState {
    pub fn new() -> Self {
        Self {
            board: Board::standard_start(),
            turn: Color::Black,
            status: Status::Waiting,
            winner: None,
            last_move: None,
            message: WAITING_FOR_OPPONENT.to_string(),
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies `color`'s move at `(row,col)` and resolves the turn: game over
/// when neither side can move, forced pass (mover goes again) when only the
/// opponent is stuck, otherwise the turn alternates.
///
/// Deterministic and side-effect-free; never inspects connection identity.
pub fn apply_move(
    state: &GameState,
    color: Color,
    row: usize,
    col: usize,
) -> Result<GameState, GameError> {
    let flips = state.board.legal_flips(color, row, col);
    if flips.is_empty() {
        return Err(GameError::IllegalMove);
    }

    let mut board = state.board;
    board.set(row, col, Some(color));
    for sq in &flips {
        board.set(sq.row, sq.col, Some(color));
    }

    let opponent = color.opponent();
    let next_moves = board.valid_moves(opponent);
    let current_moves = board.valid_moves(color);

    let (turn, status, winner, message) = if next_moves.is_empty() && current_moves.is_empty() {
        let score = board.score();
        let winner = tally_winner(score);
        (opponent, Status::Ended, Some(winner), game_over_message(winner, score))
    } else if next_moves.is_empty() {
        // Opponent must pass, the mover goes again.
        let message = format!("{} plays again (opponent has no moves).", color.name());
        (color, Status::Playing, None, message)
    } else {
        (opponent, Status::Playing, None, format!("{}'s turn.", opponent.name()))
    };

    Ok(GameState {
        board,
        turn,
        status,
        winner,
        last_move: Some(LastMove { row, col, by: color }),
        message,
    })
}

fn tally_winner(score: Score) -> Winner {
    if score.black > score.white {
        Winner::Black
    } else if score.white > score.black {
        Winner::White
    } else {
        Winner::Draw
    }
}

fn game_over_message(winner: Winner, score: Score) -> String {
    let outcome = match winner {
        Winner::Black => "Black wins",
        Winner::White => "White wins",
        Winner::Draw => "Draw",
    };
    format!("Game over. {} ({}-{}).", outcome, score.black, score.white)
}
