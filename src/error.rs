use thiserror::Error;

/// Request failures. All are recoverable by the client: each is reported
/// only to the offending connection and never ends a room or the process.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GameError {
    #[error("Room not found.")]
    RoomNotFound,
    #[error("Room is full.")]
    RoomFull,
    #[error("You are not a player in this room.")]
    NotAPlayer,
    #[error("Not your turn.")]
    NotYourTurn,
    #[error("Game is not in playing state.")]
    InvalidState,
    #[error("Illegal move.")]
    IllegalMove,
    #[error("Malformed request.")]
    BadRequest,
}

impl GameError {
    /// Stable machine-readable tag for the wire `{kind, detail}` shape.
    pub fn kind(self) -> &'static str {
        match self {
            GameError::RoomNotFound => "roomNotFound",
            GameError::RoomFull => "roomFull",
            GameError::NotAPlayer => "notAPlayer",
            GameError::NotYourTurn => "notYourTurn",
            GameError::InvalidState => "invalidState",
            GameError::IllegalMove => "illegalMove",
            GameError::BadRequest => "badRequest",
        }
    }
}
