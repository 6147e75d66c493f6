use serde::{Deserialize, Serialize};

use crate::board::{Color, Score, Square};
use crate::error::GameError;
use crate::game::GameState;

/// Client -> server requests. One `type`-tagged JSON object per text frame.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Request {
    CreateRoom,
    JoinRoom { code: String },
    MakeMove { code: String, row: usize, col: usize },
    LeaveRoom { code: String },
}

/// Server -> client replies and broadcasts.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    RoomCreated {
        code: String,
        your_color: Color,
        state: PublicState,
    },
    #[serde(rename_all = "camelCase")]
    RoomJoined {
        code: String,
        your_color: Color,
        state: PublicState,
    },
    StateUpdated {
        state: PublicState,
    },
    Error {
        kind: &'static str,
        detail: String,
    },
}

impl ServerMessage {
    pub fn error(err: GameError) -> Self {
        ServerMessage::Error {
            kind: err.kind(),
            detail: err.to_string(),
        }
    }
}

/// The projection broadcast to a room: the full game state plus the derived
/// score and the legal moves for the color on turn, so a client can render
/// hints without reimplementing the rules. Reveals nothing about which
/// connection holds which seat.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicState {
    #[serde(flatten)]
    pub state: GameState,
    pub score: Score,
    pub valid_moves: Vec<Square>,
}

impl PublicState {
    pub fn of(state: &GameState) -> Self {
        Self {
            score: state.board.score(),
            valid_moves: state.board.valid_moves(state.turn),
            state: state.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Color;

    #[test]
    fn requests_parse_from_tagged_json() {
        let req: Request = serde_json::from_str(r#"{"type":"createRoom"}"#).unwrap();
        assert!(matches!(req, Request::CreateRoom));

        let req: Request =
            serde_json::from_str(r#"{"type":"makeMove","code":"ABCDE","row":2,"col":3}"#).unwrap();
        match req {
            Request::MakeMove { code, row, col } => {
                assert_eq!(code, "ABCDE");
                assert_eq!((row, col), (2, 3));
            }
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[test]
    fn malformed_frames_are_rejected() {
        assert!(serde_json::from_str::<Request>(r#"{"type":"castRune"}"#).is_err());
        assert!(serde_json::from_str::<Request>(r#"{"type":"joinRoom"}"#).is_err());
        assert!(serde_json::from_str::<Request>("not json").is_err());
    }

    #[test]
    fn projection_serializes_full_state() {
        let state = GameState::new();
        let public = PublicState::of(&state);
        let value = serde_json::to_value(&public).unwrap();

        assert_eq!(value["turn"], "B");
        assert_eq!(value["status"], "waiting");
        assert_eq!(value["winner"], serde_json::Value::Null);
        assert_eq!(value["lastMove"], serde_json::Value::Null);
        assert_eq!(value["score"]["black"], 2);
        assert_eq!(value["score"]["white"], 2);
        assert_eq!(value["validMoves"].as_array().unwrap().len(), 4);
        assert_eq!(value["board"][3][3], "W");
        assert_eq!(value["board"][0][0], serde_json::Value::Null);
        assert_eq!(value["message"], "Waiting for opponent...");
    }

    #[test]
    fn error_message_carries_kind_and_detail() {
        let msg = ServerMessage::error(GameError::NotYourTurn);
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["kind"], "notYourTurn");
        assert_eq!(value["detail"], "Not your turn.");
    }

    #[test]
    fn your_color_is_camel_cased() {
        let msg = ServerMessage::RoomCreated {
            code: "QWERT".to_string(),
            your_color: Color::Black,
            state: PublicState::of(&GameState::new()),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "roomCreated");
        assert_eq!(value["yourColor"], "B");
    }
}
