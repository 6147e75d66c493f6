use log::debug;

use crate::board::Color;
use crate::error::GameError;
use crate::game::{self, Status};
use crate::protocol::{PublicState, Request, ServerMessage};
use crate::room::{ConnId, Departure, RoomRegistry};

/// A message addressed to one connection.
pub type Outbound = (ConnId, ServerMessage);

/// The session protocol handler. Resolves each request to a room and a
/// seat color, delegates to the rules engine, stores the resulting state
/// back onto the room and computes what to send to whom.
///
/// Purely synchronous: the caller (one processing loop) serializes requests,
/// so room mutation needs no locking.
pub struct Hub {
    registry: RoomRegistry,
}

impl Hub {
    pub fn new() -> Self {
        Self {
            registry: RoomRegistry::new(),
        }
    }

    pub fn with_registry(registry: RoomRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    /// Handles one request to completion, returning every message it
    /// produced. Errors go only to the requester, never into a broadcast.
    pub fn handle(&mut self, conn: ConnId, request: Request) -> Vec<Outbound> {
        match request {
            Request::CreateRoom => self.create_room(conn),
            Request::JoinRoom { code } => self.join_room(conn, &code),
            Request::MakeMove { code, row, col } => self.make_move(conn, &code, row, col),
            Request::LeaveRoom { code } => self.leave_room(conn, &code),
        }
    }

    /// First-class transition, not an error: vacate every seat `conn`
    /// holds, deleting rooms that empty out and pausing the rest.
    pub fn disconnect(&mut self, conn: ConnId) -> Vec<Outbound> {
        let mut out = Vec::new();
        for (code, departure) in self.registry.disconnect(conn) {
            if let Departure::Paused { remaining } = departure {
                if let Some(room) = self.registry.get(&code) {
                    let state = PublicState::of(&room.state);
                    out.extend(state_updates(&remaining, state));
                }
            }
        }
        out
    }

    fn create_room(&mut self, conn: ConnId) -> Vec<Outbound> {
        let room = self.registry.create(conn);
        vec![(
            conn,
            ServerMessage::RoomCreated {
                code: room.code.clone(),
                your_color: Color::Black,
                state: PublicState::of(&room.state),
            },
        )]
    }

    fn join_room(&mut self, conn: ConnId, code: &str) -> Vec<Outbound> {
        match self.registry.join(code, conn) {
            Err(err) => reject(conn, err),
            Ok((color, room)) => {
                let state = PublicState::of(&room.state);
                let mut out = vec![(
                    conn,
                    ServerMessage::RoomJoined {
                        code: room.code.clone(),
                        your_color: color,
                        state: state.clone(),
                    },
                )];
                let seated: Vec<ConnId> = room.seated().collect();
                out.extend(state_updates(&seated, state));
                out
            }
        }
    }

    fn make_move(&mut self, conn: ConnId, code: &str, row: usize, col: usize) -> Vec<Outbound> {
        let room = match self.registry.get_mut(code) {
            Some(room) => room,
            None => return reject(conn, GameError::RoomNotFound),
        };
        if room.state.status != Status::Playing {
            return reject(conn, GameError::InvalidState);
        }
        let color = match room.color_of(conn) {
            Some(color) => color,
            None => return reject(conn, GameError::NotAPlayer),
        };
        if room.state.turn != color {
            return reject(conn, GameError::NotYourTurn);
        }
        match game::apply_move(&room.state, color, row, col) {
            Err(err) => reject(conn, err),
            Ok(next) => {
                // Wholesale replacement of the room's state.
                room.state = next;
                debug!("{conn} played ({row},{col}) in room {code}");
                let state = PublicState::of(&room.state);
                let seated: Vec<ConnId> = room.seated().collect();
                state_updates(&seated, state)
            }
        }
    }

    /// No reply to the leaver; whoever stays gets a state update. Unknown
    /// rooms and unseated leavers are ignored.
    fn leave_room(&mut self, conn: ConnId, code: &str) -> Vec<Outbound> {
        match self.registry.leave(code, conn) {
            Some(Departure::Paused { remaining }) => match self.registry.get(code) {
                Some(room) => state_updates(&remaining, PublicState::of(&room.state)),
                None => Vec::new(),
            },
            Some(Departure::Deleted) | None => Vec::new(),
        }
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

fn reject(conn: ConnId, err: GameError) -> Vec<Outbound> {
    debug!("{conn} rejected: {err}");
    vec![(conn, ServerMessage::error(err))]
}

fn state_updates(to: &[ConnId], state: PublicState) -> Vec<Outbound> {
    to.iter()
        .map(|&conn| (conn, ServerMessage::StateUpdated { state: state.clone() }))
        .collect()
}
