use std::collections::HashMap;
use std::fmt;

use log::{debug, info};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::board::Color;
use crate::error::GameError;
use crate::game::{GameState, Status};

/// Identifies one client connection for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(pub u64);

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn_{}", self.0)
    }
}

const CODE_LEN: usize = 5;
// Confusable characters (I, O, 0, 1) omitted.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub const PLAYER_LEFT: &str = "A player left. Waiting for opponent...";
pub const PLAYER_DISCONNECTED: &str = "A player disconnected. Waiting for opponent...";

/// Two player seats plus the authoritative game state, keyed by `code`.
#[derive(Debug, Clone)]
pub struct Room {
    pub code: String,
    black: Option<ConnId>,
    white: Option<ConnId>,
    pub state: GameState,
}

impl Room {
    fn new(code: String, creator: ConnId) -> Self {
        Self {
            code,
            black: Some(creator),
            white: None,
            state: GameState::new(),
        }
    }

    pub fn seat(&self, color: Color) -> Option<ConnId> {
        match color {
            Color::Black => self.black,
            Color::White => self.white,
        }
    }

    /// The color `conn` is seated as, if any.
    pub fn color_of(&self, conn: ConnId) -> Option<Color> {
        if self.black == Some(conn) {
            Some(Color::Black)
        } else if self.white == Some(conn) {
            Some(Color::White)
        } else {
            None
        }
    }

    /// Every connection currently seated in this room.
    pub fn seated(&self) -> impl Iterator<Item = ConnId> + '_ {
        self.black.iter().chain(self.white.iter()).copied()
    }

    pub fn is_full(&self) -> bool {
        self.black.is_some() && self.white.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.black.is_none() && self.white.is_none()
    }

    /// Black seat first, then White. If the creator disconnected and left
    /// Black empty, the next joiner takes Black.
    fn fill_first_empty(&mut self, conn: ConnId) -> Option<Color> {
        if self.black.is_none() {
            self.black = Some(conn);
            Some(Color::Black)
        } else if self.white.is_none() {
            self.white = Some(conn);
            Some(Color::White)
        } else {
            None
        }
    }

    /// Vacates every seat held by `conn`. Returns whether anything changed.
    fn vacate(&mut self, conn: ConnId) -> bool {
        let mut changed = false;
        if self.black == Some(conn) {
            self.black = None;
            changed = true;
        }
        if self.white == Some(conn) {
            self.white = None;
            changed = true;
        }
        changed
    }
}

/// What happened to a room after a connection departed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Departure {
    /// Both seats empty; the room was destroyed.
    Deleted,
    /// Someone is still seated; the game is paused until the seat refills.
    Paused { remaining: Vec<ConnId> },
}

/// Owns every active room. Injected into the connection-handling entry
/// point; there is no ambient/static room map, so tests can run isolated
/// registries side by side.
pub struct RoomRegistry {
    rooms: HashMap<String, Room>,
    rng: SmallRng,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: HashMap::new(),
            rng: SmallRng::from_entropy(),
        }
    }

    /// Deterministic code generation, for tests.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rooms: HashMap::new(),
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn get(&self, code: &str) -> Option<&Room> {
        self.rooms.get(code)
    }

    pub fn get_mut(&mut self, code: &str) -> Option<&mut Room> {
        self.rooms.get_mut(code)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Creates a room with a fresh code and seats the creator as Black.
    pub fn create(&mut self, conn: ConnId) -> &Room {
        let code = loop {
            let candidate = self.new_code();
            if !self.rooms.contains_key(&candidate) {
                break candidate;
            }
        };
        info!("{conn} created room {code}");
        self.rooms
            .entry(code.clone())
            .or_insert_with(|| Room::new(code, conn))
    }

    /// Seats `conn` in the first empty slot, Black before White. When the
    /// second seat fills, a Waiting room starts Playing with Black to move;
    /// an Ended game is never reopened.
    pub fn join(&mut self, code: &str, conn: ConnId) -> Result<(Color, &Room), GameError> {
        let room = self.rooms.get_mut(code).ok_or(GameError::RoomNotFound)?;
        if room.is_full() {
            return Err(GameError::RoomFull);
        }
        let color = room.fill_first_empty(conn).ok_or(GameError::RoomFull)?;
        if room.is_full() && room.state.status == Status::Waiting {
            room.state.status = Status::Playing;
            room.state.turn = Color::Black;
            room.state.message = "Black's turn.".to_string();
        }
        info!("{conn} joined room {code} as {}", color.name());
        Ok((color, &*room))
    }

    /// An explicit leave request. Unknown rooms and unseated connections are
    /// silently ignored.
    pub fn leave(&mut self, code: &str, conn: ConnId) -> Option<Departure> {
        self.depart(code, conn, PLAYER_LEFT)
    }

    /// Vacates every seat held by `conn` in every room. A disconnect can
    /// arrive at any time; it is a state transition, not an error.
    pub fn disconnect(&mut self, conn: ConnId) -> Vec<(String, Departure)> {
        let affected: Vec<String> = self
            .rooms
            .iter()
            .filter(|(_, room)| room.color_of(conn).is_some())
            .map(|(code, _)| code.clone())
            .collect();
        affected
            .into_iter()
            .filter_map(|code| {
                let departure = self.depart(&code, conn, PLAYER_DISCONNECTED)?;
                Some((code, departure))
            })
            .collect()
    }

    fn depart(&mut self, code: &str, conn: ConnId, message: &str) -> Option<Departure> {
        let room = self.rooms.get_mut(code)?;
        if !room.vacate(conn) {
            return None;
        }
        if !room.is_empty() {
            // Pause on any departure, even mid-game. The board and turn are
            // kept; play resumes once the seat refills. An ended game stays
            // ended.
            if room.state.status != Status::Ended {
                room.state.status = Status::Waiting;
                room.state.message = message.to_string();
            }
            debug!("{conn} departed room {code}, paused");
            return Some(Departure::Paused {
                remaining: room.seated().collect(),
            });
        }
        self.rooms.remove(code);
        info!("room {code} deleted (both seats empty)");
        Some(Departure::Deleted)
    }

    fn new_code(&mut self) -> String {
        (0..CODE_LEN)
            .map(|_| CODE_ALPHABET[self.rng.gen_range(0..CODE_ALPHABET.len())] as char)
            .collect()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
