// Server-authoritative multiplayer Reversi.
pub mod board;
pub mod error;
pub mod game;
pub mod hub;
pub mod protocol;
pub mod room;
pub mod server;
