pub mod attacks;
pub mod board;
pub mod game;
pub mod movegen;
pub mod types;

pub use board::{Board, GameState, PositionKey, START_FEN};
pub use game::{Game, PlayerKind};
pub use movegen::{legal_moves, legal_moves_from, perft};
pub use types::*;
