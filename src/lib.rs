//! Chess rules engine on a mailbox board.
//!
//! `engine` holds the board, legal move generation and the game session;
//! `ai` holds evaluation and the move pickers; `config` reads settings from
//! the environment.

pub mod ai;
pub mod config;
pub mod engine;
