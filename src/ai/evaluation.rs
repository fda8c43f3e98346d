//! Static position evaluation.
//!
//! Scores are absolute, not relative to the side to move: positive favours
//! White, negative favours Black. Material uses whole-pawn units.

use crate::engine::board::{Board, GameState};
use crate::engine::types::Color;

/// Infinity sentinel for search bounds.
pub const INF: i32 = 100_000;

/// Magnitude of a checkmate score. Larger than any reachable material sum.
pub const CHECKMATE: i32 = 1000;

/// Score of a stalemated position.
pub const STALEMATE: i32 = 0;

/// Is this score a forced-mate score?
#[inline]
pub fn is_mate_score(score: i32) -> bool {
    score.abs() >= CHECKMATE
}

/// Material balance, White minus Black. Kings count zero.
pub fn score_material(board: &Board) -> i32 {
    board
        .pieces()
        .map(|(_, p)| match p.color {
            Color::White => p.kind.value(),
            Color::Black => -p.kind.value(),
        })
        .sum()
}

/// Evaluate a position whose legal-move count is already known.
///
/// With no legal moves the position is terminal: a mated White scores
/// `-CHECKMATE`, a mated Black `+CHECKMATE`, and stalemate is level.
pub fn evaluate(state: &GameState, legal_move_count: usize) -> i32 {
    if legal_move_count == 0 {
        if state.is_in_check() {
            return match state.side_to_move() {
                Color::White => -CHECKMATE,
                Color::Black => CHECKMATE,
            };
        }
        return STALEMATE;
    }
    score_material(state.board())
}

// =========================================================================
// Tests
// =========================================================================
