//! AI engine: the `AiEngine` trait and its three move pickers.
//!
//! The `AiEngine` trait defines the interface for all AI engines.
//! Three implementations are provided:
//!   - `RandomAi`: plays a random legal move.
//!   - `GreedyAi`: one-ply lookahead on the static evaluation.
//!   - `MinimaxAi`: fixed-depth minimax without pruning.
//!
//! Scores are absolute: White maximises and Black minimises regardless of
//! which side is searching.

use std::time::Instant;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::engine::board::GameState;
use crate::engine::movegen::legal_moves;
use crate::engine::types::{ChessError, Color, Move};

use super::evaluation::{INF, evaluate};

// =========================================================================
// AiEngine trait
// =========================================================================

/// The AI engine interface.
pub trait AiEngine: Send + Sync {
    /// Select a move for the side to move. Fails only when there is none.
    fn best_move(&self, state: &GameState) -> Result<Move, ChessError>;

    /// Human-readable name for this engine.
    fn name(&self) -> &str;
}

fn no_legal_moves() -> ChessError {
    ChessError::GameOver("no legal moves".to_string())
}

/// Does `score` beat `best` for `side`?
#[inline]
fn improves(side: Color, score: i32, best: i32) -> bool {
    match side {
        Color::White => score > best,
        Color::Black => score < best,
    }
}

// =========================================================================
// RandomAi
// =========================================================================

/// Picks a uniformly random legal move.
pub struct RandomAi;

impl AiEngine for RandomAi {
    fn best_move(&self, state: &GameState) -> Result<Move, ChessError> {
        let mut state = state.clone();
        let moves = legal_moves(&mut state);
        let mut rng = rand::thread_rng();
        moves.choose(&mut rng).copied().ok_or_else(no_legal_moves)
    }

    fn name(&self) -> &str {
        "RandomAi"
    }
}

// =========================================================================
// GreedyAi
// =========================================================================

/// Plays the move whose resulting position evaluates best right away.
/// Ties keep the first move found.
pub struct GreedyAi;

impl AiEngine for GreedyAi {
    fn best_move(&self, state: &GameState) -> Result<Move, ChessError> {
        let mut state = state.clone();
        let side = state.side_to_move();
        let mut best: Option<(Move, i32)> = None;

        for mv in legal_moves(&mut state) {
            state.make_move(mv);
            let replies = legal_moves(&mut state).len();
            let score = evaluate(&state, replies);
            state.undo_move();

            if best.is_none_or(|(_, b)| improves(side, score, b)) {
                best = Some((mv, score));
            }
        }

        best.map(|(mv, _)| mv).ok_or_else(no_legal_moves)
    }

    fn name(&self) -> &str {
        "GreedyAi"
    }
}

// =========================================================================
// MinimaxAi
// =========================================================================

/// How the root chooses among moves with equal scores.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TieBreak {
    /// A later equal-scoring move replaces the incumbent with probability ½.
    #[default]
    Random,
    /// Keep the first best move in generation order.
    FirstFound,
}

impl TieBreak {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Some(TieBreak::Random),
            "first" | "first_found" | "firstfound" => Some(TieBreak::FirstFound),
            _ => None,
        }
    }
}

/// Search statistics.
#[derive(Debug, Default)]
pub struct SearchStats {
    pub nodes: u64,
    pub depth: u32,
    pub score: i32,
    pub time_ms: u64,
}

/// Minimax over absolute scores. Legal moves are generated at every node,
/// depth 0 included, so mates and stalemates on the horizon score as such.
fn minimax(state: &mut GameState, depth: u32, nodes: &mut u64) -> i32 {
    *nodes += 1;

    let moves = legal_moves(state);
    if depth == 0 || moves.is_empty() {
        return evaluate(state, moves.len());
    }

    let side = state.side_to_move();
    let mut best = match side {
        Color::White => -INF,
        Color::Black => INF,
    };

    for mv in moves {
        state.make_move(mv);
        let score = minimax(state, depth - 1, nodes);
        state.undo_move();

        if improves(side, score, best) {
            best = score;
        }
    }

    best
}

/// Fixed-depth minimax engine.
#[derive(Clone, Debug)]
pub struct MinimaxAi {
    depth: u32,
    tie_break: TieBreak,
}

impl MinimaxAi {
    pub const DEFAULT_DEPTH: u32 = 2;

    pub fn new(depth: u32, tie_break: TieBreak) -> Self {
        Self {
            depth: depth.max(1),
            tie_break,
        }
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    /// Search `state` in place and return the chosen move with statistics.
    ///
    /// Every make is paired with an undo, so `state` is unchanged on return,
    /// terminal flags included. `None` means the position is terminal.
    pub fn search<R: Rng>(
        &self,
        state: &mut GameState,
        rng: &mut R,
    ) -> (Option<Move>, SearchStats) {
        let start = Instant::now();
        let side = state.side_to_move();
        let mut nodes = 1u64;

        let moves = legal_moves(state);
        if moves.is_empty() {
            return (
                None,
                SearchStats {
                    nodes,
                    depth: self.depth,
                    score: evaluate(state, 0),
                    time_ms: 0,
                },
            );
        }

        let mut best: Option<(Move, i32)> = None;
        for mv in moves {
            state.make_move(mv);
            let score = minimax(state, self.depth - 1, &mut nodes);
            state.undo_move();

            let replace = match best {
                None => true,
                Some((_, b)) if score == b => {
                    self.tie_break == TieBreak::Random && rng.gen_bool(0.5)
                }
                Some((_, b)) => improves(side, score, b),
            };
            if replace {
                best = Some((mv, score));
            }
        }

        // Child searches overwrote the flags; the root has moves.
        state.set_terminal_flags(false, false);

        let score = best.map_or(0, |(_, s)| s);
        let stats = SearchStats {
            nodes,
            depth: self.depth,
            score,
            time_ms: start.elapsed().as_millis() as u64,
        };
        let chosen = best.map(|(mv, _)| mv);

        if let Some(mv) = chosen {
            tracing::debug!(
                side = %side,
                depth = self.depth,
                nodes = stats.nodes,
                score,
                time_ms = stats.time_ms,
                chosen = %mv,
                "minimax search complete"
            );
        }

        (chosen, stats)
    }
}

impl Default for MinimaxAi {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DEPTH, TieBreak::default())
    }
}

impl AiEngine for MinimaxAi {
    fn best_move(&self, state: &GameState) -> Result<Move, ChessError> {
        let mut state = state.clone();
        let mut rng = rand::thread_rng();
        let (best, _stats) = self.search(&mut state, &mut rng);
        best.ok_or_else(no_legal_moves)
    }

    fn name(&self) -> &str {
        "MinimaxAi"
    }
}

// =========================================================================
// Tests
// =========================================================================
