//! Legal move generation.
//!
//! Pipeline:
//!   1. Find pins and checks against the side to move.
//!   2. Generate pseudo-legal moves per piece. Pinned pieces only move along
//!      their pin line; king destinations are probed for attacks.
//!   3. In single check keep king moves and moves landing on a blocking or
//!      capturing square. In double check only king moves are generated.
//!   4. Safety pass: make each candidate, confirm the king is not attacked,
//!      undo.
//!
//! The last step catches what the pin scan cannot see, chiefly en passant
//! captures that expose the king along the rank.

use crate::engine::attacks::{
    self, DIAGONAL, Direction, KING_OFFSETS, KNIGHT_OFFSETS, ORTHOGONAL, PinsAndChecks,
};
use crate::engine::board::{Board, GameState};
use crate::engine::types::{CastlingRights, Color, Move, Piece, PieceKind, Square};

// =========================================================================
// Public API
// =========================================================================

/// Generate all legal moves for the side to move and refresh the state's
/// checkmate / stalemate flags.
pub fn legal_moves(state: &mut GameState) -> Vec<Move> {
    let us = state.side_to_move();
    let king = state.king_square(us);
    let pc = attacks::find_pins_and_checks(state.board(), king, us);

    let mut moves = Vec::with_capacity(64);
    match pc.checks.as_slice() {
        [] => generate_pseudo_legal(state, &pc, &mut moves),
        [check] => {
            generate_pseudo_legal(state, &pc, &mut moves);
            let targets = check.block_squares(king);
            moves.retain(|mv| {
                mv.piece_moved.kind == PieceKind::King
                    || targets.contains(&mv.to)
                    || (mv.is_en_passant() && mv.en_passant_victim() == check.square)
            });
        }
        _ => generate_king_moves(state, king, us, &pc, &mut moves),
    }

    moves.retain(|&mv| leaves_king_safe(state, mv));

    state.set_terminal_flags(moves.is_empty(), pc.in_check());
    moves
}

/// Legal moves starting on `from`.
pub fn legal_moves_from(state: &mut GameState, from: Square) -> Vec<Move> {
    legal_moves(state)
        .into_iter()
        .filter(|m| m.from == from)
        .collect()
}

/// Count leaf nodes of the legal move tree to `depth` plies.
pub fn perft(state: &mut GameState, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }
    let moves = legal_moves(state);
    if depth == 1 {
        return moves.len() as u64;
    }
    let mut nodes = 0;
    for mv in moves {
        state.make_move(mv);
        nodes += perft(state, depth - 1);
        state.undo_move();
    }
    nodes
}

/// Per-move node counts at the root, for comparing against other engines.
pub fn perft_divide(state: &mut GameState, depth: u32) -> Vec<(Move, u64)> {
    let moves = legal_moves(state);
    let mut out = Vec::with_capacity(moves.len());
    for mv in moves {
        state.make_move(mv);
        let nodes = if depth <= 1 {
            1
        } else {
            perft(state, depth - 1)
        };
        state.undo_move();
        out.push((mv, nodes));
    }
    out
}

// =========================================================================
// Safety pass
// =========================================================================

fn leaves_king_safe(state: &mut GameState, mv: Move) -> bool {
    let us = state.side_to_move();
    state.make_move(mv);
    let safe = !state.is_square_attacked(state.king_square(us), us);
    state.undo_move();
    safe
}

// =========================================================================
// Pseudo-legal generation (internal)
// =========================================================================

fn generate_pseudo_legal(state: &GameState, pc: &PinsAndChecks, moves: &mut Vec<Move>) {
    let us = state.side_to_move();
    let own: Vec<(Square, Piece)> = state
        .board()
        .pieces()
        .filter(|(_, p)| p.color == us)
        .collect();

    let board = state.board();
    for (from, piece) in own {
        let pin = pc.pin_direction(from);
        match piece.kind {
            PieceKind::Pawn => generate_pawn_moves(state, from, piece, pin, moves),
            PieceKind::Knight => generate_knight_moves(board, from, piece, pin, moves),
            PieceKind::Bishop => generate_slider_moves(board, from, piece, pin, &DIAGONAL, moves),
            PieceKind::Rook => generate_slider_moves(board, from, piece, pin, &ORTHOGONAL, moves),
            PieceKind::Queen => {
                generate_slider_moves(board, from, piece, pin, &DIAGONAL, moves);
                generate_slider_moves(board, from, piece, pin, &ORTHOGONAL, moves);
            }
            PieceKind::King => generate_king_moves(state, from, us, pc, moves),
        }
    }
}

/// A step in `dir` keeps a piece pinned along `pin` on its line.
#[inline]
fn along_pin(pin: Option<Direction>, dir: Direction) -> bool {
    match pin {
        None => true,
        Some(p) => p == dir || p == (-dir.0, -dir.1),
    }
}

// =========================================================================
// Pawn moves
// =========================================================================

fn generate_pawn_moves(
    state: &GameState,
    from: Square,
    piece: Piece,
    pin: Option<Direction>,
    moves: &mut Vec<Move>,
) {
    let board = state.board();
    let us = piece.color;
    let fwd = us.forward();

    // --- Pushes ---
    if along_pin(pin, (fwd, 0))
        && let Some(one) = from.offset(fwd, 0)
        && board.piece_at(one).is_none()
    {
        moves.push(Move::new(from, one, piece, None));
        if from.row() == us.pawn_row()
            && let Some(two) = one.offset(fwd, 0)
            && board.piece_at(two).is_none()
        {
            moves.push(Move::new(from, two, piece, None));
        }
    }

    // --- Captures and en passant ---
    for dc in [-1, 1] {
        if !along_pin(pin, (fwd, dc)) {
            continue;
        }
        let Some(to) = from.offset(fwd, dc) else {
            continue;
        };
        match board.piece_at(to) {
            Some(target) if target.color != us => {
                moves.push(Move::new(from, to, piece, Some(target)));
            }
            None if state.en_passant() == Some(to) => {
                moves.push(Move::en_passant(from, to, piece));
            }
            _ => {}
        }
    }
}

// =========================================================================
// Knight moves
// =========================================================================

fn generate_knight_moves(
    board: &Board,
    from: Square,
    piece: Piece,
    pin: Option<Direction>,
    moves: &mut Vec<Move>,
) {
    // A knight never stays on a line, so a pinned one cannot move.
    if pin.is_some() {
        return;
    }
    for (dr, dc) in KNIGHT_OFFSETS {
        let Some(to) = from.offset(dr, dc) else {
            continue;
        };
        match board.piece_at(to) {
            Some(target) if target.color == piece.color => {}
            captured => moves.push(Move::new(from, to, piece, captured)),
        }
    }
}

// =========================================================================
// Slider moves (bishop, rook, queen)
// =========================================================================

fn generate_slider_moves(
    board: &Board,
    from: Square,
    piece: Piece,
    pin: Option<Direction>,
    dirs: &[Direction],
    moves: &mut Vec<Move>,
) {
    for &dir in dirs {
        if !along_pin(pin, dir) {
            continue;
        }
        let mut cur = from;
        while let Some(to) = cur.offset(dir.0, dir.1) {
            match board.piece_at(to) {
                None => moves.push(Move::new(from, to, piece, None)),
                Some(target) => {
                    if target.color != piece.color {
                        moves.push(Move::new(from, to, piece, Some(target)));
                    }
                    break;
                }
            }
            cur = to;
        }
    }
}

// =========================================================================
// King moves and castling
// =========================================================================

fn generate_king_moves(
    state: &GameState,
    from: Square,
    us: Color,
    pc: &PinsAndChecks,
    moves: &mut Vec<Move>,
) {
    let Some(king) = state.piece_at(from) else {
        return;
    };

    for (dr, dc) in KING_OFFSETS {
        let Some(to) = from.offset(dr, dc) else {
            continue;
        };
        let target = state.piece_at(to);
        if target.is_some_and(|t| t.color == us) {
            continue;
        }
        if !state.king_destination_attacked(us, to) {
            moves.push(Move::new(from, to, king, target));
        }
    }

    if !pc.in_check() {
        generate_castling_moves(state, from, king, moves);
    }
}

fn generate_castling_moves(state: &GameState, from: Square, king: Piece, moves: &mut Vec<Move>) {
    let us = king.color;
    let rights = state.castling_rights();
    let board = state.board();

    if from.row() != us.back_row() || from.col() != 4 {
        return;
    }
    let rook = Some(Piece::new(us, PieceKind::Rook));
    let on_rank = |dc: i8| from.offset(0, dc);
    let attacked = |s: Square| state.is_square_attacked(s, us);
    let empty = |dc: i8| on_rank(dc).and_then(|s| board.piece_at(s)).is_none();
    let safe = |dc: i8| on_rank(dc).is_some_and(|s| !attacked(s));
    let rook_at = |dc: i8| on_rank(dc).is_some_and(|s| board.piece_at(s) == rook);

    // --- Kingside ---
    if rights.has(CastlingRights::kingside_flag(us))
        && rook_at(3)
        && empty(1)
        && empty(2)
        && safe(1)
        && safe(2)
        && let Some(to) = from.offset(0, 2)
    {
        moves.push(Move::castle(from, to, king));
    }

    // --- Queenside ---
    if rights.has(CastlingRights::queenside_flag(us))
        && rook_at(-4)
        && empty(-1)
        && empty(-2)
        && empty(-3)
        && safe(-1)
        && safe(-2)
        && let Some(to) = from.offset(0, -2)
    {
        moves.push(Move::castle(from, to, king));
    }
}

// =========================================================================
// Tests
// =========================================================================
