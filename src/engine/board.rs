//! Mailbox board and the mutable game state.
//!
//! `Board` is a flat 64-entry array of optional pieces indexed by `Square`.
//! `GameState` layers side to move, a king-square cache, castling rights, the
//! en-passant target, an undo log and a position-key log on top of it. Every
//! change goes through `make_move` / `undo_move`.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::engine::attacks;
use crate::engine::movegen;
use crate::engine::types::{CastlingRights, ChessError, Color, Move, Piece, PieceKind, Square};

/// Standard starting position.
pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// 8×8 grid of piece-or-empty, row-major from a8 to h1.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Board {
    squares: [Option<Piece>; Square::NUM],
}

impl Board {
    /// A board with no pieces.
    pub const fn empty() -> Self {
        Board {
            squares: [None; Square::NUM],
        }
    }

    #[inline]
    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.squares[sq.index()]
    }

    #[inline]
    pub(crate) fn set(&mut self, sq: Square, piece: Option<Piece>) {
        self.squares[sq.index()] = piece;
    }

    #[inline]
    pub(crate) fn take(&mut self, sq: Square) -> Option<Piece> {
        self.squares[sq.index()].take()
    }

    /// Occupied squares in row-major order.
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(|sq| self.piece_at(sq).map(|p| (sq, p)))
    }

    /// Read-only 8×8 snapshot, `rows()[row][col]`, row 0 = rank 8.
    pub fn rows(&self) -> [[Option<Piece>; 8]; 8] {
        std::array::from_fn(|row| std::array::from_fn(|col| self.squares[row * 8 + col]))
    }

    /// Square of the given side's king, scanning the board.
    pub fn find_king(&self, color: Color) -> Option<Square> {
        self.pieces()
            .find(|(_, p)| p.is(color, PieceKind::King))
            .map(|(sq, _)| sq)
    }

    /// Render the board as an 8-line string (rank 8 at top).
    pub fn board_string(&self) -> String {
        let mut s = String::with_capacity(200);
        for row in 0..8u8 {
            s.push((b'8' - row) as char);
            s.push(' ');
            for col in 0..8u8 {
                let ch = Square::new(row, col)
                    .and_then(|sq| self.piece_at(sq))
                    .map_or('.', Piece::to_char);
                s.push(ch);
                if col < 7 {
                    s.push(' ');
                }
            }
            s.push('\n');
        }
        s.push_str("  a b c d e f g h");
        s
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Board(")?;
        writeln!(f, "{}", self.board_string())?;
        write!(f, ")")
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.board_string())
    }
}

impl Serialize for Board {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.rows().serialize(serializer)
    }
}

// ---------------------------------------------------------------------------
// PositionKey
// ---------------------------------------------------------------------------

/// Everything that makes two positions "the same" for repetition purposes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PositionKey {
    pub board: Board,
    pub side_to_move: Color,
    pub castling_rights: CastlingRights,
    pub en_passant: Option<Square>,
}

// ---------------------------------------------------------------------------
// Undo log
// ---------------------------------------------------------------------------

/// One ply of history. Only the castling bits this move cleared are kept;
/// everything else is recoverable from the move itself.
#[derive(Clone, Copy, Debug)]
struct UndoEntry {
    mv: Move,
    castling_lost: u8,
}

// ---------------------------------------------------------------------------
// GameState
// ---------------------------------------------------------------------------

/// Board plus all the state needed to generate and unmake moves.
#[derive(Clone, Debug)]
pub struct GameState {
    board: Board,
    side_to_move: Color,
    /// Cached king squares, `[white, black]`. Always equal to the board.
    king_squares: [Square; 2],
    castling_rights: CastlingRights,
    en_passant: Option<Square>,
    /// En-passant target of the setup position, restored when the log empties.
    initial_en_passant: Option<Square>,
    history: Vec<UndoEntry>,
    /// Key of every position reached, including the initial one.
    position_keys: Vec<PositionKey>,
    checkmate: bool,
    stalemate: bool,
}

impl GameState {
    /// Standard starting position.
    pub fn new() -> Self {
        Self::from_fen(START_FEN).expect("starting FEN is always valid")
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    #[inline]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[inline]
    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.board.piece_at(sq)
    }

    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    #[inline]
    pub fn king_square(&self, color: Color) -> Square {
        self.king_squares[color.index()]
    }

    #[inline]
    pub fn castling_rights(&self) -> CastlingRights {
        self.castling_rights
    }

    #[inline]
    pub fn en_passant(&self) -> Option<Square> {
        self.en_passant
    }

    /// Moves played so far, oldest first.
    pub fn move_log(&self) -> impl ExactSizeIterator<Item = &Move> + '_ {
        self.history.iter().map(|entry| &entry.mv)
    }

    /// Number of plies on the undo log.
    pub fn ply_count(&self) -> usize {
        self.history.len()
    }

    /// Set by the last call to [`GameState::valid_moves`].
    #[inline]
    pub fn checkmate(&self) -> bool {
        self.checkmate
    }

    /// Set by the last call to [`GameState::valid_moves`].
    #[inline]
    pub fn stalemate(&self) -> bool {
        self.stalemate
    }

    pub fn position_key(&self) -> PositionKey {
        PositionKey {
            board: self.board,
            side_to_move: self.side_to_move,
            castling_rights: self.castling_rights,
            en_passant: self.en_passant,
        }
    }

    /// How many times `key` has been reached in this game.
    pub fn occurrences(&self, key: &PositionKey) -> usize {
        self.position_keys.iter().filter(|&k| k == key).count()
    }

    /// The current position has been reached three or more times.
    pub fn is_threefold_repetition(&self) -> bool {
        self.occurrences(&self.position_key()) >= 3
    }

    /// Is `sq` attacked by the side opposing `defender`?
    pub fn is_square_attacked(&self, sq: Square, defender: Color) -> bool {
        attacks::is_square_attacked(&self.board, sq, defender)
    }

    /// Is the side to move in check?
    pub fn is_in_check(&self) -> bool {
        let us = self.side_to_move;
        self.is_square_attacked(self.king_square(us), us)
    }

    /// Legal moves for the side to move; refreshes the checkmate and
    /// stalemate flags.
    pub fn valid_moves(&mut self) -> Vec<Move> {
        movegen::legal_moves(self)
    }

    /// Candidate move between two squares built from the current board, or
    /// `None` when `from` is empty. Flags come from the board snapshot only,
    /// so match it against [`GameState::valid_moves`] before playing it.
    pub fn move_between(&self, from: Square, to: Square) -> Option<Move> {
        let piece = self.board.piece_at(from)?;
        let mv = match piece.kind {
            PieceKind::Pawn if Some(to) == self.en_passant && from.col() != to.col() => {
                Move::en_passant(from, to, piece)
            }
            PieceKind::King if from.col().abs_diff(to.col()) == 2 && from.row() == to.row() => {
                Move::castle(from, to, piece)
            }
            _ => Move::new(from, to, piece, self.board.piece_at(to)),
        };
        Some(mv)
    }

    // -----------------------------------------------------------------------
    // Make / Undo move
    // -----------------------------------------------------------------------

    /// Apply a move produced by the generator.
    pub fn make_move(&mut self, mv: Move) {
        let us = self.side_to_move;

        self.board.set(mv.from, None);
        let landing = if mv.is_promotion() {
            Piece::new(us, PieceKind::Queen)
        } else {
            mv.piece_moved
        };
        self.board.set(mv.to, Some(landing));

        if mv.piece_moved.kind == PieceKind::King {
            self.king_squares[us.index()] = mv.to;
        }

        if mv.is_castle()
            && let Some((rook_from, rook_to)) = castling_rook_squares(mv.to)
        {
            let rook = self.board.take(rook_from);
            self.board.set(rook_to, rook);
        }

        if mv.is_en_passant() {
            self.board.set(mv.en_passant_victim(), None);
        }

        self.en_passant = en_passant_target(&mv);

        // Moving from, or capturing on, a king or rook home square.
        let keep = CASTLING_MASK[mv.from.index()] & CASTLING_MASK[mv.to.index()];
        let castling_lost = self.castling_rights.0 & !keep;
        self.castling_rights.remove(castling_lost);

        self.history.push(UndoEntry { mv, castling_lost });
        self.side_to_move = !us;
        self.position_keys.push(self.position_key());
    }

    /// Take back the last move. Returns it, or `None` (and does nothing) when
    /// the log is empty.
    pub fn undo_move(&mut self) -> Option<Move> {
        let UndoEntry { mv, castling_lost } = self.history.pop()?;
        self.position_keys.pop();

        let us = !self.side_to_move;
        self.side_to_move = us;

        self.board.set(mv.from, Some(mv.piece_moved));
        if mv.is_en_passant() {
            self.board.set(mv.to, None);
            self.board.set(mv.en_passant_victim(), mv.piece_captured);
        } else {
            self.board.set(mv.to, mv.piece_captured);
        }

        if mv.piece_moved.kind == PieceKind::King {
            self.king_squares[us.index()] = mv.from;
        }

        if mv.is_castle()
            && let Some((rook_from, rook_to)) = castling_rook_squares(mv.to)
        {
            let rook = self.board.take(rook_to);
            self.board.set(rook_from, rook);
        }

        self.castling_rights.restore(castling_lost);
        self.en_passant = match self.history.last() {
            Some(prev) => en_passant_target(&prev.mv),
            None => self.initial_en_passant,
        };

        Some(mv)
    }

    // -----------------------------------------------------------------------
    // Crate-internal hooks for the move generator
    // -----------------------------------------------------------------------

    /// Would the king of `color` be attacked standing on `to`? The king is
    /// not relocated: [`attacks::is_square_attacked`] already looks through
    /// the defender's own king, so its origin square never shields `to`.
    pub(crate) fn king_destination_attacked(&self, color: Color, to: Square) -> bool {
        self.is_square_attacked(to, color)
    }

    pub(crate) fn set_terminal_flags(&mut self, no_moves: bool, in_check: bool) {
        self.checkmate = no_moves && in_check;
        self.stalemate = no_moves && !in_check;
    }

    // -----------------------------------------------------------------------
    // Consistency check
    // -----------------------------------------------------------------------

    /// Panic unless the king cache agrees with the board and the key log
    /// has one entry per ply plus the setup position.
    #[cfg(any(debug_assertions, test))]
    pub fn assert_consistent(&self) {
        for color in [Color::White, Color::Black] {
            assert_eq!(
                self.board.find_king(color),
                Some(self.king_square(color)),
                "king cache mismatch for {color}",
            );
        }
        assert_eq!(self.position_keys.len(), self.history.len() + 1);
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.board)
    }
}

// ---------------------------------------------------------------------------
// Special-move helpers (free functions)
// ---------------------------------------------------------------------------

/// Square skipped by a two-square pawn advance, if `mv` is one.
fn en_passant_target(mv: &Move) -> Option<Square> {
    if mv.is_double_push() {
        Square::new((mv.from.row() + mv.to.row()) / 2, mv.from.col())
    } else {
        None
    }
}

/// For a castling king destination, return (rook_from, rook_to).
pub(crate) fn castling_rook_squares(king_to: Square) -> Option<(Square, Square)> {
    match king_to.col() {
        6 => Some((king_to.offset(0, 1)?, king_to.offset(0, -1)?)),
        2 => Some((king_to.offset(0, -2)?, king_to.offset(0, 1)?)),
        _ => None,
    }
}

/// AND-mask per square. A move touching a square keeps only the rights in
/// its mask: king homes clear both of that side, rook homes clear one.
#[rustfmt::skip]
const CASTLING_MASK: [u8; 64] = {
    let mut mask = [0b1111u8; 64];
    // a8 (0), e8 (4), h8 (7)
    mask[0]  = 0b1111 & !CastlingRights::BLACK_QUEENSIDE;
    mask[4]  = 0b1111 & !(CastlingRights::BLACK_KINGSIDE | CastlingRights::BLACK_QUEENSIDE);
    mask[7]  = 0b1111 & !CastlingRights::BLACK_KINGSIDE;
    // a1 (56), e1 (60), h1 (63)
    mask[56] = 0b1111 & !CastlingRights::WHITE_QUEENSIDE;
    mask[60] = 0b1111 & !(CastlingRights::WHITE_KINGSIDE | CastlingRights::WHITE_QUEENSIDE);
    mask[63] = 0b1111 & !CastlingRights::WHITE_KINGSIDE;
    mask
};

// ---------------------------------------------------------------------------
// FEN setup
// ---------------------------------------------------------------------------

impl GameState {
    /// Set up a position from FEN.
    ///
    /// The first four fields (placement, side, castling, en passant) are
    /// required; the move clocks are optional and ignored. Exactly one king
    /// per side is enforced, and an en-passant square must sit in front of
    /// an enemy pawn that could just have double-pushed.
    pub fn from_fen(fen: &str) -> Result<Self, ChessError> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if !(4..=6).contains(&fields.len()) {
            return Err(ChessError::InvalidFen(format!(
                "expected 4 to 6 fields, got {}",
                fields.len()
            )));
        }

        let board = parse_placement(fields[0])?;

        let mut king_squares = [None; 2];
        for color in [Color::White, Color::Black] {
            let count = board
                .pieces()
                .filter(|(_, p)| p.is(color, PieceKind::King))
                .count();
            if count != 1 {
                return Err(ChessError::InvalidFen(format!(
                    "{color} has {count} kings (expected 1)"
                )));
            }
            king_squares[color.index()] = board.find_king(color);
        }
        let [Some(white_king), Some(black_king)] = king_squares else {
            return Err(ChessError::InvalidFen("missing king".to_string()));
        };

        let side_to_move = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => {
                return Err(ChessError::InvalidFen(format!(
                    "invalid side to move: '{other}'"
                )));
            }
        };

        let castling_rights = CastlingRights::from_fen(fields[2]).ok_or_else(|| {
            ChessError::InvalidFen(format!("invalid castling string: '{}'", fields[2]))
        })?;

        let en_passant = match fields[3] {
            "-" => None,
            s => {
                let sq = Square::from_algebraic(s).ok_or_else(|| {
                    ChessError::InvalidFen(format!("invalid en passant square: '{s}'"))
                })?;
                // Rank 6 with white to move, rank 3 with black to move.
                let row = match side_to_move {
                    Color::White => 2,
                    Color::Black => 5,
                };
                if sq.row() != row {
                    return Err(ChessError::InvalidFen(format!(
                        "en passant square {s} does not match side to move"
                    )));
                }
                let victim = sq.offset(-side_to_move.forward(), 0);
                let pawn = Piece::new(!side_to_move, PieceKind::Pawn);
                if board.piece_at(sq).is_some()
                    || victim.and_then(|v| board.piece_at(v)) != Some(pawn)
                {
                    return Err(ChessError::InvalidFen(format!(
                        "en passant square {s} has no pawn to capture"
                    )));
                }
                Some(sq)
            }
        };

        for (i, field) in fields.iter().enumerate().skip(4) {
            if field.parse::<u16>().is_err() {
                return Err(ChessError::InvalidFen(format!(
                    "invalid move counter in field {}: '{field}'",
                    i + 1
                )));
            }
        }

        let mut state = GameState {
            board,
            side_to_move,
            king_squares: [white_king, black_king],
            castling_rights,
            en_passant,
            initial_en_passant: en_passant,
            history: Vec::new(),
            position_keys: Vec::new(),
            checkmate: false,
            stalemate: false,
        };
        state.position_keys.push(state.position_key());
        Ok(state)
    }

    /// The four position fields of FEN: placement, side, castling, en passant.
    pub fn to_fen(&self) -> String {
        let mut fen = String::with_capacity(80);

        for row in 0..8u8 {
            let mut empty_count = 0u8;
            for col in 0..8u8 {
                match Square::new(row, col).and_then(|sq| self.board.piece_at(sq)) {
                    Some(piece) => {
                        if empty_count > 0 {
                            fen.push((b'0' + empty_count) as char);
                            empty_count = 0;
                        }
                        fen.push(piece.to_char());
                    }
                    None => empty_count += 1,
                }
            }
            if empty_count > 0 {
                fen.push((b'0' + empty_count) as char);
            }
            if row < 7 {
                fen.push('/');
            }
        }

        fen.push(' ');
        fen.push(match self.side_to_move {
            Color::White => 'w',
            Color::Black => 'b',
        });

        fen.push(' ');
        fen.push_str(&self.castling_rights.to_fen());

        fen.push(' ');
        match self.en_passant {
            Some(sq) => fen.push_str(&sq.to_algebraic()),
            None => fen.push('-'),
        }

        fen
    }
}

fn parse_placement(field: &str) -> Result<Board, ChessError> {
    let rows: Vec<&str> = field.split('/').collect();
    if rows.len() != 8 {
        return Err(ChessError::InvalidFen(format!(
            "expected 8 ranks, got {}",
            rows.len()
        )));
    }

    let mut board = Board::empty();
    for (row, row_str) in rows.iter().enumerate() {
        let rank = 8 - row;
        let mut col = 0usize;
        for ch in row_str.chars() {
            if let Some(digit) = ch.to_digit(10) {
                if !(1..=8).contains(&digit) {
                    return Err(ChessError::InvalidFen(format!(
                        "invalid empty count '{ch}' in rank {rank}"
                    )));
                }
                col += digit as usize;
            } else if let Some(piece) = Piece::from_char(ch) {
                let sq = Square::new(row as u8, col as u8).ok_or_else(|| {
                    ChessError::InvalidFen(format!("too many squares in rank {rank}"))
                })?;
                board.set(sq, Some(piece));
                col += 1;
            } else {
                return Err(ChessError::InvalidFen(format!(
                    "invalid character '{ch}' in piece placement"
                )));
            }
        }
        if col != 8 {
            return Err(ChessError::InvalidFen(format!(
                "rank {rank} has {col} squares instead of 8"
            )));
        }
    }
    Ok(board)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
