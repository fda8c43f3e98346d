use std::fmt;

use serde::{Serialize, Serializer};

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// The two sides in a chess game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    /// Index for array lookups: White=0, Black=1.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Row delta of a pawn advance. White starts on row 6 and walks towards row 0.
    #[inline]
    pub const fn forward(self) -> i8 {
        match self {
            Color::White => -1,
            Color::Black => 1,
        }
    }

    /// Row holding this side's king and rooks at the start of the game.
    #[inline]
    pub const fn back_row(self) -> u8 {
        match self {
            Color::White => 7,
            Color::Black => 0,
        }
    }

    /// Row from which this side's pawns may advance two squares.
    #[inline]
    pub const fn pawn_row(self) -> u8 {
        match self {
            Color::White => 6,
            Color::Black => 1,
        }
    }

    /// Farthest row, where this side's pawns promote.
    #[inline]
    pub const fn promotion_row(self) -> u8 {
        match self {
            Color::White => 0,
            Color::Black => 7,
        }
    }
}

impl std::ops::Not for Color {
    type Output = Self;
    fn not(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => write!(f, "white"),
            Color::Black => write!(f, "black"),
        }
    }
}

// ---------------------------------------------------------------------------
// PieceKind / Piece
// ---------------------------------------------------------------------------

/// The six piece kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceKind {
    pub const ALL: [PieceKind; 6] = [
        PieceKind::Pawn,
        PieceKind::Knight,
        PieceKind::Bishop,
        PieceKind::Rook,
        PieceKind::Queen,
        PieceKind::King,
    ];

    /// Material value in pawns. The king is never counted.
    pub const fn value(self) -> i32 {
        match self {
            PieceKind::Pawn => 1,
            PieceKind::Knight => 3,
            PieceKind::Bishop => 3,
            PieceKind::Rook => 5,
            PieceKind::Queen => 10,
            PieceKind::King => 0,
        }
    }

    /// Lowercase FEN letter.
    pub const fn letter(self) -> char {
        match self {
            PieceKind::Pawn => 'p',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Rook => 'r',
            PieceKind::Queen => 'q',
            PieceKind::King => 'k',
        }
    }
}

impl fmt::Display for PieceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PieceKind::Pawn => write!(f, "pawn"),
            PieceKind::Knight => write!(f, "knight"),
            PieceKind::Bishop => write!(f, "bishop"),
            PieceKind::Rook => write!(f, "rook"),
            PieceKind::Queen => write!(f, "queen"),
            PieceKind::King => write!(f, "king"),
        }
    }
}

/// A coloured piece occupying a square.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Piece {
    pub color: Color,
    pub kind: PieceKind,
}

impl Piece {
    #[inline]
    pub const fn new(color: Color, kind: PieceKind) -> Self {
        Piece { color, kind }
    }

    #[inline]
    pub fn is(self, color: Color, kind: PieceKind) -> bool {
        self.color == color && self.kind == kind
    }

    /// Uppercase for white, lowercase for black.
    pub fn to_char(self) -> char {
        match self.color {
            Color::White => self.kind.letter().to_ascii_uppercase(),
            Color::Black => self.kind.letter(),
        }
    }

    /// Parse a FEN piece letter.
    pub fn from_char(c: char) -> Option<Self> {
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        let kind = match c.to_ascii_lowercase() {
            'p' => PieceKind::Pawn,
            'n' => PieceKind::Knight,
            'b' => PieceKind::Bishop,
            'r' => PieceKind::Rook,
            'q' => PieceKind::Queen,
            'k' => PieceKind::King,
            _ => return None,
        };
        Some(Piece { color, kind })
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.color, self.kind)
    }
}

// ---------------------------------------------------------------------------
// Square
// ---------------------------------------------------------------------------

/// A square on the board, stored as `row * 8 + col`.
///
/// Row 0 is black's back rank (rank 8), row 7 is white's (rank 1); col 0 is
/// the a-file. The field is private: every `Square` in existence is on the
/// board, and stepping off the edge yields `None` from [`Square::offset`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Square(u8);

impl Square {
    pub const NUM: usize = 64;

    /// Checked constructor from (row, col).
    #[inline]
    pub fn new(row: u8, col: u8) -> Option<Self> {
        (row < 8 && col < 8).then_some(Square(row * 8 + col))
    }

    #[inline]
    pub fn row(self) -> u8 {
        self.0 >> 3
    }

    #[inline]
    pub fn col(self) -> u8 {
        self.0 & 7
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Step by `(dr, dc)`. Returns `None` when the target leaves the board.
    #[inline]
    pub fn offset(self, dr: i8, dc: i8) -> Option<Self> {
        let row = self.row() as i8 + dr;
        let col = self.col() as i8 + dc;
        if (0..8).contains(&row) && (0..8).contains(&col) {
            Some(Square((row * 8 + col) as u8))
        } else {
            None
        }
    }

    /// All 64 squares in row-major order (a8, b8, … h1).
    pub fn all() -> impl Iterator<Item = Square> {
        (0..Self::NUM as u8).map(Square)
    }

    /// Parse algebraic notation like "e4".
    pub fn from_algebraic(s: &str) -> Option<Self> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return None;
        }
        let col = bytes[0].wrapping_sub(b'a');
        let rank = bytes[1].wrapping_sub(b'1');
        if col < 8 && rank < 8 {
            Square::new(7 - rank, col)
        } else {
            None
        }
    }

    /// Column letter followed by rank number, e.g. "e4".
    pub fn to_algebraic(self) -> String {
        let file = (b'a' + self.col()) as char;
        let rank = (b'8' - self.row()) as char;
        format!("{file}{rank}")
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_algebraic())
    }
}

impl Serialize for Square {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_algebraic())
    }
}

// ---------------------------------------------------------------------------
// MoveFlags
// ---------------------------------------------------------------------------

/// Special-move flags packed in a single byte.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct MoveFlags(pub u8);

impl MoveFlags {
    pub const NONE: MoveFlags = MoveFlags(0);
    pub const PROMOTION: MoveFlags = MoveFlags(1);
    pub const EN_PASSANT: MoveFlags = MoveFlags(2);
    pub const CASTLE: MoveFlags = MoveFlags(4);

    #[inline]
    pub fn is_promotion(self) -> bool {
        self.0 & Self::PROMOTION.0 != 0
    }

    #[inline]
    pub fn is_en_passant(self) -> bool {
        self.0 & Self::EN_PASSANT.0 != 0
    }

    #[inline]
    pub fn is_castle(self) -> bool {
        self.0 & Self::CASTLE.0 != 0
    }
}

// ---------------------------------------------------------------------------
// Move
// ---------------------------------------------------------------------------

/// A single ply. `piece_captured` is taken from the board before the move is
/// made; for en passant it is the pawn removed from beside the mover.
///
/// Two moves are equal when their squares and flags agree.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub piece_moved: Piece,
    pub piece_captured: Option<Piece>,
    pub flags: MoveFlags,
}

impl Move {
    /// An ordinary move or capture. The promotion flag is derived here.
    pub fn new(
        from: Square,
        to: Square,
        piece_moved: Piece,
        piece_captured: Option<Piece>,
    ) -> Self {
        let flags = if piece_moved.kind == PieceKind::Pawn
            && to.row() == piece_moved.color.promotion_row()
        {
            MoveFlags::PROMOTION
        } else {
            MoveFlags::NONE
        };
        Move {
            from,
            to,
            piece_moved,
            piece_captured,
            flags,
        }
    }

    /// A pawn capturing en passant onto the skipped square `to`.
    pub fn en_passant(from: Square, to: Square, piece_moved: Piece) -> Self {
        Move {
            from,
            to,
            piece_moved,
            piece_captured: Some(Piece::new(!piece_moved.color, PieceKind::Pawn)),
            flags: MoveFlags::EN_PASSANT,
        }
    }

    /// A king stepping two squares towards a rook; the rook hop is implied.
    pub fn castle(from: Square, to: Square, piece_moved: Piece) -> Self {
        Move {
            from,
            to,
            piece_moved,
            piece_captured: None,
            flags: MoveFlags::CASTLE,
        }
    }

    #[inline]
    pub fn is_promotion(&self) -> bool {
        self.flags.is_promotion()
    }

    #[inline]
    pub fn is_en_passant(&self) -> bool {
        self.flags.is_en_passant()
    }

    #[inline]
    pub fn is_castle(&self) -> bool {
        self.flags.is_castle()
    }

    #[inline]
    pub fn is_capture(&self) -> bool {
        self.piece_captured.is_some()
    }

    /// A pawn advancing two squares from its home row.
    #[inline]
    pub fn is_double_push(&self) -> bool {
        self.piece_moved.kind == PieceKind::Pawn && self.from.row().abs_diff(self.to.row()) == 2
    }

    /// Square the captured pawn stood on for an en-passant capture.
    #[inline]
    pub fn en_passant_victim(&self) -> Square {
        Square(self.from.row() * 8 + self.to.col())
    }

    /// Start and end coordinates, e.g. "e2e4".
    pub fn chess_notation(&self) -> String {
        format!("{}{}", self.from, self.to)
    }
}

impl PartialEq for Move {
    fn eq(&self, other: &Self) -> bool {
        self.from == other.from && self.to == other.to && self.flags == other.flags
    }
}

impl Eq for Move {}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)
    }
}

// ---------------------------------------------------------------------------
// CastlingRights
// ---------------------------------------------------------------------------

/// Castling availability bitfield: bits 0-3 = WK, WQ, BK, BQ.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CastlingRights(pub u8);

impl CastlingRights {
    pub const NONE: CastlingRights = CastlingRights(0);
    pub const WHITE_KINGSIDE: u8 = 1;
    pub const WHITE_QUEENSIDE: u8 = 2;
    pub const BLACK_KINGSIDE: u8 = 4;
    pub const BLACK_QUEENSIDE: u8 = 8;
    pub const ALL: CastlingRights = CastlingRights(0b1111);

    #[inline]
    pub fn has(self, flag: u8) -> bool {
        self.0 & flag != 0
    }

    #[inline]
    pub fn remove(&mut self, flag: u8) {
        self.0 &= !flag;
    }

    #[inline]
    pub fn restore(&mut self, flags: u8) {
        self.0 |= flags;
    }

    #[inline]
    pub const fn kingside_flag(color: Color) -> u8 {
        match color {
            Color::White => Self::WHITE_KINGSIDE,
            Color::Black => Self::BLACK_KINGSIDE,
        }
    }

    #[inline]
    pub const fn queenside_flag(color: Color) -> u8 {
        match color {
            Color::White => Self::WHITE_QUEENSIDE,
            Color::Black => Self::BLACK_QUEENSIDE,
        }
    }

    #[inline]
    pub fn can_castle_kingside(self, color: Color) -> bool {
        self.has(Self::kingside_flag(color))
    }

    #[inline]
    pub fn can_castle_queenside(self, color: Color) -> bool {
        self.has(Self::queenside_flag(color))
    }

    /// Parse FEN castling string (e.g. "KQkq", "-", "Kq").
    pub fn from_fen(s: &str) -> Option<Self> {
        if s == "-" {
            return Some(CastlingRights::NONE);
        }
        let mut rights = 0u8;
        for c in s.chars() {
            match c {
                'K' => rights |= Self::WHITE_KINGSIDE,
                'Q' => rights |= Self::WHITE_QUEENSIDE,
                'k' => rights |= Self::BLACK_KINGSIDE,
                'q' => rights |= Self::BLACK_QUEENSIDE,
                _ => return None,
            }
        }
        Some(CastlingRights(rights))
    }

    /// Convert to FEN castling string.
    pub fn to_fen(self) -> String {
        if self.0 == 0 {
            return "-".to_string();
        }
        let mut s = String::with_capacity(4);
        if self.has(Self::WHITE_KINGSIDE) {
            s.push('K');
        }
        if self.has(Self::WHITE_QUEENSIDE) {
            s.push('Q');
        }
        if self.has(Self::BLACK_KINGSIDE) {
            s.push('k');
        }
        if self.has(Self::BLACK_QUEENSIDE) {
            s.push('q');
        }
        s
    }
}

impl fmt::Display for CastlingRights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_fen())
    }
}

// ---------------------------------------------------------------------------
// GameStatus
// ---------------------------------------------------------------------------

/// Current status of a game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Active,
    Check,
    Checkmate,
    Stalemate,
    Draw(DrawReason),
}

impl GameStatus {
    pub fn as_str(&self) -> &str {
        match self {
            GameStatus::Active => "active",
            GameStatus::Check => "check",
            GameStatus::Checkmate => "checkmate",
            GameStatus::Stalemate => "stalemate",
            GameStatus::Draw(reason) => reason.as_str(),
        }
    }

    pub fn is_game_over(&self) -> bool {
        matches!(
            self,
            GameStatus::Checkmate | GameStatus::Stalemate | GameStatus::Draw(_)
        )
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reason for a draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawReason {
    ThreefoldRepetition,
}

impl DrawReason {
    pub fn as_str(&self) -> &str {
        match self {
            DrawReason::ThreefoldRepetition => "threefold_repetition",
        }
    }
}

// ---------------------------------------------------------------------------
// ChessError
// ---------------------------------------------------------------------------

/// Domain errors for the chess engine.
#[derive(Debug, thiserror::Error)]
pub enum ChessError {
    #[error("invalid move: {from} -> {to}: {reason}")]
    InvalidMove {
        from: String,
        to: String,
        reason: String,
    },

    #[error("invalid FEN string: {0}")]
    InvalidFen(String),

    #[error("invalid square notation: {0}")]
    InvalidSquare(String),

    #[error("game is already over: {0}")]
    GameOver(String),

    #[error("not your turn: {0} is played by the computer")]
    NotYourTurn(String),

    #[error("no moves to undo")]
    NothingToUndo,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(name: &str) -> Square {
        Square::from_algebraic(name).unwrap()
    }

    #[test]
    fn color_toggle() {
        assert_eq!(!Color::White, Color::Black);
        assert_eq!(!Color::Black, Color::White);
    }

    #[test]
    fn color_rows() {
        assert_eq!(Color::White.back_row(), 7);
        assert_eq!(Color::Black.back_row(), 0);
        assert_eq!(Color::White.pawn_row(), 6);
        assert_eq!(Color::Black.promotion_row(), 7);
        assert_eq!(Color::White.forward(), -1);
    }

    #[test]
    fn piece_values() {
        assert_eq!(PieceKind::Pawn.value(), 1);
        assert_eq!(PieceKind::Knight.value(), 3);
        assert_eq!(PieceKind::Bishop.value(), 3);
        assert_eq!(PieceKind::Rook.value(), 5);
        assert_eq!(PieceKind::Queen.value(), 10);
        assert_eq!(PieceKind::King.value(), 0);
    }

    #[test]
    fn piece_char_round_trip() {
        for kind in PieceKind::ALL {
            for color in [Color::White, Color::Black] {
                let piece = Piece::new(color, kind);
                assert_eq!(Piece::from_char(piece.to_char()), Some(piece));
            }
        }
        assert_eq!(Piece::from_char('x'), None);
        assert_eq!(Piece::from_char('1'), None);
    }

    #[test]
    fn square_rows_follow_ranks() {
        assert_eq!(sq("a8"), Square::new(0, 0).unwrap());
        assert_eq!(sq("h1"), Square::new(7, 7).unwrap());
        let e4 = sq("e4");
        assert_eq!(e4.row(), 4);
        assert_eq!(e4.col(), 4);
        assert_eq!(e4.to_algebraic(), "e4");
    }

    #[test]
    fn square_constructors_reject_off_board() {
        assert_eq!(Square::new(8, 0), None);
        assert_eq!(Square::new(0, 8), None);
        assert_eq!(Square::from_algebraic("a9"), None);
        assert_eq!(Square::from_algebraic("i1"), None);
        assert_eq!(Square::from_algebraic("abc"), None);
    }

    #[test]
    fn square_offset_stays_on_board() {
        assert_eq!(sq("a1").offset(0, -1), None);
        assert_eq!(sq("a1").offset(1, 0), None);
        assert_eq!(sq("a1").offset(-1, 1), Some(sq("b2")));
        assert_eq!(sq("h8").offset(-1, 0), None);
        assert_eq!(sq("e4").offset(-2, 1), Some(sq("f6")));
    }

    #[test]
    fn square_algebraic_round_trip() {
        for square in Square::all() {
            assert_eq!(Square::from_algebraic(&square.to_algebraic()), Some(square));
        }
        assert_eq!(Square::all().count(), 64);
    }

    #[test]
    fn move_derives_promotion_flag() {
        let white_pawn = Piece::new(Color::White, PieceKind::Pawn);
        let promo = Move::new(sq("b7"), sq("b8"), white_pawn, None);
        assert!(promo.is_promotion());

        let quiet = Move::new(sq("b6"), sq("b7"), white_pawn, None);
        assert!(!quiet.is_promotion());

        let black_pawn = Piece::new(Color::Black, PieceKind::Pawn);
        assert!(Move::new(sq("c2"), sq("c1"), black_pawn, None).is_promotion());
    }

    #[test]
    fn en_passant_move_records_victim() {
        let white_pawn = Piece::new(Color::White, PieceKind::Pawn);
        let mv = Move::en_passant(sq("e5"), sq("d6"), white_pawn);
        assert!(mv.is_en_passant());
        assert!(mv.is_capture());
        assert_eq!(mv.en_passant_victim(), sq("d5"));
        assert_eq!(
            mv.piece_captured,
            Some(Piece::new(Color::Black, PieceKind::Pawn))
        );
    }

    #[test]
    fn move_identity_includes_flags() {
        let king = Piece::new(Color::White, PieceKind::King);
        let castle = Move::castle(sq("e1"), sq("g1"), king);
        let plain = Move::new(sq("e1"), sq("g1"), king, None);
        assert_ne!(castle, plain);
        assert_eq!(castle, Move::castle(sq("e1"), sq("g1"), king));
    }

    #[test]
    fn move_notation() {
        let pawn = Piece::new(Color::White, PieceKind::Pawn);
        let mv = Move::new(sq("e2"), sq("e4"), pawn, None);
        assert_eq!(mv.chess_notation(), "e2e4");
        assert_eq!(mv.to_string(), "e2e4");
        assert!(mv.is_double_push());
    }

    #[test]
    fn castling_rights_fen_round_trip() {
        for s in ["-", "K", "Kq", "KQkq", "kq", "Q"] {
            assert_eq!(CastlingRights::from_fen(s).unwrap().to_fen(), s);
        }
        assert_eq!(CastlingRights::from_fen("X"), None);
    }

    #[test]
    fn castling_rights_remove_and_restore() {
        let mut cr = CastlingRights::ALL;
        cr.remove(CastlingRights::WHITE_KINGSIDE);
        assert!(!cr.can_castle_kingside(Color::White));
        assert!(cr.can_castle_queenside(Color::White));
        cr.restore(CastlingRights::WHITE_KINGSIDE);
        assert_eq!(cr, CastlingRights::ALL);
    }

    #[test]
    fn game_status_strings() {
        assert_eq!(GameStatus::Active.as_str(), "active");
        assert_eq!(GameStatus::Checkmate.as_str(), "checkmate");
        assert_eq!(
            GameStatus::Draw(DrawReason::ThreefoldRepetition).as_str(),
            "threefold_repetition"
        );
        assert!(GameStatus::Stalemate.is_game_over());
        assert!(!GameStatus::Check.is_game_over());
    }
}
