//! Ray walking on the mailbox board: attack detection, pins and checks.
//!
//! Everything here scans outward from a square along the eight queen rays
//! plus the knight jumps. There are no tables; the board is small enough that
//! walking it directly is the clearest approach.

use crate::engine::board::Board;
use crate::engine::types::{Color, Piece, PieceKind, Square};

/// `(row delta, col delta)` step.
pub type Direction = (i8, i8);

pub const ORTHOGONAL: [Direction; 4] = [(-1, 0), (0, -1), (1, 0), (0, 1)];
pub const DIAGONAL: [Direction; 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];
pub const ALL_DIRECTIONS: [Direction; 8] = [
    (-1, 0),
    (0, -1),
    (1, 0),
    (0, 1),
    (-1, -1),
    (-1, 1),
    (1, -1),
    (1, 1),
];

pub const KNIGHT_OFFSETS: [Direction; 8] = [
    (-2, -1),
    (-2, 1),
    (-1, -2),
    (-1, 2),
    (1, -2),
    (1, 2),
    (2, -1),
    (2, 1),
];

pub const KING_OFFSETS: [Direction; 8] = ALL_DIRECTIONS;

#[inline]
fn is_diagonal(dir: Direction) -> bool {
    dir.0 != 0 && dir.1 != 0
}

/// Can `attacker`, found `distance` steps from a target along `dir`
/// (pointing from target to attacker), strike the target?
fn attacks_along_ray(attacker: Piece, dir: Direction, distance: u8) -> bool {
    match attacker.kind {
        PieceKind::Rook => !is_diagonal(dir),
        PieceKind::Bishop => is_diagonal(dir),
        PieceKind::Queen => true,
        PieceKind::King => distance == 1,
        // A pawn hits the squares one row ahead of it, so the target lies
        // behind the pawn relative to its own direction of travel.
        PieceKind::Pawn => distance == 1 && is_diagonal(dir) && dir.0 == -attacker.color.forward(),
        PieceKind::Knight => false,
    }
}

// ---------------------------------------------------------------------------
// Square attack query
// ---------------------------------------------------------------------------

/// Is `sq` attacked by any piece of the side opposing `defender`?
///
/// The defender's own king does not block rays. When a king steps straight
/// away from a slider it is still on the slider's line, and this makes the
/// destination show up as attacked without first moving the king.
pub fn is_square_attacked(board: &Board, sq: Square, defender: Color) -> bool {
    for dir in ALL_DIRECTIONS {
        let mut cur = sq;
        let mut distance = 0u8;
        while let Some(next) = cur.offset(dir.0, dir.1) {
            cur = next;
            distance += 1;
            match board.piece_at(cur) {
                None => continue,
                Some(p) if p.is(defender, PieceKind::King) => continue,
                Some(p) if p.color == defender => break,
                Some(p) => {
                    if attacks_along_ray(p, dir, distance) {
                        return true;
                    }
                    break;
                }
            }
        }
    }

    KNIGHT_OFFSETS.iter().any(|&(dr, dc)| {
        sq.offset(dr, dc)
            .and_then(|s| board.piece_at(s))
            .is_some_and(|p| p.is(!defender, PieceKind::Knight))
    })
}

// ---------------------------------------------------------------------------
// Pins and checks
// ---------------------------------------------------------------------------

/// A friendly piece that may only move along `direction` (king → piece) or
/// its reverse.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pin {
    pub square: Square,
    pub direction: Direction,
}

/// An enemy piece giving check. `direction` points from the king towards
/// the checker; for a knight it is the jump offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Check {
    pub square: Square,
    pub direction: Direction,
    pub kind: PieceKind,
}

impl Check {
    /// Squares a non-king move may land on to resolve this check: the
    /// checker's square plus, for sliders, everything between it and the king.
    pub fn block_squares(&self, king: Square) -> Vec<Square> {
        if self.kind == PieceKind::Knight {
            return vec![self.square];
        }
        let mut squares = Vec::with_capacity(7);
        let mut cur = king;
        while let Some(next) = cur.offset(self.direction.0, self.direction.1) {
            squares.push(next);
            if next == self.square {
                break;
            }
            cur = next;
        }
        squares
    }
}

#[derive(Clone, Debug, Default)]
pub struct PinsAndChecks {
    pub pins: Vec<Pin>,
    pub checks: Vec<Check>,
}

impl PinsAndChecks {
    #[inline]
    pub fn in_check(&self) -> bool {
        !self.checks.is_empty()
    }

    #[inline]
    pub fn is_double_check(&self) -> bool {
        self.checks.len() >= 2
    }

    /// Pin direction of the piece on `sq`, if it is pinned.
    pub fn pin_direction(&self, sq: Square) -> Option<Direction> {
        self.pins
            .iter()
            .find(|pin| pin.square == sq)
            .map(|pin| pin.direction)
    }
}

/// Scan outward from `king` (belonging to `us`) for pins and checks.
///
/// Along each ray the first friendly piece is a pin candidate; an enemy
/// slider (or adjacent king/pawn) beyond it pins it, and one with nothing in
/// between gives check. A second friendly piece ends the ray.
pub fn find_pins_and_checks(board: &Board, king: Square, us: Color) -> PinsAndChecks {
    let mut result = PinsAndChecks::default();

    for dir in ALL_DIRECTIONS {
        let mut candidate: Option<Square> = None;
        let mut cur = king;
        let mut distance = 0u8;
        while let Some(next) = cur.offset(dir.0, dir.1) {
            cur = next;
            distance += 1;
            match board.piece_at(cur) {
                None => continue,
                Some(p) if p.color == us => {
                    if p.kind == PieceKind::King {
                        continue;
                    }
                    if candidate.is_some() {
                        break;
                    }
                    candidate = Some(cur);
                }
                Some(p) => {
                    if attacks_along_ray(p, dir, distance) {
                        match candidate {
                            None => result.checks.push(Check {
                                square: cur,
                                direction: dir,
                                kind: p.kind,
                            }),
                            Some(square) => result.pins.push(Pin {
                                square,
                                direction: dir,
                            }),
                        }
                    }
                    break;
                }
            }
        }
    }

    let knight = Some(Piece::new(!us, PieceKind::Knight));
    for dir in KNIGHT_OFFSETS {
        let Some(sq) = king.offset(dir.0, dir.1) else {
            continue;
        };
        if board.piece_at(sq) == knight {
            result.checks.push(Check {
                square: sq,
                direction: dir,
                kind: PieceKind::Knight,
            });
        }
    }

    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::board::GameState;

    fn sq(name: &str) -> Square {
        Square::from_algebraic(name).unwrap()
    }

    fn board(fen: &str) -> Board {
        *GameState::from_fen(fen).unwrap().board()
    }

    #[test]
    fn pawn_attacks_diagonally_forward_only() {
        let b = board("4k3/8/8/8/4P3/8/8/4K3 w - - 0 1");
        assert!(is_square_attacked(&b, sq("d5"), Color::Black));
        assert!(is_square_attacked(&b, sq("f5"), Color::Black));
        assert!(!is_square_attacked(&b, sq("e5"), Color::Black));
        assert!(!is_square_attacked(&b, sq("d3"), Color::Black));

        let b = board("4k3/8/8/4p3/8/8/8/4K3 w - - 0 1");
        assert!(is_square_attacked(&b, sq("d4"), Color::White));
        assert!(!is_square_attacked(&b, sq("d6"), Color::White));
    }

    #[test]
    fn knight_attacks() {
        let b = board("4k3/8/8/8/3n4/8/8/4K3 w - - 0 1");
        for target in ["b3", "b5", "c2", "c6", "e2", "e6", "f3", "f5"] {
            assert!(is_square_attacked(&b, sq(target), Color::White), "{target}");
        }
        assert!(!is_square_attacked(&b, sq("d5"), Color::White));
    }

    #[test]
    fn sliders_are_blocked() {
        let b = board("4k3/8/8/8/r2P4/8/8/4K3 w - - 0 1");
        assert!(is_square_attacked(&b, sq("c4"), Color::White));
        assert!(is_square_attacked(&b, sq("d4"), Color::White));
        assert!(!is_square_attacked(&b, sq("e4"), Color::White));
        assert!(is_square_attacked(&b, sq("a1"), Color::White));
    }

    #[test]
    fn defender_king_does_not_block_rays() {
        // Rook on a1 checks the king on d1; e1 behind the king is attacked.
        let b = board("4k3/8/8/8/8/8/8/r2K4 w - - 0 1");
        assert!(is_square_attacked(&b, sq("e1"), Color::White));
        // Any other friendly piece still blocks.
        let b = board("4k3/8/8/8/8/8/8/r1NK4 w - - 0 1");
        assert!(!is_square_attacked(&b, sq("e1"), Color::White));
    }

    #[test]
    fn detects_pin() {
        let b = board("4r1k1/8/8/8/8/8/4N3/4K3 w - - 0 1");
        let pc = find_pins_and_checks(&b, sq("e1"), Color::White);
        assert!(!pc.in_check());
        assert_eq!(
            pc.pins,
            vec![Pin {
                square: sq("e2"),
                direction: (-1, 0)
            }]
        );
        assert_eq!(pc.pin_direction(sq("e2")), Some((-1, 0)));
    }

    #[test]
    fn two_friendly_pieces_are_not_pinned() {
        let b = board("4r1k1/8/8/8/8/4B3/4N3/4K3 w - - 0 1");
        let pc = find_pins_and_checks(&b, sq("e1"), Color::White);
        assert!(pc.pins.is_empty());
        assert!(!pc.in_check());
    }

    #[test]
    fn wrong_slider_does_not_pin() {
        let b = board("4b1k1/8/8/8/8/8/4N3/4K3 w - - 0 1");
        let pc = find_pins_and_checks(&b, sq("e1"), Color::White);
        assert!(pc.pins.is_empty());
    }

    #[test]
    fn detects_slider_and_knight_checks() {
        let b = board("4r1k1/8/8/8/8/3n4/8/4K3 w - - 0 1");
        let pc = find_pins_and_checks(&b, sq("e1"), Color::White);
        assert!(pc.is_double_check());
        let found: Vec<_> = pc.checks.iter().map(|c| (c.kind, c.square)).collect();
        assert!(found.contains(&(PieceKind::Rook, sq("e8"))));
        assert!(found.contains(&(PieceKind::Knight, sq("d3"))));
    }

    #[test]
    fn pawn_checks_only_from_the_front() {
        let b = board("4k3/8/8/8/8/8/3p4/4K3 w - - 0 1");
        let pc = find_pins_and_checks(&b, sq("e1"), Color::White);
        assert_eq!(pc.checks.len(), 1);
        assert_eq!(pc.checks[0].kind, PieceKind::Pawn);

        // A black pawn behind the white king gives no check.
        let b = board("4k3/8/8/8/8/8/8/4K3 w - - 0 1");
        let pc = find_pins_and_checks(&b, sq("e1"), Color::White);
        assert!(!pc.in_check());

        let b = board("4k3/3P4/8/8/8/8/8/4K3 b - - 0 1");
        let pc = find_pins_and_checks(&b, sq("e8"), Color::Black);
        assert_eq!(pc.checks.len(), 1);

        let b = board("8/8/8/8/8/8/3P4/4k1K1 b - - 0 1");
        let pc = find_pins_and_checks(&b, sq("e1"), Color::Black);
        assert!(!pc.in_check());
    }

    #[test]
    fn block_squares_run_from_king_to_checker() {
        let check = Check {
            square: sq("e8"),
            direction: (-1, 0),
            kind: PieceKind::Rook,
        };
        let squares = check.block_squares(sq("e1"));
        assert_eq!(squares.len(), 7);
        assert_eq!(squares.first(), Some(&sq("e2")));
        assert_eq!(squares.last(), Some(&sq("e8")));

        let knight = Check {
            square: sq("d3"),
            direction: (-2, -1),
            kind: PieceKind::Knight,
        };
        assert_eq!(knight.block_squares(sq("e1")), vec![sq("d3")]);
    }
}
