//! Stateful game controller wrapping GameState.
//!
//! `Game` owns the seats (human or computer per colour), the search engine
//! for computer turns, and the cached legal-move list and status of the
//! current position. It is the type a front end talks to: it feeds in
//! coordinate pairs and reads back the board, legal moves and status.

use serde::Serialize;

use crate::ai::engine::{AiEngine, MinimaxAi, RandomAi};
use crate::config::AppConfig;
use crate::engine::board::{Board, GameState};
use crate::engine::types::{ChessError, Color, DrawReason, GameStatus, Move, Square};

// =========================================================================
// PlayerKind
// =========================================================================

/// Who makes the moves for one colour.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerKind {
    #[default]
    Human,
    Computer,
}

impl PlayerKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "human" => Some(PlayerKind::Human),
            "computer" | "ai" => Some(PlayerKind::Computer),
            _ => None,
        }
    }
}

// =========================================================================
// Snapshot
// =========================================================================

/// Read-only view of a game for a front end.
#[derive(Debug, Serialize)]
pub struct GameSnapshot<'a> {
    pub board: &'a Board,
    pub side_to_move: Color,
    pub status: GameStatus,
    pub legal_moves: &'a [Move],
    pub history: Vec<String>,
}

// =========================================================================
// Game
// =========================================================================

/// A chess game between two seats.
#[derive(Clone, Debug)]
pub struct Game {
    state: GameState,
    /// Setup position, restored by `reset`.
    initial: GameState,
    players: [PlayerKind; 2],
    ai: MinimaxAi,
    /// Legal moves of the current position.
    legal: Vec<Move>,
    status: GameStatus,
}

impl Game {
    // -----------------------------------------------------------------
    // Constructors
    // -----------------------------------------------------------------

    /// Standard starting position, human White against a computer Black.
    pub fn new() -> Self {
        Self::with_state(GameState::new())
    }

    /// Seats and search settings taken from configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new()
            .with_players(config.white, config.black)
            .with_ai(MinimaxAi::new(config.search_depth, config.tie_break))
    }

    /// Start from a FEN position.
    pub fn from_fen(fen: &str) -> Result<Self, ChessError> {
        Ok(Self::with_state(GameState::from_fen(fen)?))
    }

    fn with_state(state: GameState) -> Self {
        let mut game = Self {
            initial: state.clone(),
            state,
            players: [PlayerKind::Human, PlayerKind::Computer],
            ai: MinimaxAi::default(),
            legal: Vec::new(),
            status: GameStatus::Active,
        };
        game.refresh();
        game
    }

    pub fn with_players(mut self, white: PlayerKind, black: PlayerKind) -> Self {
        self.players = [white, black];
        self
    }

    pub fn with_ai(mut self, ai: MinimaxAi) -> Self {
        self.ai = ai;
        self
    }

    // -----------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn board(&self) -> &Board {
        self.state.board()
    }

    pub fn side_to_move(&self) -> Color {
        self.state.side_to_move()
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn is_game_over(&self) -> bool {
        self.status.is_game_over()
    }

    /// All legal moves in the current position.
    pub fn legal_moves(&self) -> &[Move] {
        &self.legal
    }

    /// Legal moves from a specific square.
    pub fn legal_moves_from(&self, sq: Square) -> Vec<Move> {
        self.legal
            .iter()
            .filter(|m| m.from == sq)
            .copied()
            .collect()
    }

    pub fn player(&self, color: Color) -> PlayerKind {
        self.players[color.index()]
    }

    pub fn is_human_turn(&self) -> bool {
        self.player(self.side_to_move()) == PlayerKind::Human
    }

    pub fn ai(&self) -> &MinimaxAi {
        &self.ai
    }

    /// Moves played so far, oldest first.
    pub fn move_history(&self) -> Vec<Move> {
        self.state.move_log().copied().collect()
    }

    pub fn snapshot(&self) -> GameSnapshot<'_> {
        GameSnapshot {
            board: self.state.board(),
            side_to_move: self.side_to_move(),
            status: self.status,
            legal_moves: &self.legal,
            history: self.state.move_log().map(Move::chess_notation).collect(),
        }
    }

    // -----------------------------------------------------------------
    // Playing moves
    // -----------------------------------------------------------------

    /// Play a human move given as a pair of squares. The pair is accepted
    /// only if it matches a move in the current legal list.
    pub fn submit_move(&mut self, from: Square, to: Square) -> Result<Move, ChessError> {
        self.ensure_not_over()?;
        if !self.is_human_turn() {
            return Err(ChessError::NotYourTurn(self.side_to_move().to_string()));
        }

        let candidate = self.state.move_between(from, to);
        let Some(mv) = candidate.filter(|c| self.legal.contains(c)) else {
            tracing::warn!(%from, %to, "rejected move");
            return Err(ChessError::InvalidMove {
                from: from.to_algebraic(),
                to: to.to_algebraic(),
                reason: "not a legal move".into(),
            });
        };

        self.apply(mv);
        Ok(mv)
    }

    /// Like [`Game::submit_move`] with algebraic square names.
    pub fn submit_coordinates(&mut self, from: &str, to: &str) -> Result<Move, ChessError> {
        let parse = |s: &str| {
            Square::from_algebraic(s).ok_or_else(|| ChessError::InvalidSquare(s.to_string()))
        };
        self.submit_move(parse(from)?, parse(to)?)
    }

    /// Let the search engine move for the side to move. Human seats are
    /// refused, mirroring [`Game::submit_move`].
    pub fn play_computer_move(&mut self) -> Result<Move, ChessError> {
        self.ensure_not_over()?;
        if self.is_human_turn() {
            return Err(ChessError::NotYourTurn(self.side_to_move().to_string()));
        }

        let mut scratch = self.state.clone();
        let mut rng = rand::thread_rng();
        let (best, stats) = self.ai.search(&mut scratch, &mut rng);

        let mv = match best {
            Some(mv) => mv,
            None => {
                tracing::warn!("search returned no move; falling back to a random one");
                RandomAi.best_move(&self.state)?
            }
        };

        tracing::info!(
            side = %self.side_to_move(),
            mv = %mv,
            score = stats.score,
            nodes = stats.nodes,
            time_ms = stats.time_ms,
            "computer move"
        );
        self.apply(mv);
        Ok(mv)
    }

    /// Take back the last ply.
    pub fn undo(&mut self) -> Result<Move, ChessError> {
        let mv = self.state.undo_move().ok_or(ChessError::NothingToUndo)?;
        self.refresh();
        tracing::debug!(%mv, "undo");
        Ok(mv)
    }

    /// Return to the setup position, keeping seats and engine.
    pub fn reset(&mut self) {
        self.state = self.initial.clone();
        self.refresh();
        tracing::info!("game reset");
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    fn ensure_not_over(&self) -> Result<(), ChessError> {
        if self.is_game_over() {
            return Err(ChessError::GameOver(self.status.to_string()));
        }
        Ok(())
    }

    fn apply(&mut self, mv: Move) {
        self.state.make_move(mv);
        self.refresh();
        if self.is_game_over() {
            tracing::info!(
                status = %self.status,
                plies = self.state.ply_count(),
                "game over"
            );
        }
    }

    /// Regenerate the legal list and recompute status for the current position.
    fn refresh(&mut self) {
        self.legal = self.state.valid_moves();
        self.status = if self.state.checkmate() {
            GameStatus::Checkmate
        } else if self.state.stalemate() {
            GameStatus::Stalemate
        } else if self.state.is_threefold_repetition() {
            GameStatus::Draw(DrawReason::ThreefoldRepetition)
        } else if self.state.is_in_check() {
            GameStatus::Check
        } else {
            GameStatus::Active
        };
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::engine::TieBreak;

    fn sq(name: &str) -> Square {
        Square::from_algebraic(name).unwrap()
    }

    fn human_game() -> Game {
        Game::new().with_players(PlayerKind::Human, PlayerKind::Human)
    }

    fn play(g: &mut Game, from: &str, to: &str) -> Move {
        g.submit_move(sq(from), sq(to))
            .unwrap_or_else(|e| panic!("{from}{to}: {e}"))
    }

    // -----------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------

    #[test]
    fn new_game_is_active() {
        let g = Game::new();
        assert_eq!(g.status(), GameStatus::Active);
        assert!(!g.is_game_over());
        assert_eq!(g.side_to_move(), Color::White);
        assert_eq!(g.legal_moves().len(), 20);
        assert!(g.is_human_turn());
        assert_eq!(g.player(Color::Black), PlayerKind::Computer);
    }

    #[test]
    fn game_from_fen() {
        let fen = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1";
        let g = Game::from_fen(fen).unwrap();
        assert_eq!(g.side_to_move(), Color::Black);
        assert!(!g.is_human_turn());
    }

    #[test]
    fn game_from_invalid_fen() {
        assert!(matches!(
            Game::from_fen("invalid"),
            Err(ChessError::InvalidFen(_))
        ));
    }

    #[test]
    fn from_config_applies_seats_and_depth() {
        let config = AppConfig {
            search_depth: 3,
            white: PlayerKind::Computer,
            black: PlayerKind::Human,
            tie_break: TieBreak::FirstFound,
            max_plies: 10,
        };
        let g = Game::from_config(&config);
        assert!(!g.is_human_turn());
        assert_eq!(g.ai().depth(), 3);
        assert_eq!(g.ai().tie_break(), TieBreak::FirstFound);
    }

    // -----------------------------------------------------------------
    // Submitting moves
    // -----------------------------------------------------------------

    #[test]
    fn submit_e2e4() {
        let mut g = human_game();
        let mv = play(&mut g, "e2", "e4");
        assert_eq!(mv.chess_notation(), "e2e4");
        assert_eq!(g.side_to_move(), Color::Black);
        assert_eq!(g.move_history(), vec![mv]);
    }

    #[test]
    fn submit_illegal_move_errors() {
        let mut g = human_game();
        let err = g.submit_move(sq("e2"), sq("e5")).unwrap_err();
        assert!(matches!(err, ChessError::InvalidMove { .. }));
        // Empty origin square.
        assert!(g.submit_move(sq("e4"), sq("e5")).is_err());
        assert_eq!(g.move_history().len(), 0);
    }

    #[test]
    fn submit_on_computer_turn_errors() {
        let mut g = Game::new();
        play(&mut g, "e2", "e4");
        assert!(matches!(
            g.submit_move(sq("e7"), sq("e5")),
            Err(ChessError::NotYourTurn(_))
        ));
    }

    #[test]
    fn submit_coordinates_parses_squares() {
        let mut g = human_game();
        g.submit_coordinates("g1", "f3").unwrap();
        assert!(matches!(
            g.submit_coordinates("z9", "e5"),
            Err(ChessError::InvalidSquare(_))
        ));
    }

    #[test]
    fn submitted_castle_carries_flag() {
        let mut g = Game::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1")
            .unwrap()
            .with_players(PlayerKind::Human, PlayerKind::Human);
        let mv = play(&mut g, "e1", "g1");
        assert!(mv.is_castle());
        let rook = g.board().piece_at(sq("f1")).map(|p| p.to_char());
        assert_eq!(rook, Some('R'));
    }

    #[test]
    fn move_on_finished_game_errors() {
        let mut g = human_game();
        play(&mut g, "f2", "f3");
        play(&mut g, "e7", "e5");
        play(&mut g, "g2", "g4");
        play(&mut g, "d8", "h4");
        assert_eq!(g.status(), GameStatus::Checkmate);
        assert!(g.legal_moves().is_empty());
        assert!(matches!(
            g.submit_move(sq("e2"), sq("e4")),
            Err(ChessError::GameOver(_))
        ));
        assert!(g.play_computer_move().is_err());
    }

    // -----------------------------------------------------------------
    // Computer moves
    // -----------------------------------------------------------------

    #[test]
    fn computer_plays_a_legal_reply() {
        let mut g = Game::new();
        play(&mut g, "e2", "e4");
        let before = g.legal_moves().to_vec();
        let mv = g.play_computer_move().unwrap();
        assert!(before.contains(&mv));
        assert_eq!(g.side_to_move(), Color::White);
        assert_eq!(g.move_history().len(), 2);
    }

    #[test]
    fn computer_refuses_human_seat() {
        let mut g = Game::new();
        assert!(matches!(
            g.play_computer_move(),
            Err(ChessError::NotYourTurn(_))
        ));
        assert!(g.move_history().is_empty());
        assert_eq!(g.legal_moves().len(), 20);
    }

    #[test]
    fn computer_takes_mate_in_one() {
        let fen = "rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b KQkq g3 0 2";
        let mut g = Game::from_fen(fen).unwrap();
        g.play_computer_move().unwrap();
        assert_eq!(g.status(), GameStatus::Checkmate);
    }

    // -----------------------------------------------------------------
    // Undo and reset
    // -----------------------------------------------------------------

    #[test]
    fn undo_single_move() {
        let mut g = human_game();
        let fen = g.state().to_fen();
        play(&mut g, "e2", "e4");
        let undone = g.undo().unwrap();
        assert_eq!(undone.chess_notation(), "e2e4");
        assert_eq!(g.state().to_fen(), fen);
        assert_eq!(g.legal_moves().len(), 20);
    }

    #[test]
    fn undo_nothing_errors() {
        let mut g = Game::new();
        assert!(matches!(g.undo(), Err(ChessError::NothingToUndo)));
    }

    #[test]
    fn undo_reopens_finished_game() {
        let mut g = human_game();
        for (from, to) in [("f2", "f3"), ("e7", "e5"), ("g2", "g4"), ("d8", "h4")] {
            play(&mut g, from, to);
        }
        assert!(g.is_game_over());
        g.undo().unwrap();
        assert_eq!(g.status(), GameStatus::Active);
        assert!(!g.legal_moves().is_empty());
    }

    #[test]
    fn reset_restores_setup_position() {
        let fen = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq -";
        let mut g = Game::from_fen(fen)
            .unwrap()
            .with_players(PlayerKind::Human, PlayerKind::Human);
        play(&mut g, "e1", "g1");
        play(&mut g, "e8", "c8");
        g.reset();
        assert_eq!(g.state().to_fen(), fen);
        assert!(g.move_history().is_empty());
        assert_eq!(g.player(Color::Black), PlayerKind::Human);
    }

    // -----------------------------------------------------------------
    // Status
    // -----------------------------------------------------------------

    #[test]
    fn check_status() {
        let mut g = human_game();
        play(&mut g, "e2", "e4");
        play(&mut g, "f7", "f6");
        play(&mut g, "d1", "h5");
        assert_eq!(g.status(), GameStatus::Check);
        assert!(!g.is_game_over());
    }

    #[test]
    fn stalemate_status() {
        let g = Game::from_fen("k7/2K5/1Q6/8/8/8/8/8 b - - 0 1").unwrap();
        assert_eq!(g.status(), GameStatus::Stalemate);
        assert!(g.is_game_over());
    }

    #[test]
    fn threefold_repetition_ends_game() {
        let mut g = human_game();
        let shuffle = [("g1", "f3"), ("g8", "f6"), ("f3", "g1"), ("f6", "g8")];
        for (from, to) in shuffle {
            play(&mut g, from, to);
        }
        assert_eq!(g.status(), GameStatus::Active);
        for (from, to) in shuffle {
            play(&mut g, from, to);
        }
        assert_eq!(
            g.status(),
            GameStatus::Draw(DrawReason::ThreefoldRepetition)
        );
        assert!(g.submit_move(sq("e2"), sq("e4")).is_err());
    }

    #[test]
    fn snapshot_serializes() {
        let mut g = human_game();
        play(&mut g, "e2", "e4");
        let json = serde_json::to_value(g.snapshot()).unwrap();
        assert_eq!(json["side_to_move"], "black");
        assert_eq!(json["status"], "active");
        assert_eq!(json["history"][0], "e2e4");
        assert_eq!(json["legal_moves"].as_array().unwrap().len(), 20);
        assert_eq!(json["board"][4][4]["kind"], "pawn");
    }
}
