use crate::ai::engine::{MinimaxAi, TieBreak};
use crate::engine::game::PlayerKind;
use crate::engine::types::Color;

/// Game configuration parsed from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Plies searched by the minimax engine.
    pub search_depth: u32,
    pub white: PlayerKind,
    pub black: PlayerKind,
    /// Root tie-breaking rule for equal scores.
    pub tie_break: TieBreak,
    /// Ply cap for the self-play driver.
    pub max_plies: u32,
}

impl AppConfig {
    /// Environment variable that picks the player for `color`'s seat.
    pub fn seat_var(color: Color) -> &'static str {
        match color {
            Color::White => "CHESS_WHITE_PLAYER",
            Color::Black => "CHESS_BLACK_PLAYER",
        }
    }

    /// Load configuration from environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset or unparseable values keep their
    /// defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AppConfig::default();
        AppConfig {
            search_depth: lookup("CHESS_AI_DEPTH")
                .and_then(|v| v.trim().parse().ok())
                .filter(|&d: &u32| d >= 1)
                .unwrap_or(defaults.search_depth),
            white: lookup(Self::seat_var(Color::White))
                .and_then(|v| PlayerKind::parse(&v))
                .unwrap_or(defaults.white),
            black: lookup(Self::seat_var(Color::Black))
                .and_then(|v| PlayerKind::parse(&v))
                .unwrap_or(defaults.black),
            tie_break: lookup("CHESS_TIE_BREAK")
                .and_then(|v| TieBreak::parse(&v))
                .unwrap_or(defaults.tie_break),
            max_plies: lookup("CHESS_MAX_PLIES")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.max_plies),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            search_depth: MinimaxAi::DEFAULT_DEPTH,
            white: PlayerKind::Human,
            black: PlayerKind::Computer,
            tie_break: TieBreak::Random,
            max_plies: 200,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn default_config() {
        let config = AppConfig::default();
        assert_eq!(config.search_depth, 2);
        assert_eq!(config.white, PlayerKind::Human);
        assert_eq!(config.black, PlayerKind::Computer);
        assert_eq!(config.tie_break, TieBreak::Random);
        assert_eq!(config.max_plies, 200);
    }

    #[test]
    fn empty_lookup_gives_defaults() {
        assert_eq!(AppConfig::from_lookup(|_| None), AppConfig::default());
    }

    #[test]
    fn reads_every_variable() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("CHESS_AI_DEPTH", "3"),
            ("CHESS_WHITE_PLAYER", "computer"),
            ("CHESS_BLACK_PLAYER", "Human"),
            ("CHESS_TIE_BREAK", "first"),
            ("CHESS_MAX_PLIES", "40"),
        ]));
        assert_eq!(config.search_depth, 3);
        assert_eq!(config.white, PlayerKind::Computer);
        assert_eq!(config.black, PlayerKind::Human);
        assert_eq!(config.tie_break, TieBreak::FirstFound);
        assert_eq!(config.max_plies, 40);
    }

    #[test]
    fn seat_vars_select_computer_players() {
        let config = AppConfig::from_lookup(lookup_from(&[
            (AppConfig::seat_var(Color::White), "computer"),
            (AppConfig::seat_var(Color::Black), "computer"),
        ]));
        assert_eq!(config.white, PlayerKind::Computer);
        assert_eq!(config.black, PlayerKind::Computer);
        assert_eq!(AppConfig::seat_var(Color::White), "CHESS_WHITE_PLAYER");
    }

    #[test]
    fn bad_values_fall_back() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("CHESS_AI_DEPTH", "0"),
            ("CHESS_WHITE_PLAYER", "robot"),
            ("CHESS_TIE_BREAK", "coin"),
            ("CHESS_MAX_PLIES", "-5"),
        ]));
        assert_eq!(config, AppConfig::default());
    }
}
