pub mod engine;
pub mod evaluation;

pub use engine::{AiEngine, GreedyAi, MinimaxAi, RandomAi, SearchStats, TieBreak};
