use mailbox_chess::config::AppConfig;
use mailbox_chess::engine::game::{Game, PlayerKind};
use mailbox_chess::engine::types::Color;

fn main() {
    // Initialize tracing (structured logging).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailbox_chess=info".into()),
        )
        .init();

    let config = AppConfig::from_env();
    tracing::info!(
        depth = config.search_depth,
        white = ?config.white,
        black = ?config.black,
        tie_break = ?config.tie_break,
        "mailbox-chess v{} self-play",
        env!("CARGO_PKG_VERSION")
    );
    if config.white == PlayerKind::Human || config.black == PlayerKind::Human {
        tracing::info!(
            "only computer seats are played; set {}=computer and {}=computer for a full game",
            AppConfig::seat_var(Color::White),
            AppConfig::seat_var(Color::Black),
        );
    }

    let mut game = Game::from_config(&config);

    while !game.is_game_over() && (game.move_history().len() as u32) < config.max_plies {
        if game.is_human_turn() {
            let side = game.side_to_move();
            tracing::warn!(
                %side,
                "human seat to move; set {}=computer to let the engine play it",
                AppConfig::seat_var(side)
            );
            break;
        }
        if let Err(e) = game.play_computer_move() {
            tracing::error!("computer move failed: {e}");
            break;
        }
    }

    let history: Vec<String> = game
        .move_history()
        .iter()
        .map(|m| m.chess_notation())
        .collect();

    println!("{}", game.board());
    println!();
    println!("status: {}", game.status());
    println!("fen:    {}", game.state().to_fen());
    println!("moves:  {}", history.join(" "));
}
