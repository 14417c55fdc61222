//! # Tilefuse CLI
//!
//! Command-line interface for playing tilefuse interactively or running
//! headless simulations with configurable policies.

mod leaderboard;
mod settings;

use std::collections::BTreeMap;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tilefuse_core::{
    checkpoint, load_checkpoint, qualifies, submit_final_score, Cell, Direction, FileStore, GameConfig,
    GameSession, InputLock, Level, MemoryStore, Notice, PickOutcome, PowerUpKind, PowerUpUse, SessionStore,
    UndoSource, SIZE,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::leaderboard::FileLeaderboard;
use crate::settings::Settings;

const DEFAULT_SEED: u64 = 42;

#[derive(Parser, Debug)]
#[command(name = "tilefuse")]
#[command(author, version, about = "Play tilefuse in the terminal or run simulations")]
struct Args {
    /// Run in interactive mode (default if no other mode specified)
    #[arg(short, long)]
    interactive: bool,

    /// Number of episodes to run in headless mode
    #[arg(short, long)]
    episodes: Option<u32>,

    /// Random seed for deterministic runs [default: 42]
    #[arg(short, long)]
    seed: Option<u64>,

    /// Maximum steps per episode (0 = unlimited)
    #[arg(short, long, default_value = "10000")]
    max_steps: u32,

    /// Policy for headless mode
    #[arg(short, long, value_enum, default_value = "random")]
    policy: Policy,

    /// Show board after each move in headless mode
    #[arg(long)]
    verbose: bool,

    /// TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for the saved game, high score and leaderboard
    #[arg(long, default_value = ".tilefuse")]
    data_dir: PathBuf,

    /// Start a new game even if a saved one exists
    #[arg(long)]
    new: bool,

    /// Name used for leaderboard entries
    #[arg(long)]
    name: Option<String>,

    /// How long input stays locked after a Joker appears, in milliseconds
    #[arg(long, default_value = "600")]
    guard_ms: u64,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Policy {
    /// Random valid moves
    Random,
    /// Cycle through actions: Left, Down, Right, Up
    Cycle,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let settings = Settings::load(args.config.as_deref())?;
    let seed = args.seed.or(settings.seed).unwrap_or(DEFAULT_SEED);

    if let Some(episodes) = args.episodes {
        run_headless(&args, &settings.game, seed, episodes);
    } else {
        let player = args
            .name
            .clone()
            .or(settings.player)
            .unwrap_or_else(|| "player".to_string());
        run_interactive(&args, settings.game, seed, &player).await;
    }
    Ok(())
}

// =============================================================================
// Interactive mode
// =============================================================================

const CONTROLS: &str = "Controls: WASD/Arrows move | U undo | 1-4 power-up | N submit score | R restart | Q quit";
const PICK_CONTROLS: &str = "Picking: Arrows move cursor | Space/Enter pick | X cancel";

/// Run interactive mode where user plays with keyboard.
async fn run_interactive(args: &Args, config: GameConfig, seed: u64, player: &str) {
    let mut store: Box<dyn SessionStore> = match FileStore::new(&args.data_dir) {
        Ok(store) => Box::new(store),
        Err(err) => {
            warn!(error = %err, dir = %args.data_dir.display(), "saving disabled for this run");
            Box::new(MemoryStore::default())
        }
    };
    let leaderboard = FileLeaderboard::new(args.data_dir.join("leaderboard.json"));

    let mut game = match load_checkpoint(store.as_ref()) {
        Some(saved) if saved.has_saved_game() && !args.new => {
            info!(turn = saved.turn, "resuming saved game");
            GameSession::restore(config.clone(), seed, saved)
        }
        _ => GameSession::new(config.clone(), seed),
    };
    let mut restarts: u64 = 0;
    let mut cursor = Cell::new(0, 0);
    let mut messages: Vec<String> = Vec::new();

    // Set terminal to raw mode for single-key input
    enable_raw_mode();
    let mut stdin = io::stdin();
    let mut buffer = [0u8; 3];
    redraw(&game, store.as_ref(), cursor, &messages);

    loop {
        let bytes_read = stdin.read(&mut buffer).unwrap_or(0);
        if bytes_read == 0 {
            continue;
        }
        messages.clear();

        match parse_input(&buffer[..bytes_read]) {
            InputAction::Move(direction) if game.selection().is_some() => {
                cursor = step_cursor(cursor, direction);
            }
            InputAction::Move(direction) => match game.make_move(direction) {
                Ok(report) => {
                    if report.score_gained > 0 {
                        messages.push(format!("+{} points!", report.score_gained));
                    }
                    messages.extend(report.notices.iter().map(describe));
                    if report.moved || report.game_over {
                        checkpoint(store.as_mut(), &game);
                    }
                    if report.game_over {
                        messages.push(game_over_hint(&game));
                    }
                    if game.input_lock() == Some(InputLock::SpawnGuard) {
                        redraw(&game, store.as_ref(), cursor, &messages);
                        tokio::time::sleep(Duration::from_millis(args.guard_ms)).await;
                        game.release_spawn_guard();
                    }
                }
                Err(err) => messages.push(err.to_string()),
            },
            InputAction::Slot(index) => {
                let Some(power_up) = game.inventory().slot(index).copied() else {
                    messages.push(format!("Slot {} is empty", index + 1));
                    redraw(&game, store.as_ref(), cursor, &messages);
                    continue;
                };
                match game.activate_power_up(power_up.id) {
                    Ok(PowerUpUse::Armed { kind, required }) => {
                        messages.push(format!("{kind}: pick {required} tile(s)"));
                    }
                    Ok(PowerUpUse::Applied { notices, .. }) => {
                        messages.extend(notices.iter().map(describe));
                        checkpoint(store.as_mut(), &game);
                    }
                    Err(err) => messages.push(err.to_string()),
                }
            }
            InputAction::Pick => match game.pick(cursor) {
                Ok(PickOutcome::Applied { notices, .. }) => {
                    messages.extend(notices.iter().map(describe));
                    checkpoint(store.as_mut(), &game);
                    if game.is_game_over() {
                        messages.push(game_over_hint(&game));
                    }
                }
                Ok(PickOutcome::Pending { remaining }) => {
                    messages.push(format!("{remaining} more to pick"));
                }
                Ok(PickOutcome::AlreadyPicked) => messages.push("Already picked".to_string()),
                Err(err) => messages.push(err.to_string()),
            },
            InputAction::Cancel => {
                if game.cancel_selection() {
                    messages.push("Selection cancelled".to_string());
                }
            }
            InputAction::Undo => match game.undo() {
                Ok(source) => {
                    let how = match source {
                        UndoSource::ExtraCredit => "used an undo credit",
                        UndoSource::GameOverGrant => "free undo after game over",
                        UndoSource::Baseline => "undo",
                    };
                    messages.push(format!("Undone ({how})"));
                    checkpoint(store.as_mut(), &game);
                }
                Err(err) => messages.push(err.to_string()),
            },
            InputAction::Submit => {
                submit(&mut game, &leaderboard, player, &mut messages).await;
                if game.is_finalized() {
                    if let Err(err) = store.clear_session() {
                        warn!(error = %err, "failed to clear the saved session");
                    }
                }
            }
            InputAction::Restart => {
                restarts += 1;
                game.reset(seed.wrapping_add(restarts));
                cursor = Cell::new(0, 0);
                if let Err(err) = store.clear_session() {
                    warn!(error = %err, "failed to clear the saved session");
                }
            }
            InputAction::Quit => {
                disable_raw_mode();
                println!("\nGoodbye!");
                break;
            }
            InputAction::None => {}
        }

        redraw(&game, store.as_ref(), cursor, &messages);
    }
}

/// Offer the final score to the leaderboard, or discard it.
async fn submit(game: &mut GameSession, leaderboard: &FileLeaderboard, player: &str, messages: &mut Vec<String>) {
    if !game.is_game_over() {
        messages.push("The game is still running".to_string());
        return;
    }
    if game.is_finalized() {
        messages.push("Score already recorded".to_string());
        return;
    }
    if !qualifies(leaderboard, game.score()).await {
        game.finalize();
        messages.push(format!("{} is not a top score", game.score()));
        return;
    }
    if submit_final_score(game, leaderboard, player).await {
        messages.push(format!("Score {} saved as {}", game.score(), player));
    } else {
        messages.push("Could not save the score, press N to retry".to_string());
    }
}

fn game_over_hint(game: &GameSession) -> String {
    if game.can_undo() {
        "*** GAME OVER *** U to undo, N to record your score, R to restart".to_string()
    } else {
        "*** GAME OVER *** N to record your score, R to restart".to_string()
    }
}

fn describe(notice: &Notice) -> String {
    match notice {
        Notice::PowerUpGranted { kind, .. } => format!("New power-up: {kind}"),
        Notice::InventoryFull { rank } => {
            format!("Reached {} but the power-up slots are full", Level::Rank(*rank))
        }
        Notice::RareSpawn { cell } => format!("A Joker appeared at {cell}!"),
        Notice::ExtraUndoBanked { credits } => format!("Undo credits: {credits}"),
        Notice::SlowMotionStarted { turns } => format!("Slow-Mo: no new tiles for {turns} moves"),
        Notice::TileFrozen { cell, turns, .. } => format!("Tile at {cell} frozen for {turns} moves"),
        Notice::TilesSwapped { first, second } => format!("Swapped {first} and {second}"),
        Notice::TileDeleted { cell, .. } => format!("Deleted the tile at {cell}"),
        Notice::FrozenTileReleased { .. } => "Board stuck: a frozen tile thawed early".to_string(),
        Notice::SlowMotionCancelled => "Board stuck: Slow-Mo cancelled".to_string(),
        Notice::GameOver => "No moves left".to_string(),
    }
}

fn step_cursor(cursor: Cell, direction: Direction) -> Cell {
    let last = SIZE - 1;
    match direction {
        Direction::Up => Cell::new(cursor.row.saturating_sub(1), cursor.col),
        Direction::Down => Cell::new((cursor.row + 1).min(last), cursor.col),
        Direction::Left => Cell::new(cursor.row, cursor.col.saturating_sub(1)),
        Direction::Right => Cell::new(cursor.row, (cursor.col + 1).min(last)),
    }
}

fn render_board(game: &GameSession, cursor: Option<Cell>) -> String {
    let border = "+------+------+------+------+\n";
    let mut out = String::from(border);
    for row in 0..SIZE {
        out.push('|');
        for col in 0..SIZE {
            let cell = Cell::new(row, col);
            let mut label = match game.grid().get(cell) {
                Some(tile) if game.frozen().contains(tile.id) => format!("{}*", tile.level),
                Some(tile) => tile.level.to_string(),
                None => String::new(),
            };
            if cursor == Some(cell) {
                label = format!("[{label}]");
            }
            out.push_str(&format!("{label:^6}|"));
        }
        out.push('\n');
        out.push_str(border);
    }
    out
}

fn redraw(game: &GameSession, store: &dyn SessionStore, cursor: Cell, messages: &[String]) {
    let picking = game.selection().is_some();
    let best = store.high_score().unwrap_or(0).max(game.score());

    print!("\x1b[2J\x1b[H"); // Clear screen
    println!("=== tilefuse ===");
    println!("{}\n", if picking { PICK_CONTROLS } else { CONTROLS });
    println!("Score: {}   Best: {}", game.score(), best);
    print!("{}", render_board(game, picking.then_some(cursor)));

    let slots: Vec<String> = game
        .inventory()
        .slots()
        .iter()
        .enumerate()
        .map(|(i, power_up)| format!("[{}] {}", i + 1, power_up.kind))
        .collect();
    println!("Power-ups: {}", if slots.is_empty() { "-".to_string() } else { slots.join("  ") });

    let mut status = Vec::new();
    if game.extra_undo_credits() > 0 {
        status.push(format!("Undo credits: {}", game.extra_undo_credits()));
    }
    if game.slow_motion_turns() > 0 {
        status.push(format!("Slow-Mo: {}", game.slow_motion_turns()));
    }
    if !game.frozen().is_empty() {
        status.push(format!("Frozen: {}", game.frozen().len()));
    }
    if !status.is_empty() {
        println!("{}", status.join("  "));
    }
    for message in messages {
        println!("  {message}");
    }
    if let Err(err) = io::stdout().flush() {
        warn!(error = %err, "failed to flush stdout");
    }
}

// =============================================================================
// Headless mode
// =============================================================================

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct EpisodeStats {
    score: u64,
    highest_rank: u8,
    steps: u32,
    power_ups_used: u32,
    undos: u32,
}

/// Run headless simulation mode.
fn run_headless(args: &Args, config: &GameConfig, seed: u64, episodes: u32) {
    let mut scores: Vec<u64> = Vec::with_capacity(episodes as usize);
    let mut rank_counts: BTreeMap<u8, u32> = BTreeMap::new();
    let mut total_score: u64 = 0;
    let mut power_ups_used: u64 = 0;
    let mut undos: u64 = 0;

    // Use a separate RNG for action selection
    let mut policy_rng = SmallRng::seed_from_u64(seed.wrapping_add(1000));

    for episode in 0..episodes {
        let episode_seed = seed.wrapping_add(episode as u64);
        let game = GameSession::new(config.clone(), episode_seed);
        let stats = play_episode(game, args.policy, &mut policy_rng, args.max_steps, args.verbose);

        scores.push(stats.score);
        total_score += stats.score;
        power_ups_used += u64::from(stats.power_ups_used);
        undos += u64::from(stats.undos);
        *rank_counts.entry(stats.highest_rank).or_insert(0) += 1;

        if args.verbose {
            println!(
                "Episode {}: Score={}, MaxTile={}, Steps={}",
                episode + 1,
                stats.score,
                Level::Rank(stats.highest_rank),
                stats.steps
            );
        }
    }

    // Compute statistics
    let avg_score = total_score as f64 / episodes.max(1) as f64;
    scores.sort_unstable();
    let median_score = match scores.len() {
        0 => 0.0,
        n if n % 2 == 0 => (scores[n / 2 - 1] + scores[n / 2]) as f64 / 2.0,
        n => scores[n / 2] as f64,
    };
    let max_rank_overall = rank_counts.keys().next_back().copied().unwrap_or(0);

    // Output results in parseable format
    println!("=== Simulation Results ===");
    println!("episodes={}", episodes);
    println!("policy={:?}", args.policy);
    println!("seed={}", seed);
    println!("max_steps={}", args.max_steps);
    println!("avg_score={:.2}", avg_score);
    println!("median_score={:.2}", median_score);
    println!("min_score={}", scores.first().unwrap_or(&0));
    println!("max_score={}", scores.last().unwrap_or(&0));
    println!("max_tile_overall={}", Level::Rank(max_rank_overall));
    println!("power_ups_used={}", power_ups_used);
    println!("undos={}", undos);

    let distribution: Vec<String> = rank_counts
        .iter()
        .map(|(rank, count)| format!("{}:{}", Level::Rank(*rank), count))
        .collect();
    println!("tile_distribution={}", distribution.join(","));
}

/// Play one game to the end (or `max_steps`) with `policy`.
fn play_episode(mut game: GameSession, policy: Policy, rng: &mut SmallRng, max_steps: u32, verbose: bool) -> EpisodeStats {
    let mut stats = EpisodeStats::default();
    let mut action_cycle = 0;

    while max_steps == 0 || stats.steps < max_steps {
        game.release_spawn_guard();
        stats.power_ups_used += spend_power_ups(&mut game);
        if game.is_game_over() {
            // Only banked credits, so the episode always terminates.
            if game.extra_undo_credits() > 0 && game.undo().is_ok() {
                stats.undos += 1;
                continue;
            }
            break;
        }

        let action = match policy {
            Policy::Random => select_random_action(&game, rng),
            Policy::Cycle => select_cycle_action(&game, &mut action_cycle),
        };
        // With no legal direction a move attempt triggers deadlock recovery.
        let direction = action.unwrap_or(Direction::Left);
        match game.make_move(direction) {
            Ok(_) => stats.steps += 1,
            Err(err) => {
                warn!(error = %err, "headless move rejected");
                break;
            }
        }

        if verbose {
            println!("Step {}: {:?}", stats.steps, direction);
            print!("{}", game);
        }
    }

    stats.score = game.score();
    stats.highest_rank = game.highest_rank();
    stats
}

/// Use the power-ups the simple policies know how to use. Returns how many.
fn spend_power_ups(game: &mut GameSession) -> u32 {
    let mut used = 0;
    let held: Vec<_> = game.inventory().slots().to_vec();
    for power_up in held {
        let worth_it = match power_up.kind {
            PowerUpKind::Undo => true,
            PowerUpKind::SlowMo => game.slow_motion_turns() == 0 && game.grid().empty_cells().len() > 4,
            PowerUpKind::Delete => game.grid().is_full(),
            PowerUpKind::Freeze | PowerUpKind::Swap => false,
        };
        if !worth_it {
            continue;
        }
        match game.activate_power_up(power_up.id) {
            Ok(PowerUpUse::Applied { .. }) => used += 1,
            Ok(PowerUpUse::Armed { .. }) => {
                let lowest = game
                    .grid()
                    .tiles()
                    .filter_map(|(cell, tile)| tile.level.rank().map(|rank| (rank, cell)))
                    .min();
                match lowest.map(|(_, cell)| game.pick(cell)) {
                    Some(Ok(PickOutcome::Applied { .. })) => used += 1,
                    _ => {
                        game.cancel_selection();
                    }
                }
            }
            Err(_) => {}
        }
    }
    used
}

/// Select a random valid action.
fn select_random_action(game: &GameSession, rng: &mut SmallRng) -> Option<Direction> {
    let legal = game.legal_moves();
    let valid_actions: Vec<Direction> = Direction::all()
        .into_iter()
        .zip(legal)
        .filter(|(_, ok)| *ok)
        .map(|(direction, _)| direction)
        .collect();

    if valid_actions.is_empty() {
        None
    } else {
        Some(valid_actions[rng.gen_range(0..valid_actions.len())])
    }
}

/// Select action in a cycle: Left, Down, Right, Up.
fn select_cycle_action(game: &GameSession, cycle: &mut usize) -> Option<Direction> {
    let order = [Direction::Left, Direction::Down, Direction::Right, Direction::Up];
    let legal = game.legal_moves();

    // Try actions in cycle order, starting from current position
    for _ in 0..4 {
        let action = order[*cycle % 4];
        *cycle += 1;
        if legal[action as usize] {
            return Some(action);
        }
    }

    None
}

// =============================================================================
// Terminal input
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputAction {
    Move(Direction),
    Slot(usize),
    Pick,
    Cancel,
    Undo,
    Submit,
    Restart,
    Quit,
    None,
}

fn parse_input(bytes: &[u8]) -> InputAction {
    match bytes {
        // Arrow keys (escape sequences)
        [27, 91, 65] => InputAction::Move(Direction::Up),    // Up arrow
        [27, 91, 66] => InputAction::Move(Direction::Down),  // Down arrow
        [27, 91, 67] => InputAction::Move(Direction::Right), // Right arrow
        [27, 91, 68] => InputAction::Move(Direction::Left),  // Left arrow

        // WASD keys
        [b'w'] | [b'W'] => InputAction::Move(Direction::Up),
        [b's'] | [b'S'] => InputAction::Move(Direction::Down),
        [b'a'] | [b'A'] => InputAction::Move(Direction::Left),
        [b'd'] | [b'D'] => InputAction::Move(Direction::Right),

        // Power-ups
        [digit @ b'1'..=b'4'] => InputAction::Slot(usize::from(digit - b'1')),
        [b' '] | [b'\r'] | [b'\n'] => InputAction::Pick,
        [b'x'] | [b'X'] => InputAction::Cancel,
        [b'u'] | [b'U'] => InputAction::Undo,

        // Control keys
        [b'n'] | [b'N'] => InputAction::Submit,
        [b'q'] | [b'Q'] | [3] | [27] => InputAction::Quit, // q, Q, Ctrl+C, Esc
        [b'r'] | [b'R'] => InputAction::Restart,

        _ => InputAction::None,
    }
}

// Platform-specific terminal raw mode handling
#[cfg(unix)]
fn enable_raw_mode() {
    use std::os::unix::io::AsRawFd;
    unsafe {
        let fd = io::stdin().as_raw_fd();
        let mut termios: libc::termios = std::mem::zeroed();
        libc::tcgetattr(fd, &mut termios);
        termios.c_lflag &= !(libc::ICANON | libc::ECHO);
        termios.c_cc[libc::VMIN] = 1;
        termios.c_cc[libc::VTIME] = 0;
        libc::tcsetattr(fd, libc::TCSANOW, &termios);
    }
}

#[cfg(unix)]
fn disable_raw_mode() {
    use std::os::unix::io::AsRawFd;
    unsafe {
        let fd = io::stdin().as_raw_fd();
        let mut termios: libc::termios = std::mem::zeroed();
        libc::tcgetattr(fd, &mut termios);
        termios.c_lflag |= libc::ICANON | libc::ECHO;
        libc::tcsetattr(fd, libc::TCSANOW, &termios);
    }
}

#[cfg(not(unix))]
fn enable_raw_mode() {
    // Without raw mode every key needs Enter.
}

#[cfg(not(unix))]
fn disable_raw_mode() {}

#[cfg(test)]
mod tests {
    use super::*;
    use tilefuse_core::{Grid, SpawnWeights};

    fn quiet_config() -> GameConfig {
        GameConfig {
            rare_spawn_guard: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_input_keys() {
        assert_eq!(parse_input(&[27, 91, 65]), InputAction::Move(Direction::Up));
        assert_eq!(parse_input(b"a"), InputAction::Move(Direction::Left));
        assert_eq!(parse_input(b"1"), InputAction::Slot(0));
        assert_eq!(parse_input(b"4"), InputAction::Slot(3));
        assert_eq!(parse_input(b"5"), InputAction::None);
        assert_eq!(parse_input(b" "), InputAction::Pick);
        assert_eq!(parse_input(b"x"), InputAction::Cancel);
        assert_eq!(parse_input(b"u"), InputAction::Undo);
        assert_eq!(parse_input(b"n"), InputAction::Submit);
        assert_eq!(parse_input(&[27]), InputAction::Quit);
    }

    #[test]
    fn test_cursor_stays_on_board() {
        let corner = Cell::new(0, 0);
        assert_eq!(step_cursor(corner, Direction::Up), corner);
        assert_eq!(step_cursor(corner, Direction::Left), corner);
        assert_eq!(step_cursor(corner, Direction::Right), Cell::new(0, 1));
        let far = Cell::new(3, 3);
        assert_eq!(step_cursor(far, Direction::Down), far);
    }

    #[test]
    fn test_render_marks_cursor_and_frozen() {
        let grid = Grid::parse("1 . . . / . . . . / . . . . / . . . .").unwrap();
        let game = GameSession::from_board(quiet_config(), 1, grid);
        let board = render_board(&game, Some(Cell::new(0, 0)));
        assert!(board.contains("[2]"));
        assert!(!render_board(&game, None).contains('['));
    }

    #[test]
    fn test_cycle_skips_illegal_directions() {
        let grid = Grid::parse("1 . . . / . . . . / . . . . / . . . .").unwrap();
        let game = GameSession::from_board(quiet_config(), 1, grid);
        let mut cycle = 0;
        // Left is illegal for a tile in the top-left corner.
        assert_eq!(select_cycle_action(&game, &mut cycle), Some(Direction::Down));
        assert_eq!(cycle, 2);
    }

    #[test]
    fn test_episode_runs_to_completion() {
        let config = GameConfig {
            spawn_weights: SpawnWeights {
                joker: 0,
                rank1: 1,
                rank2: 1,
            },
            ..quiet_config()
        };
        let mut rng = SmallRng::seed_from_u64(5);
        let stats = play_episode(GameSession::new(config, 5), Policy::Random, &mut rng, 0, false);
        assert!(stats.steps > 0);
        assert!(stats.score > 0);
        assert!(stats.highest_rank >= 2);
    }

    #[test]
    fn test_episodes_are_reproducible() {
        let run = || {
            let mut rng = SmallRng::seed_from_u64(9);
            play_episode(GameSession::new(quiet_config(), 9), Policy::Cycle, &mut rng, 200, false)
        };
        assert_eq!(run(), run());
    }
}
