mod term_render;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::anyhow;
use clap::Parser;
use console::{Key, Term};
use gridfall::network::{AuthorityHost, PlayerLink};
use gridfall::scores::DEFAULT_CAPACITY;
use gridfall::{
    Coord, Game, GameConfig, GameEvent, GameStats, HostConfig, MultiplayerGame, PieceAuthority,
    PieceSupply, PlayerId, ScoreEntry, ScoreTable, Standing,
};
use term_render::{AnsiTermStyle, GameScreen, TermRender};
use tokio::time::Instant;
use zenoh::key_expr::KeyExpr;

/// z_gridfall - block placement puzzle over Zenoh
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Player name
    #[arg(short, long)]
    name: Option<String>,

    /// Key expression prefix
    #[arg(short, long)]
    prefix: Option<KeyExpr<'static>>,

    /// Run the piece authority instead of playing
    #[arg(long)]
    host: bool,

    /// Play against others through a piece authority
    #[arg(short, long)]
    multiplayer: bool,

    /// Path to Zenoh config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// High score file (the online list when hosting)
    #[arg(short, long, default_value = "scores.txt")]
    scores: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Move(isize, isize),
    Place,
    RotateLeft,
    RotateRight,
    Swap,
    Quit,
}

fn read_input(key: Key) -> Option<Input> {
    match key {
        Key::ArrowLeft | Key::Char('a') | Key::Char('A') => Some(Input::Move(-1, 0)),
        Key::ArrowRight | Key::Char('d') | Key::Char('D') => Some(Input::Move(1, 0)),
        Key::ArrowUp | Key::Char('w') | Key::Char('W') => Some(Input::Move(0, -1)),
        Key::ArrowDown | Key::Char('s') | Key::Char('S') => Some(Input::Move(0, 1)),
        Key::Enter | Key::Char('x') | Key::Char('X') => Some(Input::Place),
        Key::Char('q') | Key::Char('Q') | Key::Char('z') | Key::Char('Z') => Some(Input::RotateLeft),
        Key::Char('e') | Key::Char('E') | Key::Char('c') | Key::Char('C') => Some(Input::RotateRight),
        Key::Char(' ') | Key::Char('r') | Key::Char('R') => Some(Input::Swap),
        Key::Escape => Some(Input::Quit),
        _ => None,
    }
}

#[tokio::main(flavor = "multi_thread", worker_threads = 1)]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let mut config = HostConfig::new();
    if let Some(config_path) = &args.config {
        let zenoh_config = zenoh::Config::from_file(config_path)
            .map_err(|e| anyhow!("Failed to load config file: {}", e))?;
        config = config.with_zenoh_config(zenoh_config);
    }
    if let Some(prefix) = &args.prefix {
        config = config.with_keyexpr_prefix(prefix.to_string());
    }
    if let Some(name) = &args.name {
        config = config.with_player_name(name.clone());
    }
    let player = config.player_id()?;

    println!("=== z_gridfall ===");
    if !args.host {
        println!("Player: {}", player);
        println!("Controls:");
        println!("  ← → ↑ ↓ / WASD - Move cursor");
        println!("  Enter / x      - Place piece");
        println!("  q / z          - Rotate left");
        println!("  e / c          - Rotate right");
        println!("  Space / r      - Swap pieces");
    }
    println!("  Esc            - Quit");
    println!();

    // Spawn keyboard input task with separate term
    let (input_tx, input_rx) = flume::unbounded();
    let keyboard_task = tokio::task::spawn_blocking(move || {
        let input_term = Term::stdout();
        loop {
            let Ok(key) = input_term.read_key() else {
                continue;
            };
            let Some(input) = read_input(key) else {
                continue;
            };
            if input_tx.send(input).is_err() || input == Input::Quit {
                break;
            }
        }
    });

    if args.host {
        run_host(&config, &args.scores, &input_rx).await?;
    } else if args.multiplayer {
        run_multiplayer(&config, player, &input_rx).await?;
    } else {
        run_single(player, &args.scores, &input_rx).await?;
    }

    keyboard_task.abort();
    let _ = keyboard_task.await;
    Ok(())
}

async fn open_session(config: &HostConfig) -> anyhow::Result<zenoh::Session> {
    zenoh::open(config.zenoh_config.clone())
        .await
        .map_err(|e| anyhow!("Failed to open zenoh session: {}", e))
}

async fn run_host(
    config: &HostConfig,
    scores_path: &Path,
    input_rx: &flume::Receiver<Input>,
) -> anyhow::Result<()> {
    let session = open_session(config).await?;
    let prefix = config.prefix()?;
    let authority =
        PieceAuthority::new(GameConfig::default().lives).with_hiscores(ScoreTable::load(scores_path)?);
    let host = AuthorityHost::new(&session, &prefix, authority).await?;

    let (stop_tx, stop_rx) = flume::bounded(1);
    let serving = tokio::spawn(host.run(stop_rx));
    println!("Serving pieces on '{}'", prefix);

    wait_for_quit(input_rx).await;
    let _ = stop_tx.send(());
    let authority = serving.await??;

    println!("Final standings:");
    print_standings(&authority.standings());
    authority.hiscores().save(scores_path)?;
    Ok(())
}

async fn run_single(
    player: PlayerId,
    scores_path: &Path,
    input_rx: &flume::Receiver<Input>,
) -> anyhow::Result<()> {
    let mut game = Game::single_player(GameConfig::default());
    let events = game.events();
    game.start()?;

    let (stats, _) = play(&game, player.as_str(), &events, input_rx, || {}).await?;
    println!();
    println!("{}", stats);

    let mut table = ScoreTable::load(scores_path)?;
    if let Some(rank) = table.insert(ScoreEntry::new(player.as_str(), stats.score)) {
        println!("New high score, rank {}!", rank + 1);
        table.save(scores_path)?;
    }
    println!("High scores:");
    print_scores(&table);

    wait_for_quit(input_rx).await;
    Ok(())
}

async fn run_multiplayer(
    config: &HostConfig,
    player: PlayerId,
    input_rx: &flume::Receiver<Input>,
) -> anyhow::Result<()> {
    let session = open_session(config).await?;
    let prefix = config.prefix()?;
    let (link, channel) = PlayerLink::connect(&session, &prefix, player.clone()).await?;

    let mut game = MultiplayerGame::new(GameConfig::default(), channel);
    let events = game.events();
    game.start()?;

    let request = || {
        if let Err(e) = game.request_standings() {
            tracing::warn!("Failed to request standings: {}", e);
        }
    };
    let (stats, mut standings) = play(&*game, player.as_str(), &events, input_rx, request).await?;
    println!();
    println!("{}", stats);

    // One last look at the table after our DIE went out
    request();
    let last = tokio::time::timeout(Duration::from_secs(2), async {
        while let Ok(event) = events.recv_async().await {
            if let GameEvent::Standings(standings) = event {
                return Some(standings);
            }
        }
        None
    })
    .await;
    if let Ok(Some(last)) = last {
        standings = last;
    }
    println!("Standings:");
    print_standings(&standings);

    // Online high scores kept by the authority
    game.request_hiscores()?;
    if let Some(online) = next_hiscores(&events).await {
        let mut table = ScoreTable::from_entries(online, DEFAULT_CAPACITY);
        if table.qualifies(stats.score) {
            game.submit_hiscore(ScoreEntry::new(player.as_str(), stats.score))?;
            // an accepted score makes the game reload the list
            if let Some(updated) = next_hiscores(&events).await {
                table = ScoreTable::from_entries(updated, DEFAULT_CAPACITY);
            }
        }
        println!("Online high scores:");
        print_scores(&table);
    }

    wait_for_quit(input_rx).await;
    drop(game);
    drop(link);
    Ok(())
}

async fn next_hiscores(events: &flume::Receiver<GameEvent>) -> Option<Vec<ScoreEntry>> {
    let received = tokio::time::timeout(Duration::from_secs(2), async {
        while let Ok(event) = events.recv_async().await {
            if let GameEvent::HiScores(entries) = event {
                return Some(entries);
            }
        }
        None
    })
    .await;
    received.ok().flatten()
}

fn print_scores(table: &ScoreTable) {
    for (i, entry) in table.entries().iter().enumerate() {
        println!("  {:>2}. {:<16} {}", i + 1, entry.name, entry.score);
    }
}

fn print_standings(standings: &[Standing]) {
    for standing in standings {
        match standing.lives {
            Some(lives) => println!("  {:<16} {:>6}  {} lives", standing.name, standing.score, lives),
            None => println!("  {:<16} {:>6}  out", standing.name, standing.score),
        }
    }
}

async fn wait_for_quit(input_rx: &flume::Receiver<Input>) {
    println!("Press Esc to exit");
    while let Ok(input) = input_rx.recv_async().await {
        if input == Input::Quit {
            break;
        }
    }
}

fn move_cursor(cursor: Coord, dx: isize, dy: isize, cols: usize, rows: usize) -> Coord {
    let x = (cursor.x as isize + dx).clamp(0, cols as isize - 1);
    let y = (cursor.y as isize + dy).clamp(0, rows as isize - 1);
    Coord::new(x as usize, y as usize)
}

/// Drive a game from keyboard input until it is over
///
/// `poll_standings` runs every two seconds.
async fn play<S: PieceSupply>(
    game: &Game<S>,
    player: &str,
    events: &flume::Receiver<GameEvent>,
    input_rx: &flume::Receiver<Input>,
    poll_standings: impl Fn(),
) -> anyhow::Result<(GameStats, Vec<Standing>)> {
    let term = Term::stdout();
    term.clear_screen()?;

    let snapshot = game.snapshot();
    let (cols, rows) = (snapshot.grid.cols(), snapshot.grid.rows());
    let mut cursor = Coord::new(cols / 2, rows / 2);
    let mut standings: Vec<Standing> = Vec::new();
    let mut message: Vec<String> = Vec::new();
    let mut turn = (Instant::now(), game.timer_delay());
    let mut redraw = tokio::time::interval(Duration::from_millis(100));
    let mut poll = tokio::time::interval(Duration::from_secs(2));

    let stats = loop {
        tokio::select! {
            input = input_rx.recv_async() => {
                let Ok(input) = input else {
                    game.end();
                    break game.stats();
                };
                match input {
                    Input::Move(dx, dy) => cursor = move_cursor(cursor, dx, dy, cols, rows),
                    Input::Place => match game.place(cursor.x as isize, cursor.y as isize) {
                        Ok(placement) if placement.is_placed() => message.clear(),
                        Ok(_) => message = vec!["Cannot place there".to_string()],
                        Err(e) => message = vec![e.to_string()],
                    },
                    Input::RotateLeft => game.rotate_left(),
                    Input::RotateRight => game.rotate_right(),
                    Input::Swap => game.swap_pieces(),
                    // the game over event ends the loop
                    Input::Quit => game.end(),
                }
            }
            event = events.recv_async() => match event {
                Ok(GameEvent::Loop { delay }) => turn = (Instant::now(), delay),
                Ok(GameEvent::LinesCleared(report)) => {
                    message = vec![format!("Cleared {} lines for {} points", report.lines(), report.points)];
                }
                Ok(GameEvent::Standings(update)) => standings = update,
                Ok(GameEvent::GameOver(stats)) => break stats,
                Ok(_) => {}
                Err(_) => break game.stats(),
            },
            _ = redraw.tick() => {}
            _ = poll.tick() => poll_standings(),
        }

        let time_left = 1.0 - turn.0.elapsed().as_secs_f32() / turn.1.as_secs_f32().max(f32::EPSILON);
        render(&term, &game.snapshot(), cursor, player, time_left, &standings, message.clone())?;
    };

    render(&term, &game.snapshot(), cursor, player, 0.0, &standings, message)?;
    Ok((stats, standings))
}

fn render(
    term: &Term,
    snapshot: &gridfall::GameSnapshot,
    cursor: Coord,
    player: &str,
    time_left: f32,
    standings: &[Standing],
    message: Vec<String>,
) -> std::io::Result<()> {
    let screen = GameScreen::new(snapshot, cursor, player, time_left, standings, message);
    term.move_cursor_to(0, 0)?;
    for line in screen.render(&AnsiTermStyle) {
        term.clear_line()?;
        term.write_line(&line)?;
    }
    term.flush()
}
