//! # Tic-Tac-Toe Console
//!
//! Interactive console front end for the engine. Board size, win condition
//! and mode can be passed as flags; anything missing is asked for at
//! startup. Moves are typed as `row,col` (zero-based).
//!
//! ## Usage
//! ```text
//! play --board-size 5 --win-condition 4 --mode computer
//! RUST_LOG=debug play
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tictactoe::{
    GameConfig, GameStatus, Mark, MoveOutcome, Pos, SearchError, Session, TimeoutPolicy, Turn,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Who plays `O`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum Mode {
    /// Human against the computer
    Computer,
    /// Two humans at one keyboard
    Human,
}

/// Command line spelling of [`TimeoutPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum OnTimeout {
    /// Play a random cell for the computer and keep going
    Random,
    /// Log the failure and exit with status 1
    Abort,
}

impl From<OnTimeout> for TimeoutPolicy {
    fn from(value: OnTimeout) -> Self {
        match value {
            OnTimeout::Random => TimeoutPolicy::Random,
            OnTimeout::Abort => TimeoutPolicy::Abort,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "N-by-N tic-tac-toe against a minimax opponent", long_about = None)]
struct Args {
    /// Side length of the board (asked for if omitted)
    #[arg(short, long)]
    board_size: Option<usize>,

    /// Marks in a row needed to win (asked for if omitted)
    #[arg(short, long)]
    win_condition: Option<usize>,

    /// Opponent for X (asked for if omitted)
    #[arg(short, long, value_enum)]
    mode: Option<Mode>,

    /// Let the computer open the game
    #[arg(long, action = clap::ArgAction::SetTrue)]
    computer_first: bool,

    /// Search horizon in plies
    #[arg(short, long, default_value_t = tictactoe::DEFAULT_MAX_DEPTH)]
    depth: u32,

    /// Seconds the computer may think per move
    #[arg(long, default_value_t = tictactoe::DEFAULT_TIMEOUT.as_secs())]
    timeout_secs: u64,

    /// Threads for the search (default: number of CPUs)
    #[arg(short = 'n', long)]
    num_threads: Option<usize>,

    /// What to do when the computer runs out of time
    #[arg(long, value_enum, default_value_t = OnTimeout::Random)]
    on_timeout: OnTimeout,

    /// Seed for the fallback random mover (default: clock)
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let stdin = io::stdin();
    let mut input = stdin.lock();

    let Some(config) = setup(&args, &mut input)? else {
        return Ok(());
    };
    info!(?config, "starting game");

    let mut session = Session::new(config);
    run(&mut session, &mut input)?;
    Ok(())
}

/// Builds the game configuration from flags, prompting for what is missing.
///
/// Returns `None` if input ends before a valid configuration is entered.
fn setup(args: &Args, input: &mut impl BufRead) -> Result<Option<GameConfig>> {
    let seed = args.seed.unwrap_or_else(clock_seed);
    let mut board_size = args.board_size.map(|n| n.to_string());
    let mut win_condition = args.win_condition.map(|k| k.to_string());

    let vs_computer = match args.mode {
        Some(mode) => mode == Mode::Computer,
        None => match ask_mode(input)? {
            Some(vs_computer) => vs_computer,
            None => return Ok(None),
        },
    };

    loop {
        let size = match board_size.take() {
            Some(size) => size,
            None => match ask(input, "Board size (N, at least 3): ")? {
                Some(size) => size,
                None => return Ok(None),
            },
        };
        let k = match win_condition.take() {
            Some(k) => k,
            None => match ask(input, "Marks in a row to win (K, 3..=N): ")? {
                Some(k) => k,
                None => return Ok(None),
            },
        };

        match GameConfig::parse(&size, &k, vs_computer) {
            Ok(config) => {
                let config = config
                    .with_max_depth(args.depth)?
                    .with_computer_first(args.computer_first)
                    .with_threads(args.num_threads.unwrap_or_else(num_cpus::get))
                    .with_timeout(Duration::from_secs(args.timeout_secs))
                    .with_seed(seed)
                    .with_on_timeout(args.on_timeout.into());
                return Ok(Some(config));
            }
            Err(err) => {
                println!("{}", format!("Invalid setup: {err}").red());
            }
        }
    }
}

fn ask_mode(input: &mut impl BufRead) -> Result<Option<bool>> {
    loop {
        let Some(answer) = ask(input, "Play against the computer? [y/n]: ")? else {
            return Ok(None);
        };
        match answer.to_ascii_lowercase().as_str() {
            "y" | "yes" => return Ok(Some(true)),
            "n" | "no" => return Ok(Some(false)),
            _ => println!("Please answer y or n."),
        }
    }
}

/// Prints `prompt` and reads one trimmed line. `None` on end of input.
fn ask(input: &mut impl BufRead, prompt: &str) -> Result<Option<String>> {
    print!("{prompt}");
    io::stdout().flush().context("failed to flush stdout")?;

    let mut line = String::new();
    let read = input
        .read_line(&mut line)
        .context("failed to read from stdin")?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_nanos() as u64)
}

/// Main game loop
fn run(session: &mut Session, input: &mut impl BufRead) -> Result<()> {
    let timeout = session.config().timeout;

    loop {
        render(session);

        if let GameStatus::Won(_) | GameStatus::Draw = session.status() {
            print_result(session);
            return Ok(());
        }

        if session.is_computer_turn() {
            println!("Computer is thinking...");
            match session.request_computer_move(timeout) {
                Ok(turn) => report(session, &turn),
                Err(SearchError::TimedOut { timeout }) => on_timeout(session, timeout),
                Err(err) => return Err(err).context("computer could not move"),
            }
            continue;
        }

        let prompt = format!(
            "{} to move (row,col), 'history' or 'q': ",
            session.player_name(session.to_move())
        );
        let Some(line) = ask(input, &prompt)? else {
            return Ok(());
        };

        match line.as_str() {
            "q" | "quit" => return Ok(()),
            "history" => print!("{}", session.format_history()),
            text => match text.parse::<Pos>() {
                Ok(pos) => {
                    let turn = session.human_move(pos.row, pos.col);
                    report(session, &turn);
                }
                Err(err) => println!("{}", err.red()),
            },
        }
    }
}

fn on_timeout(session: &mut Session, timeout: Duration) {
    match session.config().on_timeout {
        TimeoutPolicy::Random => {
            warn!(?timeout, "computer ran out of time, playing a random move");
            println!(
                "{}",
                format!("Computer ran out of time ({timeout:?}), playing a random move.").yellow()
            );
            let turn = session.play_random_move();
            report(session, &turn);
        }
        TimeoutPolicy::Abort => {
            error!(?timeout, "computer search timed out, aborting");
            eprintln!("Computer search did not finish within {timeout:?}.");
            std::process::exit(1);
        }
    }
}

fn report(session: &Session, turn: &Turn) {
    match turn.outcome {
        MoveOutcome::Accepted(pos) => {
            if let Some(last) = session.move_history().last() {
                if last.by_computer {
                    println!("Computer plays {pos}.");
                }
            }
        }
        MoveOutcome::Rejected(reason) => println!("{}", format!("Move rejected: {reason}").red()),
        MoveOutcome::GameOver => println!("The game is already over."),
    }
}

fn print_result(session: &Session) {
    match session.status() {
        GameStatus::Won(mark) => {
            println!("{}", format!("{} wins!", session.player_name(mark)).bold());
        }
        GameStatus::Draw => println!("{}", "It's a draw.".bold()),
        GameStatus::InProgress => {}
    }
}

/// Draws the board with column and row indices.
fn render(session: &Session) {
    let board = session.board();
    let winning = session.winning_line().unwrap_or(&[]);
    let width = (board.size() - 1).to_string().len();

    print!("\n{:width$} ", "");
    for col in 0..board.size() {
        print!(" {col:>width$}");
    }
    println!();

    for (row, cells) in board.rows().enumerate() {
        print!("{row:>width$} ");
        for (col, &mark) in cells.iter().enumerate() {
            let symbol = format!("{:>width$}", mark.symbol());
            let cell = match mark {
                Mark::First => symbol.red().bold(),
                Mark::Second => symbol.blue().bold(),
                Mark::Empty => symbol.dimmed(),
            };
            let cell = if winning.contains(&Pos::new(row, col)) {
                cell.on_yellow()
            } else {
                cell
            };
            print!(" {cell}");
        }
        println!();
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::io::Cursor;

    fn args(extra: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("play").chain(extra.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_setup_from_flags() {
        let args = args(&["-b", "5", "-w", "4", "-m", "computer", "-n", "2", "--seed", "3"]);
        let config = setup(&args, &mut Cursor::new("")).unwrap().unwrap();
        assert_eq!(config.board_size, 5);
        assert_eq!(config.win_condition, 4);
        assert!(config.vs_computer);
        assert_eq!(config.threads, 2);
        assert_eq!(config.seed, 3);
        assert_eq!(config.on_timeout, TimeoutPolicy::Random);
    }

    #[test]
    fn test_abort_policy_flag() {
        let args = args(&["-b", "3", "-w", "3", "-m", "computer", "--on-timeout", "abort"]);
        let config = setup(&args, &mut Cursor::new("")).unwrap().unwrap();
        assert_eq!(config.on_timeout, TimeoutPolicy::Abort);
    }

    #[test]
    fn test_setup_reprompts_on_invalid_input() {
        let args = args(&[]);
        let mut input = Cursor::new("maybe\nn\n2\n3\n4\nx\n4\n5\n4\n3\n");
        let config = setup(&args, &mut input).unwrap().unwrap();
        assert!(!config.vs_computer);
        assert_eq!(config.board_size, 4);
        assert_eq!(config.win_condition, 3);
    }

    #[test]
    fn test_setup_end_of_input() {
        let args = args(&["-m", "human"]);
        assert_eq!(setup(&args, &mut Cursor::new("3\n")).unwrap(), None);
    }

    #[test]
    fn test_zero_depth_flag_is_an_error() {
        let args = args(&["-b", "3", "-w", "3", "-m", "human", "-d", "0"]);
        assert!(setup(&args, &mut Cursor::new("")).is_err());
    }

    #[test]
    fn test_two_human_game_loop() {
        let config = GameConfig::new(3, 3, false).unwrap();
        let mut session = Session::new(config);
        let mut input = Cursor::new("0,0\n1,0\nbad\n0,1\n0,1\n1,1\nhistory\n0,2\n");
        run(&mut session, &mut input).unwrap();
        assert_eq!(session.status(), GameStatus::Won(Mark::First));
        assert_eq!(session.move_history().len(), 5);
    }
}
