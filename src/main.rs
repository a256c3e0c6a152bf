use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use dragon_solver::{
    board::Board,
    move_::{Move, describe_move, format_moves},
    solver::{Outcome, SolveOptions, SolveResult, replay, solve},
};
use std::io::{IsTerminal, Read, Write, stderr, stdin};
use std::path::PathBuf;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::{thread::sleep, time::Duration};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deal random layouts and try to solve each
    Deal {
        /// Number of deals
        #[arg(short = 'n', long, default_value_t = 1, value_name = "NUM")]
        deals: u64,
        /// Seed of the first deal; the following deals count up from it
        #[arg(short, long, value_name = "SEED")]
        seed: Option<u64>,
        /// Max moves to explore per deal
        #[arg(short, long, default_value_t = 5_000_000, value_name = "NUM")]
        max_moves: u64,
        /// Print each deal before solving
        #[arg(long)]
        show: bool,
        /// Show solutions step by step
        #[arg(short, long)]
        replay: bool,
        /// Delay between replayed moves in milliseconds
        #[arg(short, long, default_value_t = 500, value_name = "MS")]
        interval: u64,
    },
    /// Solve a layout loaded from a file or stdin
    Solve {
        /// Max moves to explore
        #[arg(short, long, default_value_t = 50_000_000, value_name = "NUM")]
        max_moves: u64,
        /// Print the parsed layout without solving
        #[arg(short, long)]
        preview: bool,
        /// Show the solution step by step
        #[arg(short, long)]
        replay: bool,
        /// Delay between replayed moves in milliseconds
        #[arg(short, long, default_value_t = 500, value_name = "MS")]
        interval: u64,
        /// Path to a layout file
        file: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Deal {
            deals,
            seed,
            max_moves,
            show,
            replay,
            interval,
        } => {
            let seed = seed.unwrap_or_else(rand::random);
            println!("Seed: {seed}");
            let mut solved = 0;
            for i in 0..deals {
                let deal_seed = seed.wrapping_add(i);
                let board = Board::new_from_seed(deal_seed);
                if show {
                    println!("{board}\n");
                }
                let result = do_solve(board.clone(), max_moves)?;
                println!("#{} (seed {deal_seed}) {}", i + 1, describe_result(&result));
                if let Some(moves) = result.moves() {
                    solved += 1;
                    if replay {
                        play(&board, moves, interval)?;
                    }
                }
            }
            if deals > 1 {
                let rate = solved as f64 * 100.0 / deals as f64;
                println!("Solved {solved}/{deals} ({rate:.1}%)");
            }
        }
        Commands::Solve {
            max_moves,
            preview,
            replay,
            interval,
            file,
        } => {
            let board = if let Some(file) = file {
                let content = std::fs::read_to_string(file)?;
                Board::parse(&content).context("Failed to parse board")?
            } else if !stdin().is_terminal() {
                let mut content = String::new();
                stdin()
                    .read_to_string(&mut content)
                    .context("Failed to read from stdin")?;
                Board::parse(&content).context("Failed to parse board")?
            } else {
                bail!("No layout `file` provided.");
            };
            println!("{board}\n");
            if preview {
                return Ok(());
            }
            let result = do_solve(board.clone(), max_moves)?;
            println!("{}", describe_result(&result));
            match &result.outcome {
                Outcome::Solved(moves) if replay => play(&board, moves, interval)?,
                Outcome::Solved(moves) => print!("\n{}", format_moves(moves)),
                _ => {}
            }
        }
    }

    Ok(())
}

fn do_solve(board: Board, max_moves: u64) -> Result<SolveResult> {
    let options = SolveOptions {
        max_moves: Some(max_moves),
        ..Default::default()
    };
    with_spinner("Solving the game...", move || solve(board, options))
}

fn describe_result(result: &SolveResult) -> String {
    let SolveResult {
        outcome,
        moves_explored,
        states,
        elapsed,
    } = result;
    let elapsed = format_elapsed(*elapsed);
    let verdict = match outcome {
        Outcome::Solved(moves) => format!("✓ Solved in {} Moves", moves.len()),
        Outcome::Exhausted => "✗ No solution".to_string(),
        Outcome::Aborted => "? Gave up".to_string(),
    };
    format!("{verdict}, Explored: {moves_explored}, States: {states}, Time: {elapsed}")
}

fn play(board: &Board, moves: &[Move], interval: u64) -> Result<()> {
    let snapshots = replay(board, moves)?;
    let total = moves.len();
    let mut before = board;
    for (index, (mov, after)) in moves.iter().zip(&snapshots).enumerate() {
        println!("{:03}/{total:03} {}", index + 1, describe_move(before, mov));
        println!("{after}\n");
        before = after;
        sleep(Duration::from_millis(interval));
    }
    Ok(())
}

fn with_spinner<T, F: FnOnce() -> T>(message: &str, f: F) -> T {
    if stderr().is_terminal() {
        let spinning = Arc::new(AtomicBool::new(true));
        let spinning_clone = Arc::clone(&spinning);
        let message = message.to_string();

        let handle = std::thread::spawn(move || {
            let spinner_chars = ['|', '/', '-', '\\'];
            let mut i = 0;
            let stderr = stderr();
            let mut handle = stderr.lock();

            let _ = write!(handle, "\x1b[?25l"); // hide cursor
            let _ = handle.flush();

            while spinning_clone.load(Ordering::Relaxed) {
                let spinner_char = spinner_chars[i % spinner_chars.len()];
                let _ = write!(handle, "\r{spinner_char} {message}",);
                let _ = handle.flush();
                sleep(Duration::from_millis(100));
                i += 1;
            }

            let _ = write!(handle, "\r\x1b[2K\r\x1b[?25h"); // clear line and show cursor
            let _ = handle.flush();
        });

        let result = f();
        spinning.store(false, Ordering::Relaxed);
        let _ = handle.join();
        result
    } else {
        f()
    }
}

fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    if secs < 90 {
        let ms = elapsed.subsec_millis();
        format!("{secs}.{ms:03}s")
    } else {
        let minutes = secs / 60;
        let secs = secs % 60;
        format!("{minutes}m {secs}s")
    }
}
