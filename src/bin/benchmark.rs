use clap::Parser;
use tictactoe::{Board, Mark, Minimax, SearchStatistics};

#[derive(Parser, Debug)]
#[command(author, version, about = "Minimax throughput benchmark", long_about = None)]
struct Args {
    /// Board size N (default: 5)
    #[arg(long, default_value_t = 5)]
    board_size: usize,

    /// Marks in a row needed to win (default: 4)
    #[arg(long, default_value_t = 4)]
    win_condition: usize,

    /// Search horizon in plies (default: 4)
    #[arg(long, default_value_t = 4)]
    depth: u32,

    /// Thread counts to compare, comma separated. 0 lets rayon pick.
    #[arg(long, value_delimiter = ',', default_values_t = [1, 0])]
    threads: Vec<usize>,

    /// Opening moves for X before the search, as "r,c" pairs separated by ';'.
    #[arg(long, value_delimiter = ';')]
    opening: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut board = Board::new(args.board_size, args.win_condition)?;
    let mut mark = Mark::First;
    for cell in &args.opening {
        let pos: tictactoe::Pos = cell.parse().map_err(anyhow::Error::msg)?;
        board.place(pos.row, pos.col, mark)?;
        mark = mark.opponent();
    }

    println!("Tic-Tac-Toe Minimax - Benchmark Tool");
    println!("====================================");
    println!(
        "Board: {}x{}, {} in a row",
        args.board_size, args.board_size, args.win_condition
    );
    println!("Depth: {}", args.depth);
    println!("Opening moves: {}", args.opening.len());
    println!("------------------------------------");
    print!("{board}");

    #[cfg(debug_assertions)]
    println!("WARNING: Running in debug mode. Performance will be significantly lower.\nUse --release for accurate benchmarks.\n");

    for &threads in &args.threads {
        let engine = Minimax::new(args.depth, threads);
        println!("\nRunning with {} thread(s)...", engine.threads());

        let Some((result, stats)) = engine.search_with_stop(&board, None) else {
            anyhow::bail!("search without a stop flag did not finish");
        };
        match result.best_move {
            Some(pos) => println!("  Best Move: {pos} (score {})", result.score),
            None => println!("  No move (score {})", result.score),
        }
        print_stats(&stats);
    }

    Ok(())
}

fn print_stats(stats: &SearchStatistics) {
    println!("  Total Nodes: {}", stats.nodes);
    println!("  Time: {:.3}s", stats.elapsed.as_secs_f64());
    println!("  NPS: {:.0} nodes/sec", stats.nodes_per_second());
}
