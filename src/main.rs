//! Price Tree Book - Binary Entry Point
//!
//! Reads protocol lines from a file or stdin, applies them to an in-memory
//! book and prints the best bid and ask per ticker.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use price_tree_book::{best_bid_and_ask, LogSink, OrderBook, OrderProcessor};

/// Command-line configuration
#[derive(Parser, Debug, Clone)]
#[command(name = "price-tree-book")]
#[command(version)]
#[command(about = "Best bid/ask from an add/update/cancel order stream", long_about = None)]
struct Cli {
    /// Protocol file, one instruction per line (default: stdin)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Ticker to quote; repeat for several (default: every ticker seen)
    #[arg(short, long = "ticker")]
    tickers: Vec<String>,

    /// Expected number of resting orders
    #[arg(short, long, default_value_t = 1024)]
    capacity: usize,

    /// Log level, overridden by RUST_LOG
    #[arg(short = 'l', long, default_value = "warn", value_parser = ["trace", "debug", "info", "warn", "error"])]
    log_level: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "failed to read input");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> io::Result<()> {
    let reader: Box<dyn BufRead> = match &cli.input {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let processor = OrderProcessor::new();
    let mut book = OrderBook::with_capacity(cli.capacity);
    let receipt = processor.process_reader(&mut book, reader, &mut LogSink)?;

    info!(
        lines = receipt.lines_processed,
        applied = receipt.applied,
        rejected = receipt.rejected,
        "input processed"
    );

    let tickers: Vec<&str> = if cli.tickers.is_empty() {
        book.tickers()
    } else {
        cli.tickers.iter().map(String::as_str).collect()
    };

    for ticker in tickers {
        let quote = best_bid_and_ask(&book, ticker);
        println!("{ticker}: bid {} ask {}", quote.best_bid, quote.best_ask);
    }
    println!("state root: {}", receipt.state_root_hex());

    Ok(())
}

/// Initialise the tracing subscriber on stderr
fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}
