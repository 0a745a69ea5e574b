//! Donation Analytics CLI
//!
//! Reads a contributions file and a percentile file, and writes one line per
//! repeat donation with the running percentile, total and count of its
//! recipient, zip and year.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- -d input/itcont.txt -p input/percentile.txt -o output/repeat_donors.txt
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `debug` or `warn` to control logging verbosity

use clap::Parser;
use donation_analytics::{pipeline, read_percentile, Cli, PipeWriter, Result};
use env_logger::Env;
use log::info;
use std::fs::File;
use std::io::BufWriter;
use std::process;
use std::time::Instant;

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let percentile = read_percentile(File::open(&cli.percentile_input)?)?;

    for &strategy in cli.mode.strategies() {
        let started = Instant::now();

        let input = File::open(&cli.data_input)?;
        let output = BufWriter::new(File::create(&cli.output)?);
        let (summary, sink) = pipeline::run(strategy, input, percentile, PipeWriter::new(output))?;
        sink.into_inner()?;

        info!(
            "{:?} handler processed {} records in {:.3} ms",
            strategy,
            summary.accepted,
            started.elapsed().as_secs_f64() * 1000.0
        );
    }

    Ok(())
}
