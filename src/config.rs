//! Command-line configuration.

use crate::pipeline::Strategy;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Reports running percentiles of contributions from repeat donors.
#[derive(Parser, Debug, Clone)]
#[command(name = "donation-analytics")]
pub struct Cli {
    /// Path to the `|`-delimited contributions file.
    #[arg(short = 'd', long = "datainput", default_value = "input/itcont.txt")]
    pub data_input: PathBuf,

    /// Path to the file holding the percentile to compute.
    #[arg(short = 'p', long = "percentileinput", default_value = "input/percentile.txt")]
    pub percentile_input: PathBuf,

    /// Path of the output file.
    #[arg(short = 'o', long = "output", default_value = "output/repeat_donors.txt")]
    pub output: PathBuf,

    /// Which handler to run.
    #[arg(short = 'm', long = "mode", value_enum, default_value_t = Mode::Single)]
    pub mode: Mode,

    /// Log the running time of each handler.
    #[arg(short = 'V', long = "verbose")]
    pub verbose: bool,
}

/// Handler selection.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Process on the main thread.
    Single,
    /// Process on a dedicated worker thread.
    Multi,
    /// Run `single`, then `multi`; each rewrites the output file.
    Both,
}

impl Mode {
    /// Strategies to run, in order.
    pub fn strategies(self) -> &'static [Strategy] {
        match self {
            Mode::Single => &[Strategy::Direct],
            Mode::Multi => &[Strategy::Offloaded],
            Mode::Both => &[Strategy::Direct, Strategy::Offloaded],
        }
    }
}
