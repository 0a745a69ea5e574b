//! Error types for the donation analytics engine.

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur during engine operation.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Failed to open, read or write a file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reading or writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The percentile input is not a number in (0, 100]
    #[error("Invalid percentile {input:?}: expected a number in (0, 100]")]
    InvalidPercentile { input: String },

    /// Rank lookup outside `[0, size)`
    #[error("Rank {rank} out of range for tree of size {size}")]
    RankOutOfRange { rank: usize, size: usize },

    /// Nearest-rank computation produced no valid rank for a non-empty group
    #[error("No valid rank for percentile {percentile} over {count} samples")]
    PercentileRank { percentile: String, count: usize },

    /// A rounded or truncated amount does not fit the output integer type
    #[error("Amount {value} does not fit in a 64-bit integer")]
    AmountOverflow { value: String },

    /// The offloaded worker is no longer accepting records
    #[error("Aggregation worker stopped before the input was exhausted")]
    WorkerStopped,

    /// The offloaded worker panicked
    #[error("Aggregation worker panicked")]
    WorkerPanicked,
}
