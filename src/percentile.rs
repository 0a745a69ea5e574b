//! Requested percentile and the Nearest-Rank method.

use crate::error::{EngineError, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::str::FromStr;

/// A percentile in `(0, 100]`.
///
/// Held as an exact decimal so that `ceil(p / 100 * n)` is computed without
/// binary floating-point error: the 30th percentile of 10 samples is rank 2,
/// not rank 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Percentile(Decimal);

impl Percentile {
    /// Validates and wraps a percentile value.
    pub fn new(value: Decimal) -> Result<Self> {
        if value > Decimal::ZERO && value <= Decimal::ONE_HUNDRED {
            Ok(Percentile(value))
        } else {
            Err(EngineError::InvalidPercentile {
                input: value.to_string(),
            })
        }
    }

    /// Nearest-Rank: `ceil(p / 100 * n) - 1`.
    ///
    /// Returns `None` for an empty sample set. For any `n >= 1` the result lies
    /// in `[0, n)`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::str::FromStr;
    /// use donation_analytics::Percentile;
    ///
    /// let median = Percentile::from_str("50").unwrap();
    /// assert_eq!(median.nearest_rank(1), Some(0));
    /// assert_eq!(median.nearest_rank(2), Some(0));
    /// assert_eq!(median.nearest_rank(4), Some(1));
    /// assert_eq!(median.nearest_rank(0), None);
    /// ```
    pub fn nearest_rank(&self, count: usize) -> Option<usize> {
        let position = self
            .0
            .checked_mul(Decimal::from(count))?
            .checked_div(Decimal::ONE_HUNDRED)?
            .ceil()
            .to_usize()?;
        position.checked_sub(1).filter(|&rank| rank < count)
    }
}

impl FromStr for Percentile {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let value = Decimal::from_str(trimmed).map_err(|_| EngineError::InvalidPercentile {
            input: trimmed.to_string(),
        })?;
        Percentile::new(value)
    }
}

impl fmt::Display for Percentile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reads the percentile from the first line of `reader`.
pub fn read_percentile<R: Read>(reader: R) -> Result<Percentile> {
    let mut line = String::new();
    BufReader::new(reader).read_line(&mut line)?;
    line.parse()
}
