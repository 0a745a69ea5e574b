//! Exact decimal contribution amounts.
//!
//! Wraps `rust_decimal` so running totals accumulate without binary
//! floating-point drift, while still exposing the two integer projections the
//! output format needs: round-to-nearest and truncation toward zero.

use crate::error::{EngineError, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt;
use std::str::FromStr;

/// A contribution amount or an accumulated sum of amounts.
///
/// # Examples
///
/// ```
/// use std::str::FromStr;
/// use donation_analytics::Amount;
///
/// let amount = Amount::from_str("250.50").unwrap();
/// assert_eq!(amount.round_to_integer().unwrap(), 251);
/// assert_eq!(amount.truncate_to_integer().unwrap(), 250);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

impl Amount {
    /// Zero value.
    pub const ZERO: Self = Amount(Decimal::ZERO);

    /// Returns `true` if the amount is below zero.
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Adds two amounts, failing instead of panicking when the sum leaves the
    /// `Decimal` range.
    pub fn checked_add(self, rhs: Self) -> Result<Self> {
        self.0
            .checked_add(rhs.0)
            .map(Amount)
            .ok_or_else(|| EngineError::AmountOverflow {
                value: format!("{} + {}", self.0, rhs.0),
            })
    }

    /// Rounds to the nearest integer. Ties go away from zero, so `2.5` becomes
    /// `3` and `-2.5` becomes `-3`.
    pub fn round_to_integer(&self) -> Result<i64> {
        let rounded = self
            .0
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        rounded.to_i64().ok_or_else(|| EngineError::AmountOverflow {
            value: self.0.to_string(),
        })
    }

    /// Drops the fractional part (truncation toward zero).
    pub fn truncate_to_integer(&self) -> Result<i64> {
        self.0.trunc().to_i64().ok_or_else(|| EngineError::AmountOverflow {
            value: self.0.to_string(),
        })
    }
}

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Amount(Decimal::from(value))
    }
}

impl FromStr for Amount {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Decimal::from_str(s.trim()).map(Amount)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
