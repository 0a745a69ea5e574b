//! Contribution rows as read from the input file, and the validated donor
//! records handed to the engine.

use crate::amount::Amount;
use chrono::{Datelike, NaiveDate};
use csv::{ByteRecord, StringRecord};
use serde::Deserialize;
use std::borrow::Cow;
use std::str::FromStr;
use thiserror::Error;

/// Raw contribution row.
///
/// The input is headerless and `|`-delimited, so columns are matched by
/// position. Only the leading columns up to `OTHER_ID` are declared; anything
/// after them is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContributionRow {
    /// Recipient committee (`CMTE_ID`)
    pub cmte_id: String,
    pub amndt_ind: String,
    pub rpt_tp: String,
    pub transaction_pgi: String,
    pub image_num: String,
    pub transaction_tp: String,
    pub entity_tp: String,
    /// Donor name (`NAME`)
    pub name: String,
    pub city: String,
    pub state: String,
    /// Donor zip code, 5 or 9 digits (`ZIP_CODE`)
    pub zip_code: String,
    pub employer: String,
    pub occupation: String,
    /// `MMDDYYYY` (`TRANSACTION_DT`)
    pub transaction_dt: String,
    /// Contribution amount (`TRANSACTION_AMT`)
    pub transaction_amt: String,
    /// Non-empty for contributions made by other entities (`OTHER_ID`)
    pub other_id: String,
}

/// Why a row was not turned into a [`DonorRecord`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("contribution is from another entity (OTHER_ID {0:?})")]
    OtherEntity(String),

    #[error("missing committee id")]
    MissingCommittee,

    #[error("missing donor name")]
    MissingName,

    #[error("invalid amount {0:?}")]
    InvalidAmount(String),

    #[error("negative amount {0}")]
    NegativeAmount(Amount),

    #[error("invalid transaction date {0:?}")]
    InvalidDate(String),

    #[error("invalid zip code {0:?}")]
    InvalidZip(String),
}

impl ContributionRow {
    /// Decodes a raw row.
    ///
    /// Fields that are not valid UTF-8 are read as Latin-1, one character per
    /// byte, so a name spelled with the same bytes always decodes to the same
    /// string.
    pub fn from_byte_record(record: &ByteRecord) -> csv::Result<Self> {
        let fields: StringRecord = record.iter().map(decode_field).collect();
        fields.deserialize(None)
    }

    /// Validates the row and normalizes it into a [`DonorRecord`].
    ///
    /// The zip code is cut to its first five characters and only the year of
    /// the transaction date is kept.
    pub fn validate(&self) -> Result<DonorRecord, Rejection> {
        if !self.other_id.is_empty() {
            return Err(Rejection::OtherEntity(self.other_id.clone()));
        }
        if self.cmte_id.is_empty() {
            return Err(Rejection::MissingCommittee);
        }
        if self.name.is_empty() {
            return Err(Rejection::MissingName);
        }

        // `Decimal` accepts digit separators, the feed never uses them
        if self.transaction_amt.contains('_') {
            return Err(Rejection::InvalidAmount(self.transaction_amt.clone()));
        }
        let amount = Amount::from_str(&self.transaction_amt)
            .map_err(|_| Rejection::InvalidAmount(self.transaction_amt.clone()))?;
        if amount.is_negative() {
            return Err(Rejection::NegativeAmount(amount));
        }

        let year = parse_year(&self.transaction_dt)
            .ok_or_else(|| Rejection::InvalidDate(self.transaction_dt.clone()))?;

        let zip5 = self
            .zip_code
            .get(..5)
            .ok_or_else(|| Rejection::InvalidZip(self.zip_code.clone()))?;

        Ok(DonorRecord {
            committee_id: self.cmte_id.clone(),
            zip5: zip5.to_string(),
            name: self.name.clone(),
            year,
            amount,
        })
    }
}

fn decode_field(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(field) => Cow::Borrowed(field),
        Err(_) => Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect()),
    }
}

/// Year of an `MMDDYYYY` date, if it is a real calendar date.
fn parse_year(date: &str) -> Option<i32> {
    if date.len() != 8 || !date.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(date, "%m%d%Y")
        .ok()
        .map(|d| d.year())
}

/// A validated contribution, ready for the aggregation engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DonorRecord {
    pub committee_id: String,
    /// First five characters of the donor's zip code
    pub zip5: String,
    pub name: String,
    pub year: i32,
    pub amount: Amount,
}
