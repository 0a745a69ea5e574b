//! Streaming repeat-donor aggregation engine.
//!
//! Consumes validated donor records one at a time. A record counts as a repeat
//! donation when the same donor (name and zip) was already seen in an earlier
//! calendar year. Each repeat donation is added to the aggregate for its
//! recipient, zip and year, and produces one [`RepeatDonorEvent`] carrying the
//! running percentile, total and count of that aggregate.

use crate::amount::Amount;
use crate::error::{EngineError, Result};
use crate::ostree::OrderStatisticTree;
use crate::percentile::Percentile;
use crate::record::DonorRecord;
use log::{debug, trace};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;

/// Donor identity: `name|zip5`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DonorKey {
    pub name: String,
    pub zip5: String,
}

/// Aggregation key: `committee_id|zip5|year`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    pub committee_id: String,
    pub zip5: String,
    pub year: i32,
}

impl GroupKey {
    pub fn new(committee_id: impl Into<String>, zip5: impl Into<String>, year: i32) -> Self {
        GroupKey {
            committee_id: committee_id.into(),
            zip5: zip5.into(),
            year,
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.committee_id, self.zip5, self.year)
    }
}

/// Running state of one group: total and every amount seen so far.
///
/// # Invariants
///
/// - `total` equals the sum of all values in `amounts`
/// - Both only grow; nothing is ever removed
#[derive(Debug, Clone, Default)]
pub struct GroupAggregate {
    total: Amount,
    amounts: OrderStatisticTree<Amount>,
}

impl GroupAggregate {
    /// Creates an empty aggregate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one contribution.
    ///
    /// The aggregate is left untouched when the new total, or either integer
    /// projection of the output line, would not fit.
    fn record(&mut self, amount: Amount) -> Result<()> {
        let total = self.total.checked_add(amount)?;
        total.truncate_to_integer()?;
        amount.round_to_integer()?;

        self.total = total;
        self.amounts.insert(amount);
        Ok(())
    }

    /// Sum of all contributions.
    pub fn total(&self) -> Amount {
        self.total
    }

    /// Number of contributions.
    pub fn count(&self) -> usize {
        self.amounts.len()
    }

    /// All contribution amounts, sorted.
    pub fn amounts(&self) -> &OrderStatisticTree<Amount> {
        &self.amounts
    }

    /// Nearest-rank percentile of the amounts collected so far.
    pub fn percentile(&self, percentile: Percentile) -> Result<Amount> {
        let count = self.count();
        let rank = percentile
            .nearest_rank(count)
            .ok_or_else(|| EngineError::PercentileRank {
                percentile: percentile.to_string(),
                count,
            })?;
        self.amounts.get_at(rank).copied()
    }
}

/// One output line: emitted for every repeat donation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepeatDonorEvent {
    pub group_key: GroupKey,
    /// Requested percentile, rounded to the nearest integer (ties away from zero)
    pub percentile_value: i64,
    /// Running total, truncated toward zero
    pub running_total: i64,
    pub sample_count: usize,
}

impl fmt::Display for RepeatDonorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}",
            self.group_key, self.percentile_value, self.running_total, self.sample_count
        )
    }
}

/// The aggregation engine.
///
/// Owns the first-seen year of every donor and the aggregate of every group.
/// Records must be fed in stream order: whether a record is a repeat donation
/// depends on everything processed before it.
#[derive(Debug, Default)]
pub struct AggregationEngine {
    /// Earliest year each donor has been seen in.
    first_seen: HashMap<DonorKey, i32>,

    /// Aggregates indexed by recipient, zip and year.
    groups: HashMap<GroupKey, GroupAggregate>,
}

impl AggregationEngine {
    /// Creates a new empty engine.
    pub fn new() -> Self {
        AggregationEngine {
            first_seen: HashMap::new(),
            groups: HashMap::new(),
        }
    }

    /// Processes one validated record.
    ///
    /// Returns `Ok(None)` when the record is not a repeat donation: either the
    /// donor is new, or the record's year is not later than the donor's
    /// earliest recorded year (which then becomes the record's year). Records
    /// that arrive out of order and turn out to be earlier than the first
    /// sighting are absorbed this way.
    ///
    /// A repeat donation leaves the donor's recorded year untouched, updates
    /// its group and returns the resulting event.
    pub fn process(
        &mut self,
        record: DonorRecord,
        percentile: Percentile,
    ) -> Result<Option<RepeatDonorEvent>> {
        let DonorRecord {
            committee_id,
            zip5,
            name,
            year,
            amount,
        } = record;

        let donor = DonorKey {
            name,
            zip5: zip5.clone(),
        };
        match self.first_seen.entry(donor) {
            Entry::Vacant(entry) => {
                trace!(
                    "First sighting of donor {}|{} in {}",
                    entry.key().name,
                    entry.key().zip5,
                    year
                );
                entry.insert(year);
                return Ok(None);
            }
            Entry::Occupied(mut entry) => {
                if *entry.get() >= year {
                    debug!(
                        "Donor {}|{} seen in {} (earliest so far {}), not a repeat",
                        entry.key().name,
                        entry.key().zip5,
                        year,
                        entry.get()
                    );
                    entry.insert(year);
                    return Ok(None);
                }
            }
        }

        let group_key = GroupKey {
            committee_id,
            zip5,
            year,
        };
        let aggregate = match self.groups.entry(group_key.clone()) {
            Entry::Occupied(entry) => {
                let aggregate = entry.into_mut();
                aggregate.record(amount)?;
                aggregate
            }
            Entry::Vacant(entry) => {
                let mut aggregate = GroupAggregate::new();
                aggregate.record(amount)?;
                debug!("New group {}", entry.key());
                entry.insert(aggregate)
            }
        };

        let value = aggregate.percentile(percentile)?;

        let event = RepeatDonorEvent {
            group_key,
            percentile_value: value.round_to_integer()?,
            running_total: aggregate.total().truncate_to_integer()?,
            sample_count: aggregate.count(),
        };
        trace!("Emitting {}", event);
        Ok(Some(event))
    }

    /// Earliest year recorded for a donor, if the donor has been seen.
    pub fn first_seen_year(&self, name: &str, zip5: &str) -> Option<i32> {
        let key = DonorKey {
            name: name.to_string(),
            zip5: zip5.to_string(),
        };
        self.first_seen.get(&key).copied()
    }

    /// Returns the aggregate of a group, if it has received a repeat donation.
    pub fn group(&self, key: &GroupKey) -> Option<&GroupAggregate> {
        self.groups.get(key)
    }

    /// Number of distinct donors seen.
    pub fn donor_count(&self) -> usize {
        self.first_seen.len()
    }

    /// Number of groups with at least one repeat donation.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}
