//! # Donation Analytics
//!
//! A streaming processor that finds repeat donors in a campaign contribution
//! feed and reports, after every repeat donation, the running percentile,
//! total and count of contributions for its recipient, zip code and year.
//!
//! ## Design Principles
//!
//! - **Order-statistics tree**: each group keeps its amounts in an AVL tree
//!   augmented with subtree sizes, so the k-th smallest amount is found in
//!   O(log n) after every insertion
//! - **Exact arithmetic**: amounts and totals are decimals via `rust_decimal`
//! - **Streaming processing**: rows are read and handled one at a time
//! - **Order sensitive**: repeat-donor detection depends on stream order, so
//!   records are always processed in the order they are read
//!
//! ## Example
//!
//! ```
//! use donation_analytics::{pipeline, Percentile, PipeWriter, Strategy};
//! use std::io::Cursor;
//! use std::str::FromStr;
//!
//! let input = "\
//! C01|N|M2|P|1|15|IND|DOE, JANE|X|CA|90210|E|O|01012016|40|
//! C01|N|M2|P|2|15|IND|DOE, JANE|X|CA|90210|E|O|01012017|60|
//! ";
//! let percentile = Percentile::from_str("30").unwrap();
//! let sink = PipeWriter::new(Vec::new());
//! let (_, sink) = pipeline::run(Strategy::Direct, Cursor::new(input), percentile, sink).unwrap();
//! let output = String::from_utf8(sink.into_inner().unwrap()).unwrap();
//! assert_eq!(output, "C01|90210|2017|60|60|1\n");
//! ```

pub mod amount;
pub mod config;
pub mod engine;
pub mod error;
pub mod ostree;
pub mod percentile;
pub mod pipeline;
pub mod record;
pub mod sink;

pub use amount::Amount;
pub use config::{Cli, Mode};
pub use engine::{AggregationEngine, GroupAggregate, GroupKey, RepeatDonorEvent};
pub use error::{EngineError, Result};
pub use ostree::OrderStatisticTree;
pub use percentile::{read_percentile, Percentile};
pub use pipeline::{DirectHandler, IngestSummary, OffloadedHandler, RecordHandler, Strategy};
pub use record::{ContributionRow, DonorRecord, Rejection};
pub use sink::{EventSink, PipeWriter};
