//! Feeding the engine: reading contribution rows and handing the valid ones
//! to either a direct or an offloaded handler.
//!
//! Both handlers give the same single-writer semantics. The direct handler
//! runs the engine on the caller's thread; the offloaded handler moves the
//! engine and the sink onto a dedicated worker fed through an unbounded FIFO
//! channel, so records are processed in exactly the order they were read.

use crate::engine::AggregationEngine;
use crate::error::{EngineError, Result};
use crate::percentile::Percentile;
use crate::record::{ContributionRow, DonorRecord};
use crate::sink::EventSink;
use crossbeam::channel::{unbounded, Receiver, Sender};
use csv::{ByteRecord, ReaderBuilder};
use log::{debug, info, trace, warn};
use std::io::Read;
use std::thread::{self, JoinHandle};

/// How records are handed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Process on the calling thread.
    Direct,
    /// Process on a dedicated worker thread.
    Offloaded,
}

/// Row counts for one pass over the input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// Rows read, readable or not.
    pub rows: usize,
    /// Rows handed to the engine.
    pub accepted: usize,
    /// Rows skipped as unreadable or invalid.
    pub rejected: usize,
}

/// Receives validated records in stream order.
pub trait RecordHandler {
    fn handle(&mut self, record: DonorRecord) -> Result<()>;
}

/// Reads `|`-delimited contribution rows and passes every valid one to
/// `handler`.
///
/// Invalid rows are logged and skipped. Fields that are not valid UTF-8 are
/// read as Latin-1 rather than dropping the row. Read errors and errors from
/// the handler stop the stream.
pub fn ingest<R: Read, H: RecordHandler>(reader: R, handler: &mut H) -> Result<IngestSummary> {
    let mut csv_reader = ReaderBuilder::new()
        .delimiter(b'|')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(reader);

    let mut raw = ByteRecord::new();
    let mut summary = IngestSummary::default();
    while csv_reader.read_byte_record(&mut raw)? {
        summary.rows += 1;
        let row_num = summary.rows;

        let row = match ContributionRow::from_byte_record(&raw) {
            Ok(row) => row,
            Err(e) => {
                warn!("Row {}: unreadable contribution: {}", row_num, e);
                summary.rejected += 1;
                continue;
            }
        };

        match row.validate() {
            Ok(record) => {
                summary.accepted += 1;
                handler.handle(record)?;
            }
            Err(reason) => {
                debug!("Row {}: skipped, {}", row_num, reason);
                summary.rejected += 1;
            }
        }
    }

    info!(
        "Read {} rows: {} accepted, {} rejected",
        summary.rows, summary.accepted, summary.rejected
    );
    Ok(summary)
}

/// Runs one record through the engine, forwarding any event to the sink.
fn dispatch<S: EventSink>(
    engine: &mut AggregationEngine,
    sink: &mut S,
    record: DonorRecord,
    percentile: Percentile,
) -> Result<()> {
    if let Some(event) = engine.process(record, percentile)? {
        sink.emit(&event)?;
    }
    Ok(())
}

/// Processes each record synchronously on the caller's thread.
pub struct DirectHandler<S> {
    engine: AggregationEngine,
    percentile: Percentile,
    sink: S,
}

impl<S: EventSink> DirectHandler<S> {
    pub fn new(percentile: Percentile, sink: S) -> Self {
        DirectHandler {
            engine: AggregationEngine::new(),
            percentile,
            sink,
        }
    }

    /// Read access to the engine state.
    pub fn engine(&self) -> &AggregationEngine {
        &self.engine
    }

    /// Flushes the sink and hands it back.
    pub fn finish(mut self) -> Result<S> {
        self.sink.flush()?;
        Ok(self.sink)
    }
}

impl<S: EventSink> RecordHandler for DirectHandler<S> {
    fn handle(&mut self, record: DonorRecord) -> Result<()> {
        dispatch(&mut self.engine, &mut self.sink, record, self.percentile)
    }
}

/// Queues records for a worker thread that owns the engine and the sink.
pub struct OffloadedHandler<S> {
    sender: Sender<DonorRecord>,
    worker: JoinHandle<Result<S>>,
}

impl<S: EventSink + Send + 'static> OffloadedHandler<S> {
    /// Starts the worker.
    pub fn spawn(percentile: Percentile, sink: S) -> Result<Self> {
        let (sender, receiver) = unbounded();
        let worker = thread::Builder::new()
            .name("aggregation-worker".to_string())
            .spawn(move || run_worker(receiver, percentile, sink))?;
        Ok(OffloadedHandler { sender, worker })
    }

    /// Closes the queue and waits until every queued record has been
    /// processed, then returns the flushed sink.
    ///
    /// An error raised on the worker is returned here.
    pub fn finish(self) -> Result<S> {
        drop(self.sender);
        match self.worker.join() {
            Ok(result) => result,
            Err(_) => Err(EngineError::WorkerPanicked),
        }
    }
}

impl<S> RecordHandler for OffloadedHandler<S> {
    fn handle(&mut self, record: DonorRecord) -> Result<()> {
        self.sender
            .send(record)
            .map_err(|_| EngineError::WorkerStopped)
    }
}

fn run_worker<S: EventSink>(
    receiver: Receiver<DonorRecord>,
    percentile: Percentile,
    mut sink: S,
) -> Result<S> {
    trace!("Aggregation worker started");
    let mut engine = AggregationEngine::new();
    let mut processed = 0usize;

    // Ends once the sender is dropped and the queue is empty.
    for record in receiver.iter() {
        dispatch(&mut engine, &mut sink, record, percentile)?;
        processed += 1;
    }

    sink.flush()?;
    trace!(
        "Aggregation worker drained {} records into {} groups",
        processed,
        engine.group_count()
    );
    Ok(sink)
}

/// Runs a whole input stream through the engine with the given strategy and
/// returns the flushed sink.
pub fn run<R, S>(
    strategy: Strategy,
    reader: R,
    percentile: Percentile,
    sink: S,
) -> Result<(IngestSummary, S)>
where
    R: Read,
    S: EventSink + Send + 'static,
{
    match strategy {
        Strategy::Direct => {
            let mut handler = DirectHandler::new(percentile, sink);
            let summary = ingest(reader, &mut handler)?;
            Ok((summary, handler.finish()?))
        }
        Strategy::Offloaded => {
            let mut handler = OffloadedHandler::spawn(percentile, sink)?;
            let ingested = ingest(reader, &mut handler);
            // Wait for the drain before looking at the ingestion result, so a
            // worker failure is reported instead of the closed channel.
            let sink = handler.finish()?;
            Ok((ingested?, sink))
        }
    }
}
