//! Output sinks for repeat-donor events.

use crate::engine::RepeatDonorEvent;
use crate::error::{EngineError, Result};
use csv::{QuoteStyle, WriterBuilder};
use std::io::Write;

/// Destination for events produced by the engine.
pub trait EventSink {
    /// Records one event.
    fn emit(&mut self, event: &RepeatDonorEvent) -> Result<()>;

    /// Pushes buffered output to the underlying resource.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Collects events in memory.
impl EventSink for Vec<RepeatDonorEvent> {
    fn emit(&mut self, event: &RepeatDonorEvent) -> Result<()> {
        self.push(event.clone());
        Ok(())
    }
}

/// Writes events as `committee_id|zip5|year|percentile|total|count` lines.
pub struct PipeWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> PipeWriter<W> {
    /// Wraps a writer. Output is buffered until [`EventSink::flush`].
    pub fn new(writer: W) -> Self {
        let writer = WriterBuilder::new()
            .delimiter(b'|')
            .has_headers(false)
            .quote_style(QuoteStyle::Never)
            .from_writer(writer);
        PipeWriter { writer }
    }

    /// Flushes and returns the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| EngineError::Io(e.into_error()))
    }
}

impl<W: Write> EventSink for PipeWriter<W> {
    fn emit(&mut self, event: &RepeatDonorEvent) -> Result<()> {
        let key = &event.group_key;
        let year = key.year.to_string();
        let percentile = event.percentile_value.to_string();
        let total = event.running_total.to_string();
        let count = event.sample_count.to_string();
        self.writer.write_record([
            key.committee_id.as_str(),
            key.zip5.as_str(),
            year.as_str(),
            percentile.as_str(),
            total.as_str(),
            count.as_str(),
        ])?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
