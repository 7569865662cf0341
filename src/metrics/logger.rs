use crate::error::Result;
use crate::simulation::trace::CustomerRecord;
use csv::Writer;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes customer records as CSV rows, one per customer.
pub struct TraceLogger<W: Write> {
    writer: Writer<W>,
}

impl TraceLogger<File> {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let writer = Writer::from_path(path)?;
        Ok(Self { writer })
    }
}

impl<W: Write> TraceLogger<W> {
    pub fn from_writer(inner: W) -> Self {
        Self { writer: Writer::from_writer(inner) }
    }

    pub fn log(&mut self, record: &CustomerRecord) -> Result<()> {
        self.writer.serialize(record)?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn log_batch(&mut self, records: &[CustomerRecord]) -> Result<()> {
        for record in records {
            self.writer.serialize(record)?;
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer.into_inner().map_err(|e| e.into_error().into())
    }
}
