//! Record sinks
//!
//! Completed records go to a [`RecordSink`] owned by the driver. Records keep
//! discovery order. Both file sinks produce a single JSON array; the
//! streaming sink keeps the file a valid array after every emitted record.

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::domain::Record;

/// The output artifact cannot be written. Fatal for the run.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Output I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Record serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Sink already finished")]
    AlreadyFinished,
}

/// Destination of completed records
pub trait RecordSink {
    /// Append one record
    fn emit(&mut self, record: Record) -> Result<(), SinkError>;

    /// Complete the output; returns the number of records written
    fn finish(&mut self) -> Result<usize, SinkError>;
}

impl<T: RecordSink + ?Sized> RecordSink for Box<T> {
    fn emit(&mut self, record: Record) -> Result<(), SinkError> {
        (**self).emit(record)
    }

    fn finish(&mut self) -> Result<usize, SinkError> {
        (**self).finish()
    }
}

/// Keeps records in memory, in emit order
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Vec<Record>,
    finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl RecordSink for MemorySink {
    fn emit(&mut self, record: Record) -> Result<(), SinkError> {
        if self.finished {
            return Err(SinkError::AlreadyFinished);
        }
        self.records.push(record);
        Ok(())
    }

    fn finish(&mut self) -> Result<usize, SinkError> {
        if self.finished {
            return Err(SinkError::AlreadyFinished);
        }
        self.finished = true;
        Ok(self.records.len())
    }
}

/// Collects everything, then writes the whole array on `finish`
pub struct JsonArraySink<W: Write> {
    writer: Option<W>,
    records: Vec<Record>,
}

impl JsonArraySink<BufWriter<File>> {
    pub fn create(path: &Path) -> Result<Self, SinkError> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> JsonArraySink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Some(writer),
            records: Vec::new(),
        }
    }
}

impl<W: Write> RecordSink for JsonArraySink<W> {
    fn emit(&mut self, record: Record) -> Result<(), SinkError> {
        if self.writer.is_none() {
            return Err(SinkError::AlreadyFinished);
        }
        self.records.push(record);
        Ok(())
    }

    fn finish(&mut self) -> Result<usize, SinkError> {
        let mut writer = self.writer.take().ok_or(SinkError::AlreadyFinished)?;
        serde_json::to_writer_pretty(&mut writer, &self.records)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        debug!(records = self.records.len(), "Wrote JSON array");
        Ok(self.records.len())
    }
}

/// Trailer rewritten after every record
const TRAILER: &[u8] = b"\n]\n";

/// Appends each record in place, rewriting the closing bracket
///
/// The writer always holds `[` + records + `\n]\n`: each emit seeks back over
/// the trailer and writes `,\n{record}\n]\n`, then flushes.
pub struct StreamingJsonSink<W: Write + Seek> {
    writer: W,
    count: usize,
    finished: bool,
}

impl StreamingJsonSink<BufWriter<File>> {
    pub fn create(path: &Path) -> Result<Self, SinkError> {
        Self::new(BufWriter::new(File::create(path)?))
    }
}

impl<W: Write + Seek> StreamingJsonSink<W> {
    /// Start an empty array on `writer`
    pub fn new(mut writer: W) -> Result<Self, SinkError> {
        writer.write_all(b"[")?;
        writer.write_all(TRAILER)?;
        writer.flush()?;
        Ok(Self {
            writer,
            count: 0,
            finished: false,
        })
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Seek> RecordSink for StreamingJsonSink<W> {
    fn emit(&mut self, record: Record) -> Result<(), SinkError> {
        if self.finished {
            return Err(SinkError::AlreadyFinished);
        }

        let json = serde_json::to_vec_pretty(&record)?;
        let separator: &[u8] = if self.count == 0 { b"\n" } else { b",\n" };

        #[allow(clippy::cast_possible_wrap)]
        let rewind = SeekFrom::End(-(TRAILER.len() as i64));
        self.writer.seek(rewind)?;
        self.writer.write_all(separator)?;
        self.writer.write_all(&json)?;
        self.writer.write_all(TRAILER)?;
        self.writer.flush()?;

        self.count += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<usize, SinkError> {
        if self.finished {
            return Err(SinkError::AlreadyFinished);
        }
        self.writer.flush()?;
        self.finished = true;
        debug!(records = self.count, "Closed streamed JSON array");
        Ok(self.count)
    }
}
