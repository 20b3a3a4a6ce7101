use crate::error::SdlogError;
use crate::sample::{SampleField, SampleRecord, TICKS_LABEL};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Append-only destination for decoded sample records.
pub trait RecordSink {
    fn append(&mut self, record: &SampleRecord) -> Result<(), SdlogError>;
    /// Push buffered records to durable storage.
    fn flush(&mut self) -> Result<(), SdlogError>;
}

/// CSV file sink with the fixed 15-column layout (`Ticks` + the channel
/// labels).
///
/// The header is written only when the destination is empty, so repeated
/// downloads can append to one log without duplicating it. Buffered rows
/// are flushed on drop as well as on [`RecordSink::flush`].
pub struct CsvSink {
    writer: csv::Writer<File>,
}

impl CsvSink {
    pub fn open(path: &Path) -> Result<Self, SdlogError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let needs_header = file.metadata()?.len() == 0;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if needs_header {
            writer.write_record(Self::header())?;
        }
        Ok(Self { writer })
    }

    fn header() -> Vec<String> {
        let mut columns = Vec::with_capacity(1 + SampleField::ALL.len());
        columns.push(TICKS_LABEL.to_string());
        columns.extend(SampleField::ALL.iter().map(|field| field.to_string()));
        columns
    }
}

impl RecordSink for CsvSink {
    fn append(&mut self, record: &SampleRecord) -> Result<(), SdlogError> {
        let mut row = Vec::with_capacity(1 + record.values.len());
        row.push(record.ticks.to_string());
        row.extend(record.values.iter().map(|value| value.to_string()));
        self.writer.write_record(&row)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SdlogError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// JSON-lines sink: one labeled object per record.
pub struct JsonlSink {
    writer: BufWriter<File>,
}

impl JsonlSink {
    pub fn open(path: &Path) -> Result<Self, SdlogError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl RecordSink for JsonlSink {
    fn append(&mut self, record: &SampleRecord) -> Result<(), SdlogError> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SdlogError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// In-memory sink for tests and embedding.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<SampleRecord>,
}

impl RecordSink for MemorySink {
    fn append(&mut self, record: &SampleRecord) -> Result<(), SdlogError> {
        self.records.push(*record);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SdlogError> {
        Ok(())
    }
}
