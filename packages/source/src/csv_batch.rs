//! CSV file batch source.
//!
//! Reads one CSV file (optionally gzip-compressed) per batch from a local
//! directory and returns every row as a [`serde_json::Value`] object keyed by
//! the column headers in the first row.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use crate::source_def::{Compression, SourceDefinition};
use crate::{BatchSource, RawBatch, SourceError};

/// Batch source backed by CSV files named by a [`SourceDefinition`]'s file
/// pattern.
#[derive(Debug, Clone)]
pub struct CsvBatchSource {
    dir: PathBuf,
    definition: SourceDefinition,
}

impl CsvBatchSource {
    /// Creates a source reading batch files from `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, definition: SourceDefinition) -> Self {
        Self {
            dir: dir.into(),
            definition,
        }
    }

    /// Returns the path a batch would be read from.
    #[must_use]
    pub fn batch_path(&self, batch_id: &str) -> PathBuf {
        self.dir.join(self.definition.file_name(batch_id))
    }

    fn is_gzipped(&self, path: &Path) -> bool {
        self.definition.compression == Compression::Gzip
            || path.extension().is_some_and(|ext| ext == "gz")
    }
}

impl BatchSource for CsvBatchSource {
    fn label(&self) -> &str {
        &self.definition.id
    }

    fn load(&self, batch_id: &str) -> Result<RawBatch, SourceError> {
        let path = self.batch_path(batch_id);

        if !path.is_file() {
            return Err(SourceError::MissingBatch {
                batch: batch_id.to_string(),
            });
        }

        log::debug!("[{}] Reading batch {batch_id} from {}", self.label(), path.display());

        let file = BufReader::new(File::open(&path)?);
        let reader: Box<dyn Read> = if self.is_gzipped(&path) {
            Box::new(flate2::read::GzDecoder::new(file))
        } else {
            Box::new(file)
        };

        let delimiter = self.definition.delimiter.map_or(b',', |c| {
            u8::try_from(c).unwrap_or_else(|_| {
                log::warn!("Non-ASCII delimiter {c:?}, falling back to ','");
                b','
            })
        });

        let (columns, records) = read_csv_records(reader, delimiter)?;

        log::info!(
            "[{}] Parsed {} records from batch {batch_id}",
            self.label(),
            records.len()
        );

        Ok(RawBatch {
            id: batch_id.to_string(),
            columns,
            records,
        })
    }
}

/// Parses CSV from any reader into header names and string-valued records.
///
/// Headers and values are trimmed. Short rows are padded with empty strings.
/// Invalid UTF-8 in a value is replaced with U+FFFD so only that row fails
/// to parse later, not the whole batch.
///
/// # Errors
///
/// Returns [`SourceError::Csv`] on malformed input or read failure.
pub fn read_csv_records<R: Read>(
    reader: R,
    delimiter: u8,
) -> Result<(Vec<String>, Vec<serde_json::Value>), SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_owned())
        .collect();

    let mut records: Vec<serde_json::Value> = Vec::new();

    for (row, result) in reader.byte_records().enumerate() {
        let record = result?;

        let mut map = serde_json::Map::new();
        for (i, header) in headers.iter().enumerate() {
            let bytes = record.get(i).unwrap_or_default();
            let value = std::str::from_utf8(bytes).map_or_else(
                |_| {
                    log::warn!("Invalid UTF-8 in column '{header}' of row {}", row + 1);
                    String::from_utf8_lossy(bytes).trim().to_owned()
                },
                |s| s.trim().to_owned(),
            );
            map.insert(header.clone(), serde_json::Value::String(value));
        }
        records.push(serde_json::Value::Object(map));
    }

    Ok((headers, records))
}
