//! Corpus ingestion
//!
//! Reads one column of a CSV source into clean [`TextRecord`]s. The first row is
//! always treated as a header and skipped. Values that are missing (short rows
//! or one of the [`MISSING_MARKERS`]), not valid UTF-8, or empty after trimming
//! are dropped.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Cell contents that spreadsheet and dataframe exports write for a missing value
///
/// A field is missing only when it matches one of these exactly, untrimmed.
pub const MISSING_MARKERS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// A single passage of corpus text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRecord {
    text: String,
}

impl TextRecord {
    /// Create a record from raw text
    ///
    /// Returns `None` when the text is empty after trimming.
    pub fn new(text: impl AsRef<str>) -> Option<Self> {
        let trimmed = text.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self {
                text: trimmed.to_string(),
            })
        }
    }

    /// The trimmed passage text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Consume the record, returning its text
    pub fn into_text(self) -> String {
        self.text
    }
}

/// Counters collected while reading a source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Data rows seen (header excluded)
    pub rows: usize,
    /// Rows that produced a record
    pub kept: usize,
    /// Rows whose value was missing, non-textual or blank
    pub dropped: usize,
}

/// Extracts a text column from a tabular source
#[derive(Debug, Clone, Copy)]
pub struct CorpusIngestor {
    column: usize,
}

impl CorpusIngestor {
    /// Create an ingestor for the given zero-based column
    pub fn new(column: usize) -> Self {
        Self { column }
    }

    /// Read records from a CSV file
    pub fn read_path(&self, path: impl AsRef<Path>) -> Result<Vec<TextRecord>> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            debug!(path = %path.display(), error = %e, "failed to open source");
            Error::SourceNotFound {
                path: path.to_path_buf(),
            }
        })?;

        info!(path = %path.display(), column = self.column, "Reading corpus");
        self.read_from(file)
    }

    /// Read records from any CSV reader
    pub fn read_from<R: Read>(&self, reader: R) -> Result<Vec<TextRecord>> {
        self.read_with_stats(reader).map(|(records, _)| records)
    }

    /// Read records and report how many rows were kept or dropped
    pub fn read_with_stats<R: Read>(&self, reader: R) -> Result<(Vec<TextRecord>, IngestStats)> {
        let mut csv = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut width = 0;
        let mut values: Vec<Option<TextRecord>> = Vec::new();

        for (row, result) in csv.byte_records().enumerate() {
            let record = result?;
            width = width.max(record.len());
            if row == 0 {
                continue;
            }

            let value = record
                .get(self.column)
                .and_then(|field| std::str::from_utf8(field).ok())
                .filter(|field| !MISSING_MARKERS.contains(field))
                .and_then(TextRecord::new);
            values.push(value);
        }

        // The column has to exist somewhere in the table; a short row only
        // means that row's value is missing.
        if self.column >= width {
            return Err(Error::ColumnNotFound {
                column: self.column,
                width,
            });
        }

        let rows = values.len();
        let records: Vec<TextRecord> = values.into_iter().flatten().collect();
        let stats = IngestStats {
            rows,
            kept: records.len(),
            dropped: rows - records.len(),
        };

        info!(
            rows = stats.rows,
            kept = stats.kept,
            dropped = stats.dropped,
            "Found {} text chunks in column {}",
            stats.kept,
            self.column
        );

        Ok((records, stats))
    }
}
