// 📥 Loader - delimited source text → raw rows → canonical records

use crate::error::Result;
use crate::record::{CanonicalRecord, RawRecord};
use crate::schema::{normalize, visible_columns};
use crate::source::Source;
use anyhow::Context;
use csv::{ReaderBuilder, Trim};
use log::{debug, info, warn};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Header row plus the rows parsed under it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRecord>,
}

/// Dataset - A fully normalized record set for one source
#[derive(Debug, Clone, Serialize)]
pub struct Dataset {
    pub source: Source,
    pub headers: Vec<String>,
    pub records: Vec<CanonicalRecord>,
}

impl Dataset {
    /// Parse and normalize the text of one source export
    pub fn from_text(source: Source, text: &str) -> Result<Self> {
        let table = parse_table(text)?;
        Ok(Self::from_table(source, table))
    }

    pub fn from_table(source: Source, table: RawTable) -> Self {
        let records: Vec<CanonicalRecord> = table
            .rows
            .into_iter()
            .enumerate()
            .map(|(index, raw)| normalize(source, raw, index))
            .collect();

        debug!("Normalized {} {} records", records.len(), source);

        Dataset {
            source,
            headers: table.headers,
            records,
        }
    }

    pub fn empty(source: Source) -> Self {
        Dataset {
            source,
            headers: Vec::new(),
            records: Vec::new(),
        }
    }

    /// Table columns after the per-source hidden list is applied
    pub fn visible_columns(&self) -> Vec<String> {
        visible_columns(self.source, &self.headers)
    }
}

/// Parse comma-delimited text whose first line is the header row.
///
/// Headers are trimmed, blank lines skipped and short rows kept (missing
/// cells are absent). Rows the CSV reader cannot decode are skipped.
pub fn parse_table(text: &str) -> Result<RawTable> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();

    for (line_num, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                // +2 because: 1-indexed + header row
                warn!("Skipping unreadable row {}: {}", line_num + 2, e);
                continue;
            }
        };

        // Whitespace-only line
        if record.len() == 1 && record.get(0).map_or(true, |v| v.trim().is_empty()) {
            continue;
        }

        let raw: RawRecord = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| (header.as_str(), value))
            .collect();

        rows.push(raw);
    }

    Ok(RawTable { headers, rows })
}

/// Path of a source's export inside `data_dir`
pub fn source_path(source: Source, data_dir: &Path) -> PathBuf {
    data_dir.join(source.file_name())
}

/// Read the raw export text for a source
pub fn read_source_text(source: Source, data_dir: &Path) -> anyhow::Result<String> {
    let path = source_path(source, data_dir);
    fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {} data from {}", source, path.display()))
}

/// Read and normalize a source export from disk
pub fn load_source(source: Source, data_dir: &Path) -> anyhow::Result<Dataset> {
    let text = read_source_text(source, data_dir)?;
    let dataset = Dataset::from_text(source, &text)
        .with_context(|| format!("Failed to parse {}", source.file_name()))?;

    info!(
        "Loaded {} records from {}",
        dataset.records.len(),
        source.file_name()
    );

    Ok(dataset)
}
