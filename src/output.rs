//! Frequency tables
//!
//! Writes one record per counter, identifier first and then the selected
//! measures in order, as CSV or JSON.

use crate::counter::Counter;
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use std::io::{self, Write};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to write JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to write output: {0}")]
    Io(#[from] io::Error),
}

/// Field/value pairs serialized as an object in field order
struct Record<'a>(&'a [(String, String)]);

impl Serialize for Record<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (field, value) in self.0 {
            map.serialize_entry(field, value)?;
        }
        map.end()
    }
}

#[derive(Serialize)]
struct Files<'a> {
    #[serde(rename = "Files")]
    files: Vec<Record<'a>>,
}

/// CSV with a header row taken from the first record
pub fn write_csv<W: Write>(out: W, records: &[Vec<(String, String)>]) -> Result<(), OutputError> {
    let mut writer = csv::Writer::from_writer(out);
    if let Some(first) = records.first() {
        writer.write_record(first.iter().map(|(field, _)| field))?;
    }
    for record in records {
        writer.write_record(record.iter().map(|(_, value)| value))?;
    }
    writer.flush()?;
    Ok(())
}

/// A JSON array of objects, or `{"Files": [...]}` when `wrap` is set
pub fn write_json<W: Write>(
    mut out: W,
    records: &[Vec<(String, String)>],
    wrap: bool,
) -> Result<(), OutputError> {
    let records: Vec<Record> = records.iter().map(|r| Record(r)).collect();
    if wrap {
        serde_json::to_writer_pretty(&mut out, &Files { files: records })?;
    } else {
        serde_json::to_writer_pretty(&mut out, &records)?;
    }
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

pub fn write_counters<W: Write>(
    out: W,
    counters: &[Counter],
    format: OutputFormat,
    precision: u32,
) -> Result<(), OutputError> {
    let records: Vec<_> = counters.iter().map(|c| c.all_values(precision)).collect();
    match format {
        OutputFormat::Csv => write_csv(out, &records),
        OutputFormat::Json => write_json(out, &records, true),
    }
}
