//! Semicolon-delimited measurement payloads
//!
//! Each row is `timestamp;executionTime;value`. Extra trailing fields are
//! ignored; missing ones take a default that the validator later judges.
//! A header row is recognised when its first field is not a timestamp, and
//! its names then pick the columns; all three must be named.

use crate::{IngestResult, ParseError};
use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, StringRecord, Trim};
use tscale_core::{parse_timestamp, Measurement};

/// Column positions for the three measurement fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Columns {
    timestamp: usize,
    execution_time: usize,
    value: usize,
}

impl Columns {
    const POSITIONAL: Columns = Columns {
        timestamp: 0,
        execution_time: 1,
        value: 2,
    };

    /// `Ok(None)` unless at least one known column name is present. A
    /// recognised header must name all three columns.
    fn from_header(header: &StringRecord, line: u64) -> Result<Option<Self>, ParseError> {
        let find = |names: &[&str]| {
            header
                .iter()
                .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
        };
        let timestamp = find(&["date", "timestamp"]);
        let execution_time = find(&["executiontime", "execution_time"]);
        let value = find(&["value"]);

        match (timestamp, execution_time, value) {
            (None, None, None) => Ok(None),
            (Some(timestamp), Some(execution_time), Some(value)) => Ok(Some(Columns {
                timestamp,
                execution_time,
                value,
            })),
            _ => {
                let missing: Vec<&str> = [
                    (timestamp, "Date"),
                    (execution_time, "ExecutionTime"),
                    (value, "Value"),
                ]
                .iter()
                .filter(|(col, _)| col.is_none())
                .map(|(_, name)| *name)
                .collect();
                Err(ParseError::Field {
                    line,
                    message: format!("header is missing column(s): {}", missing.join(", ")),
                })
            }
        }
    }
}

/// Parse a payload into measurements, in file order
pub fn parse_measurements(payload: &[u8]) -> IngestResult<Vec<Measurement>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(payload);

    let mut columns = Columns::POSITIONAL;
    let mut seen_header = false;
    let mut measurements = Vec::new();

    for (idx, result) in reader.records().enumerate() {
        let record = result.map_err(ParseError::Csv)?;
        let line = record.position().map_or(idx as u64 + 1, |p| p.line());

        if is_blank(&record) {
            continue;
        }
        if !seen_header && measurements.is_empty() && looks_like_header(&record) {
            if let Some(named) = Columns::from_header(&record, line)? {
                columns = named;
                seen_header = true;
                continue;
            }
        }

        measurements.push(parse_row(&record, columns, line)?);
    }

    Ok(measurements)
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(str::is_empty)
}

fn looks_like_header(record: &StringRecord) -> bool {
    record
        .get(0)
        .map_or(false, |first| parse_timestamp(first).is_err())
}

fn parse_row(record: &StringRecord, columns: Columns, line: u64) -> Result<Measurement, ParseError> {
    let field = |col: usize| record.get(col).filter(|s| !s.is_empty());

    let timestamp = match field(columns.timestamp) {
        Some(s) => parse_timestamp(s).map_err(|e| ParseError::Field {
            line,
            message: e.to_string(),
        })?,
        None => DateTime::<Utc>::MIN_UTC,
    };

    Ok(Measurement {
        timestamp,
        execution_time: parse_number(field(columns.execution_time), line, "executionTime")?,
        value: parse_number(field(columns.value), line, "value")?,
    })
}

fn parse_number(raw: Option<&str>, line: u64, name: &str) -> Result<f64, ParseError> {
    let Some(s) = raw else {
        return Ok(0.0);
    };
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ParseError::Field {
            line,
            message: format!("{name} '{s}' is not a finite number"),
        }),
    }
}
