//! CSV encoding of the event log and the effectiveness table.
//!
//! Event log layout, one header row then one row per record:
//!
//!   Actor,Audience,infection_intervention,success,intervention_value,intervention_type,timestamp
//!
//! Flags are written as `1`/`0`. A missing `intervention_value` is an empty
//! field. Decoding is lenient about what other writers produce: flags may be
//! `1`/`0`, `1.0`/`0.0` or `True`/`False`, and `nan` counts as missing.
//! Columns are located by header name, so their order on input is free.

use chrono::NaiveDateTime;

use wmm_contracts::{
    error::{WmmError, WmmResult},
    record::{EventKind, EventLog, InteractionRecord, TIMESTAMP_FORMAT},
};
use wmm_outcome::EffectivenessTable;

/// Column names, in the order they are written.
pub const LOG_COLUMNS: [&str; 7] = [
    "Actor",
    "Audience",
    "infection_intervention",
    "success",
    "intervention_value",
    "intervention_type",
    "timestamp",
];

fn codec_err(reason: impl Into<String>) -> WmmError {
    WmmError::Codec {
        reason: reason.into(),
    }
}

// ── Event log ─────────────────────────────────────────────────────────────────

/// Serialize `log` to CSV bytes.
pub fn encode_log(log: &EventLog) -> WmmResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(LOG_COLUMNS)
        .map_err(|e| codec_err(format!("failed to write header: {e}")))?;

    for record in log {
        let value = record
            .intervention_value
            .map(|v| v.to_string())
            .unwrap_or_default();
        writer
            .write_record([
                record.actor.as_str(),
                record.audience.as_str(),
                flag(record.kind.as_flag() == 1),
                flag(record.success),
                value.as_str(),
                record.intervention_type.as_str(),
                record.timestamp_string().as_str(),
            ])
            .map_err(|e| codec_err(format!("failed to write row: {e}")))?;
    }

    writer
        .into_inner()
        .map_err(|e| codec_err(format!("failed to flush CSV: {e}")))
}

fn flag(set: bool) -> &'static str {
    if set {
        "1"
    } else {
        "0"
    }
}

/// Column positions of a log header.
struct LogHeader {
    positions: [usize; 7],
}

impl LogHeader {
    fn locate(headers: &csv::StringRecord) -> WmmResult<Self> {
        let mut positions = [0usize; 7];
        for (slot, name) in positions.iter_mut().zip(LOG_COLUMNS) {
            *slot = headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| codec_err(format!("event log is missing column '{name}'")))?;
        }
        Ok(Self { positions })
    }

    fn field<'r>(&self, row: &'r csv::StringRecord, column: usize) -> &'r str {
        row.get(self.positions[column]).unwrap_or("").trim()
    }
}

/// Parse CSV bytes into an `EventLog`. Empty input is an empty log.
pub fn decode_log(bytes: &[u8]) -> WmmResult<EventLog> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(EventLog::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);
    let headers = reader
        .headers()
        .map_err(|e| codec_err(format!("failed to read header: {e}")))?
        .clone();
    let header = LogHeader::locate(&headers)?;

    let mut log = EventLog::new();
    for (i, row) in reader.records().enumerate() {
        let row = row.map_err(|e| codec_err(format!("row {}: {e}", i + 1)))?;
        let line = i + 1;

        let kind = EventKind::from_flag(u8::from(parse_flag(header.field(&row, 2), line)?));
        let success = parse_flag(header.field(&row, 3), line)?;
        let intervention_value = parse_value(header.field(&row, 4), line)?;
        let timestamp = parse_timestamp(header.field(&row, 6), line)?;

        log.append(InteractionRecord {
            actor: header.field(&row, 0).to_string(),
            audience: header.field(&row, 1).to_string(),
            kind,
            success,
            intervention_value,
            intervention_type: header.field(&row, 5).to_string(),
            timestamp,
        });
    }
    Ok(log)
}

fn parse_flag(raw: &str, line: usize) -> WmmResult<bool> {
    match raw {
        "1" | "1.0" | "True" | "true" => Ok(true),
        "0" | "0.0" | "False" | "false" => Ok(false),
        other => Err(codec_err(format!("row {line}: invalid flag '{other}'"))),
    }
}

fn parse_value(raw: &str, line: usize) -> WmmResult<Option<f64>> {
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    raw.parse::<f64>()
        .map(Some)
        .map_err(|e| codec_err(format!("row {line}: invalid number '{raw}': {e}")))
}

fn parse_timestamp(raw: &str, line: usize) -> WmmResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map_err(|e| codec_err(format!("row {line}: invalid timestamp '{raw}': {e}")))
}

// ── Effectiveness table ───────────────────────────────────────────────────────

/// Parse the effectiveness table: one column per intervention type, one
/// observed score per cell. Empty and `nan` cells are missing.
pub fn decode_effectiveness_table(bytes: &[u8]) -> WmmResult<EffectivenessTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);
    let headers = reader
        .headers()
        .map_err(|e| codec_err(format!("failed to read effectiveness header: {e}")))?
        .clone();

    let mut columns: Vec<Vec<Option<f64>>> = vec![Vec::new(); headers.len()];
    for (i, row) in reader.records().enumerate() {
        let row = row.map_err(|e| codec_err(format!("effectiveness row {}: {e}", i + 1)))?;
        for (c, column) in columns.iter_mut().enumerate() {
            column.push(parse_value(row.get(c).unwrap_or("").trim(), i + 1)?);
        }
    }

    // Blank headers (a written-out row index) are dropped with their column.
    Ok(EffectivenessTable::from_columns(
        headers
            .iter()
            .zip(columns)
            .filter(|(h, _)| !h.trim().is_empty())
            .map(|(h, column)| (h.trim().to_string(), column)),
    ))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
