//! Record sinks: persisted forms of the pipeline output.
//!
//! Sinks receive the standard column order alongside the records and are
//! responsible only for the file format. Styling and layout of spreadsheets
//! live outside this crate.

use std::io::Write;

use anyhow::{Context, Result};
use serde_json::{Map, Number, Value as JsonValue};

use crate::{
    classify::{ClassifiedTable, RowRole},
    io_utils,
    mapper::CanonicalRecord,
    numeric::{CellValue, canonicalize},
};

pub const ROLE_COLUMN: &str = "row_role";

pub trait RecordSink {
    fn write_records(&mut self, columns: &[String], records: &[CanonicalRecord]) -> Result<()>;
}

pub struct CsvRecordSink<W: Write> {
    writer: csv::Writer<W>,
    include_role: bool,
}

impl<W: Write> CsvRecordSink<W> {
    pub fn new(writer: W, delimiter: u8, include_role: bool) -> Self {
        Self {
            writer: io_utils::open_csv_writer(writer, delimiter),
            include_role,
        }
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|err| anyhow::anyhow!("Flushing CSV output: {}", err.error()))
    }
}

impl<W: Write> RecordSink for CsvRecordSink<W> {
    fn write_records(&mut self, columns: &[String], records: &[CanonicalRecord]) -> Result<()> {
        let mut header = columns.to_vec();
        if self.include_role {
            header.push(ROLE_COLUMN.to_string());
        }
        self.writer
            .write_record(&header)
            .context("Writing output headers")?;
        for record in records {
            let mut fields = record
                .cells()
                .iter()
                .map(CellValue::as_display)
                .collect::<Vec<_>>();
            if self.include_role {
                fields.push(record.role.to_string());
            }
            self.writer
                .write_record(&fields)
                .with_context(|| format!("Writing record {}", record.primary_key))?;
        }
        self.writer.flush().context("Flushing CSV output")?;
        Ok(())
    }
}

pub struct JsonRecordSink<W: Write> {
    writer: W,
    include_role: bool,
}

impl<W: Write> JsonRecordSink<W> {
    pub fn new(writer: W, include_role: bool) -> Self {
        Self {
            writer,
            include_role,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn cell_to_json(cell: CellValue) -> JsonValue {
    match cell {
        CellValue::Null => JsonValue::Null,
        CellValue::Text(text) => JsonValue::String(text),
        CellValue::Number(n) => {
            if n.fract() == 0.0 && n.abs() < 9.0e15 {
                JsonValue::Number(Number::from(n as i64))
            } else {
                Number::from_f64(n)
                    .map(JsonValue::Number)
                    .unwrap_or(JsonValue::Null)
            }
        }
    }
}

impl<W: Write> RecordSink for JsonRecordSink<W> {
    fn write_records(&mut self, columns: &[String], records: &[CanonicalRecord]) -> Result<()> {
        let rows = records
            .iter()
            .map(|record| {
                let mut object = Map::with_capacity(columns.len() + 1);
                for (column, cell) in columns.iter().zip(record.cells()) {
                    object.insert(column.clone(), cell_to_json(cell));
                }
                if self.include_role {
                    object.insert(
                        ROLE_COLUMN.to_string(),
                        JsonValue::String(record.role.to_string()),
                    );
                }
                JsonValue::Object(object)
            })
            .collect::<Vec<_>>();
        serde_json::to_writer_pretty(&mut self.writer, &rows).context("Writing JSON output")?;
        self.writer.write_all(b"\n")?;
        self.writer.flush().context("Flushing JSON output")?;
        Ok(())
    }
}

/// Header for [`write_normalized_tables`]: provenance columns followed by
/// positional cell columns sized to the widest table.
pub fn normalized_headers(tables: &[ClassifiedTable]) -> Vec<String> {
    let width = tables.iter().map(|t| t.table.width()).max().unwrap_or(0);
    let mut headers = vec![
        "page".to_string(),
        "table".to_string(),
        ROLE_COLUMN.to_string(),
    ];
    headers.extend((1..=width).map(|idx| format!("col_{idx}")));
    headers
}

/// Flattens normalized tables: each table contributes its header row and its
/// body rows, value cells canonicalized and the first cell kept as text.
pub fn normalized_rows(tables: &[ClassifiedTable]) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    for classified in tables {
        let table = &classified.table;
        let table_id = table.provenance.table_id();
        let page = table.provenance.page.to_string();
        let mut header = vec![page.clone(), table_id.clone(), RowRole::Header.to_string()];
        header.extend(table.header.iter().cloned());
        rows.push(header);
        for (row, role) in classified.rows() {
            let mut line = vec![page.clone(), table_id.clone(), role.to_string()];
            for (idx, cell) in row.iter().enumerate() {
                if idx == 0 {
                    line.push(cell.clone());
                } else {
                    line.push(canonicalize(Some(cell.as_str())).as_display());
                }
            }
            rows.push(line);
        }
    }
    rows
}

pub fn write_normalized_tables<W: Write>(
    writer: W,
    delimiter: u8,
    tables: &[ClassifiedTable],
) -> Result<()> {
    let headers = normalized_headers(tables);
    let width = headers.len();
    let mut writer = io_utils::open_csv_writer(writer, delimiter);
    writer
        .write_record(&headers)
        .context("Writing output headers")?;
    for mut row in normalized_rows(tables) {
        row.resize(width, String::new());
        writer.write_record(&row).context("Writing normalized row")?;
    }
    writer.flush().context("Flushing CSV output")?;
    Ok(())
}
