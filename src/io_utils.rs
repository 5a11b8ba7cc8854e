//! I/O utilities for reading raw grids and writing record output.
//!
//! - **Delimiter resolution**: extension-based auto-detection (`.csv` → comma,
//!   `.tsv` → tab) with manual override support.
//! - **Encoding**: raw grid bytes are decoded via `encoding_rs`, defaulting
//!   to UTF-8.
//! - **Ragged input**: extracted grids rarely have a fixed width, so readers
//!   are always flexible and never treat the first line as headers.
//! - **stdin/stdout**: the `-` path convention routes through standard streams.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn resolve_output_delimiter(path: Option<&Path>, provided: Option<u8>) -> u8 {
    if let Some(delim) = provided {
        return delim;
    }
    match path.and_then(|p| p.extension()).and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    }
}

pub fn open_grid_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(false)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn open_grid_reader_from_path(
    path: &Path,
    delimiter: u8,
) -> Result<csv::Reader<Box<dyn Read>>> {
    let reader: Box<dyn Read> = if is_dash(path) {
        Box::new(std::io::stdin().lock())
    } else {
        Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Opening input file {path:?}"))?,
        ))
    };
    Ok(open_grid_reader(reader, delimiter))
}

pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(std::io::stdout()),
    })
}

pub fn open_csv_writer<W: Write>(writer: W, delimiter: u8) -> csv::Writer<W> {
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true);
    builder.from_writer(writer)
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

/// Decodes a grid record; empty fields become absent cells.
pub fn decode_grid_record(
    record: &csv::ByteRecord,
    encoding: &'static Encoding,
) -> Result<Vec<Option<String>>> {
    record
        .iter()
        .map(|field| {
            if field.is_empty() {
                Ok(None)
            } else {
                decode_bytes(field, encoding).map(Some)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiter_follows_extension() {
        assert_eq!(resolve_input_delimiter(Path::new("page.tsv"), None), b'\t');
        assert_eq!(resolve_input_delimiter(Path::new("page.csv"), None), b',');
        assert_eq!(resolve_input_delimiter(Path::new("page.tsv"), Some(b';')), b';');
        assert_eq!(
            resolve_output_delimiter(Some(Path::new("out.TSV")), None),
            b'\t'
        );
        assert_eq!(resolve_output_delimiter(None, None), b',');
    }

    #[test]
    fn unknown_encoding_is_rejected() {
        assert!(resolve_encoding(Some("not-an-encoding")).is_err());
        assert_eq!(resolve_encoding(Some("windows-1250")).unwrap().name(), "windows-1250");
    }

    #[test]
    fn grid_reader_accepts_ragged_rows() {
        let data = "Item,2023,2024\nTotal,,200\nShort\n";
        let mut reader = open_grid_reader(data.as_bytes(), b',');
        let rows = reader
            .byte_records()
            .map(|r| decode_grid_record(&r.unwrap(), UTF_8).unwrap())
            .collect::<Vec<_>>();
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[1],
            vec![Some("Total".to_string()), None, Some("200".to_string())]
        );
        assert_eq!(rows[2], vec![Some("Short".to_string())]);
    }

    #[test]
    fn decode_grid_record_uses_legacy_encoding() {
        let encoding = resolve_encoding(Some("windows-1250")).unwrap();
        let (bytes, _, _) = encoding.encode("Zysk należny");
        let record = csv::ByteRecord::from(vec![&bytes[..]]);
        let decoded = decode_grid_record(&record, encoding).unwrap();
        assert_eq!(decoded, vec![Some("Zysk należny".to_string())]);
    }
}
