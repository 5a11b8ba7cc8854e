//! Row-width reconciliation for ragged extracted tables.
//!
//! The header row fixes the table width `W`; every body row is cleaned and
//! padded or truncated to exactly `W` cells. Rows that are blank after
//! cleaning are dropped.

use std::sync::OnceLock;

use log::debug;
use regex::Regex;

/// A row as produced by table extraction; `None` means no value was found.
pub type RawRow = Vec<Option<String>>;

/// A cleaned row whose length always equals the header width.
pub type NormalizedRow = Vec<String>;

/// One extracted table: `rows[0]` is the header, the rest is the body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    /// 1-based page the table was found on.
    pub page: usize,
    /// 0-based position of the table within its page.
    pub index: usize,
    pub title: Option<String>,
    pub rows: Vec<RawRow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableProvenance {
    pub page: usize,
    pub index: usize,
    /// 0-based position of the table among every table of the run.
    pub ordinal: usize,
    pub title: Option<String>,
}

impl TableProvenance {
    pub fn table_id(&self) -> String {
        format!("TABLE_{:03}", self.ordinal + 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedTable {
    pub provenance: TableProvenance,
    pub header: NormalizedRow,
    pub rows: Vec<NormalizedRow>,
    pub width_mismatches: usize,
}

impl NormalizedTable {
    pub fn width(&self) -> usize {
        self.header.len()
    }
}

/// Cleans a raw table. Returns `None` when the header is blank or no body
/// row survives cleaning.
pub fn normalize_table(raw: &RawTable, ordinal: usize) -> Option<NormalizedTable> {
    let (header, body) = raw.rows.split_first()?;
    let rectangularizer = Rectangularizer::from_header(header)?;
    let result = rectangularizer.normalize_rows(body);
    if result.rows.is_empty() {
        return None;
    }
    Some(NormalizedTable {
        provenance: TableProvenance {
            page: raw.page,
            index: raw.index,
            ordinal,
            title: raw.title.clone(),
        },
        header: rectangularizer.into_header(),
        rows: result.rows,
        width_mismatches: result.width_mismatches,
    })
}

fn line_break_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[ \t]*[\r\n]+[ \t]*").expect("valid line break pattern"))
}

/// Trims a cell and folds embedded line breaks into single spaces.
pub fn clean_cell(cell: Option<&str>) -> String {
    match cell {
        None => String::new(),
        Some(text) => line_break_pattern()
            .replace_all(text, " ")
            .trim()
            .to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct Rectangularizer {
    header: NormalizedRow,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RectangularRows {
    pub rows: Vec<NormalizedRow>,
    /// Body rows whose raw width differed from the header width.
    pub width_mismatches: usize,
    /// Body rows dropped because every cell was blank.
    pub blank_rows: usize,
}

impl Rectangularizer {
    /// Returns `None` when the header has no cells or only blank ones.
    pub fn from_header(header: &[Option<String>]) -> Option<Self> {
        let cleaned = header
            .iter()
            .map(|cell| clean_cell(cell.as_deref()))
            .collect::<Vec<_>>();
        if cleaned.iter().all(|cell| cell.is_empty()) {
            return None;
        }
        Some(Self { header: cleaned })
    }

    pub fn width(&self) -> usize {
        self.header.len()
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn into_header(self) -> NormalizedRow {
        self.header
    }

    /// Cleans a single row to the header width. Returns `None` for blank rows.
    pub fn normalize_row(&self, row: &[Option<String>]) -> Option<NormalizedRow> {
        let width = self.width();
        let mut cleaned = row
            .iter()
            .take(width)
            .map(|cell| clean_cell(cell.as_deref()))
            .collect::<Vec<_>>();
        if cleaned.iter().all(|cell| cell.is_empty()) {
            return None;
        }
        cleaned.resize(width, String::new());
        Some(cleaned)
    }

    pub fn normalize_rows<'a, I>(&self, rows: I) -> RectangularRows
    where
        I: IntoIterator<Item = &'a RawRow>,
    {
        let width = self.width();
        let mut result = RectangularRows::default();
        for (idx, row) in rows.into_iter().enumerate() {
            match self.normalize_row(row) {
                Some(normalized) => {
                    if row.len() != width {
                        debug!(
                            "Row {} has {} cell(s); {} to header width {}",
                            idx + 1,
                            row.len(),
                            if row.len() < width { "padded" } else { "truncated" },
                            width
                        );
                        result.width_mismatches += 1;
                    }
                    result.rows.push(normalized);
                }
                None => result.blank_rows += 1,
            }
        }
        result
    }
}
