//! Table sources: where raw cell grids come from.
//!
//! Locating tables inside a document is done upstream; the pipeline only
//! needs, per 1-based page, the raw grids found there. Two sources ship with
//! the crate:
//!
//! - [`DocumentBundle`]: a JSON/YAML document listing pages and their tables,
//!   as written by an extraction step.
//! - [`CsvGridSource`]: one CSV/TSV file per page, each holding one table.

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result, anyhow, bail};
use encoding_rs::Encoding;
use log::debug;
use serde::Deserialize;

use crate::{
    io_utils,
    rectangularize::{RawRow, RawTable},
};

pub trait TableSource {
    /// Human readable origin, used in log messages.
    fn describe(&self) -> String;

    fn page_count(&self) -> usize;

    /// Tables on a 1-based page, in extraction order. Pages outside
    /// `1..=page_count()` yield nothing.
    fn tables(&self, page: usize) -> Vec<RawTable>;
}

fn page_slot<T>(pages: &[T], page: usize) -> Option<&T> {
    page.checked_sub(1).and_then(|idx| pages.get(idx))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BundleCell {
    Text(String),
    Integer(i64),
    Float(f64),
    Flag(bool),
}

impl BundleCell {
    fn into_text(self) -> String {
        match self {
            BundleCell::Text(text) => text,
            BundleCell::Integer(i) => i.to_string(),
            BundleCell::Float(f) => f.to_string(),
            BundleCell::Flag(b) => b.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct BundleTable {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    rows: Vec<Vec<Option<BundleCell>>>,
}

#[derive(Debug, Default, Deserialize)]
struct BundlePage {
    #[serde(default)]
    tables: Vec<BundleTable>,
}

#[derive(Debug, Default, Deserialize)]
struct BundleFile {
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    pages: Vec<BundlePage>,
}

/// Pages of extracted tables held in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "BundleFile")]
pub struct DocumentBundle {
    pub source: Option<String>,
    pages: Vec<Vec<RawTable>>,
}

impl From<BundleFile> for DocumentBundle {
    fn from(file: BundleFile) -> Self {
        let mut bundle = DocumentBundle::new(file.source);
        for page in file.pages {
            let tables = page
                .tables
                .into_iter()
                .map(|table| {
                    let rows = table
                        .rows
                        .into_iter()
                        .map(|row| {
                            row.into_iter()
                                .map(|cell| cell.map(BundleCell::into_text))
                                .collect::<RawRow>()
                        })
                        .collect();
                    (table.title, rows)
                })
                .collect();
            bundle.push_page(tables);
        }
        bundle
    }
}

impl DocumentBundle {
    pub fn new(source: Option<String>) -> Self {
        Self {
            source,
            pages: Vec::new(),
        }
    }

    /// Appends a page of `(title, rows)` tables and returns its page number.
    pub fn push_page(&mut self, tables: Vec<(Option<String>, Vec<RawRow>)>) -> usize {
        let page = self.pages.len() + 1;
        let tables = tables
            .into_iter()
            .enumerate()
            .map(|(index, (title, rows))| RawTable {
                page,
                index,
                title,
                rows,
            })
            .collect();
        self.pages.push(tables);
        page
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening table bundle {path:?}"))?;
        let reader = BufReader::new(file);
        let mut bundle: DocumentBundle = if has_extension(path, &["json"]) {
            serde_json::from_reader(reader).context("Parsing table bundle JSON")?
        } else {
            serde_yaml::from_reader(reader).context("Parsing table bundle YAML")?
        };
        if bundle.source.is_none() {
            bundle.source = Some(path.display().to_string());
        }
        debug!(
            "Loaded {} page(s) from bundle {:?}",
            bundle.pages.len(),
            path
        );
        Ok(bundle)
    }
}

impl TableSource for DocumentBundle {
    fn describe(&self) -> String {
        self.source
            .clone()
            .unwrap_or_else(|| "in-memory bundle".to_string())
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn tables(&self, page: usize) -> Vec<RawTable> {
        page_slot(&self.pages, page).cloned().unwrap_or_default()
    }
}

/// One table per file; file order defines page numbers.
#[derive(Debug, Clone, Default)]
pub struct CsvGridSource {
    files: Vec<String>,
    grids: Vec<Vec<RawRow>>,
}

impl CsvGridSource {
    pub fn load<P: AsRef<Path>>(
        paths: &[P],
        delimiter: Option<u8>,
        encoding: &'static Encoding,
    ) -> Result<Self> {
        let mut source = CsvGridSource::default();
        for path in paths {
            let path = path.as_ref();
            let delimiter = io_utils::resolve_input_delimiter(path, delimiter);
            let mut reader = io_utils::open_grid_reader_from_path(path, delimiter)?;
            let mut rows = Vec::new();
            for (row_idx, record) in reader.byte_records().enumerate() {
                let record =
                    record.with_context(|| format!("Reading row {} in {path:?}", row_idx + 1))?;
                let decoded = io_utils::decode_grid_record(&record, encoding)
                    .with_context(|| format!("Decoding row {} in {path:?}", row_idx + 1))?;
                rows.push(decoded);
            }
            debug!("Read {} raw row(s) from {:?}", rows.len(), path);
            source.files.push(path.display().to_string());
            source.grids.push(rows);
        }
        Ok(source)
    }
}

impl TableSource for CsvGridSource {
    fn describe(&self) -> String {
        self.files.join(", ")
    }

    fn page_count(&self) -> usize {
        self.grids.len()
    }

    fn tables(&self, page: usize) -> Vec<RawTable> {
        match page_slot(&self.grids, page) {
            Some(rows) if !rows.is_empty() => vec![RawTable {
                page,
                index: 0,
                title: self.files.get(page - 1).cloned(),
                rows: rows.clone(),
            }],
            _ => Vec::new(),
        }
    }
}

fn has_extension(path: &Path, candidates: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| candidates.iter().any(|c| ext.eq_ignore_ascii_case(c)))
}

pub fn is_bundle_path(path: &Path) -> bool {
    has_extension(path, &["json", "yaml", "yml"])
}

/// Opens a single bundle file, or treats every path as a CSV grid page.
pub fn load_source<P: AsRef<Path>>(
    paths: &[P],
    delimiter: Option<u8>,
    encoding: &'static Encoding,
) -> Result<Box<dyn TableSource>> {
    let bundles = paths
        .iter()
        .filter(|p| is_bundle_path(p.as_ref()))
        .count();
    match (paths.len(), bundles) {
        (0, _) => Err(anyhow!("At least one input must be provided")),
        (1, 1) => Ok(Box::new(DocumentBundle::load(paths[0].as_ref())?)),
        (_, 0) => Ok(Box::new(CsvGridSource::load(paths, delimiter, encoding)?)),
        _ => bail!("A table bundle must be the only input; found {bundles} bundle(s) among {} input(s)", paths.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::UTF_8;
    use tempfile::tempdir;

    #[test]
    fn bundle_numbers_pages_and_tables() {
        let json = r#"{
            "source": "annual-report",
            "pages": [
                {"tables": []},
                {"tables": [
                    {"title": "Equity", "rows": [["Item", 2024], ["Share capital", "50", null]]},
                    {"rows": [["A"]]}
                ]}
            ]
        }"#;
        let bundle: DocumentBundle = serde_json::from_str(json).expect("parse bundle");
        assert_eq!(bundle.page_count(), 2);
        assert!(bundle.tables(1).is_empty());
        assert!(bundle.tables(3).is_empty());
        assert!(bundle.tables(0).is_empty());

        let tables = bundle.tables(2);
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].page, 2);
        assert_eq!(tables[1].index, 1);
        assert_eq!(tables[0].title.as_deref(), Some("Equity"));
        assert_eq!(tables[0].rows[0][1].as_deref(), Some("2024"));
        assert_eq!(tables[0].rows[1][2], None);
    }

    #[test]
    fn yaml_bundle_loads_from_disk() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("tables.yaml");
        std::fs::write(
            &path,
            "pages:\n  - tables:\n      - rows:\n          - [Item, '2024']\n          - [Total, ~]\n",
        )
        .expect("write bundle");
        let bundle = DocumentBundle::load(&path).expect("load bundle");
        assert_eq!(bundle.page_count(), 1);
        assert_eq!(bundle.tables(1)[0].rows[1], vec![Some("Total".to_string()), None]);
        assert!(bundle.describe().ends_with("tables.yaml"));
    }

    #[test]
    fn csv_files_become_pages() {
        let dir = tempdir().expect("temp dir");
        let first = dir.path().join("p1.csv");
        let second = dir.path().join("p2.tsv");
        std::fs::write(&first, "Item,2024\nTotal,200\n").expect("write csv");
        std::fs::write(&second, "").expect("write tsv");
        let source = CsvGridSource::load(&[&first, &second], None, UTF_8).expect("load grids");
        assert_eq!(source.page_count(), 2);
        assert_eq!(source.tables(1)[0].rows.len(), 2);
        assert!(source.tables(2).is_empty());
    }

    #[test]
    fn load_source_rejects_mixed_inputs() {
        let paths = [Path::new("a.json"), Path::new("b.csv")];
        assert!(load_source(&paths, None, UTF_8).is_err());
        let empty: [&Path; 0] = [];
        assert!(load_source(&empty, None, UTF_8).is_err());
    }
}
