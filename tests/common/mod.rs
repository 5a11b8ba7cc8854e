#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use statement_tables::rectangularize::RawRow;
use statement_tables::source::DocumentBundle;
use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Writes the three-page statement bundle used across CLI tests.
    pub fn write_statement_bundle(&self) -> PathBuf {
        self.write("statement.json", STATEMENT_BUNDLE_JSON)
    }
}

/// Page 1: equity movements; page 2: no tables; page 3: a two-period
/// balance table with a note column.
pub const STATEMENT_BUNDLE_JSON: &str = r#"{
  "source": "annual-report-2024",
  "pages": [
    {"tables": [
      {"title": "Statement of changes in equity", "rows": [
        ["Item", "2023", "2024"],
        ["Share capital", "(100)", "50"],
        ["Total", null, "200"],
        ["Total comprehensive income", "1 250", "\u2013"]
      ]}
    ]},
    {"tables": []},
    {"tables": [
      {"rows": [
        ["Item", "Note", "2023", "2024"],
        ["Balance as at 31 December 2023", "12", "1,000", "1,100"],
        ["Dividends\npaid", "", "(40)", "n/a", "extra"]
      ]}
    ]}
  ]
}"#;

pub fn raw(cells: &[Option<&str>]) -> RawRow {
    cells.iter().map(|c| c.map(str::to_string)).collect()
}

pub fn single_table_bundle(rows: Vec<RawRow>) -> DocumentBundle {
    let mut bundle = DocumentBundle::new(Some("fixture".to_string()));
    bundle.push_page(vec![(None, rows)]);
    bundle
}
