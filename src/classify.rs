//! Keyword-based row role classification.
//!
//! Subtotal, total and balance lines are recognised by substring match on the
//! lower-cased first cell. The match is a heuristic tuned per document family
//! through the keyword set; it never inspects the numeric cells.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::rectangularize::NormalizedTable;

pub const DEFAULT_EMPHASIS_KEYWORDS: &[&str] =
    &["balance", "comprehensive", "payment", "contribution", "sale"];

pub const STRICT_EMPHASIS_KEYWORDS: &[&str] = &["balance as at", "comprehensive income"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowRole {
    Header,
    Ordinary,
    Emphasis,
}

impl RowRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowRole::Header => "header",
            RowRole::Ordinary => "ordinary",
            RowRole::Emphasis => "emphasis",
        }
    }
}

impl fmt::Display for RowRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized table with one role per body row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedTable {
    pub table: NormalizedTable,
    pub roles: Vec<RowRole>,
}

impl ClassifiedTable {
    pub fn rows(&self) -> impl Iterator<Item = (&[String], RowRole)> {
        self.table
            .rows
            .iter()
            .map(Vec::as_slice)
            .zip(self.roles.iter().copied())
    }

    pub fn emphasis_count(&self) -> usize {
        self.roles
            .iter()
            .filter(|role| **role == RowRole::Emphasis)
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowClassifier {
    keywords: Vec<String>,
}

impl Default for RowClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_EMPHASIS_KEYWORDS.iter().copied())
    }
}

impl RowClassifier {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized = Vec::new();
        for keyword in keywords {
            let lowered = keyword.as_ref().trim().to_lowercase();
            if !lowered.is_empty() && !normalized.contains(&lowered) {
                normalized.push(lowered);
            }
        }
        Self {
            keywords: normalized,
        }
    }

    /// Narrow keyword set matching only opening/closing balance and
    /// comprehensive income lines.
    pub fn strict() -> Self {
        Self::new(STRICT_EMPHASIS_KEYWORDS.iter().copied())
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn classify_label(&self, label: &str) -> RowRole {
        let lowered = label.to_lowercase();
        if self
            .keywords
            .iter()
            .any(|keyword| lowered.contains(keyword.as_str()))
        {
            RowRole::Emphasis
        } else {
            RowRole::Ordinary
        }
    }

    /// Position 0 is the table header; every other row is decided by its
    /// first cell alone.
    pub fn classify(&self, position: usize, row: &[String]) -> RowRole {
        if position == 0 {
            return RowRole::Header;
        }
        let label = row.first().map(String::as_str).unwrap_or("");
        self.classify_label(label)
    }

    /// Roles for a header followed by its body rows.
    pub fn classify_table(&self, header: &[String], body: &[Vec<String>]) -> Vec<RowRole> {
        std::iter::once(self.classify(0, header))
            .chain(
                body.iter()
                    .enumerate()
                    .map(|(idx, row)| self.classify(idx + 1, row)),
            )
            .collect()
    }

    pub fn apply(&self, table: NormalizedTable) -> ClassifiedTable {
        let roles = table
            .rows
            .iter()
            .enumerate()
            .map(|(idx, row)| self.classify(idx + 1, row))
            .collect();
        ClassifiedTable { table, roles }
    }
}
