//! Run orchestration: raw tables → normalized rows → classified rows →
//! canonical records.
//!
//! A run walks the requested pages in order and every table on a page in
//! extraction order. It is synchronous and single threaded; the only state
//! carried across tables is the [`KeySequence`] and the table ordinal, both
//! created fresh for each run.

use itertools::Itertools;
use log::{debug, info, warn};

use crate::{
    classify::{ClassifiedTable, RowClassifier},
    config::PipelineConfig,
    error::{DiagnosticKind, Diagnostics, PipelineError},
    mapper::{CanonicalRecord, KeySequence, SchemaMapper},
    rectangularize::normalize_table,
    source::TableSource,
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UnitSelection {
    #[default]
    All,
    /// 1-based page numbers, processed in the given order. Repeated pages
    /// are processed once, at their first position.
    Pages(Vec<usize>),
}

impl UnitSelection {
    fn resolve(&self, page_count: usize) -> Result<Vec<usize>, PipelineError> {
        match self {
            UnitSelection::All => Ok((1..=page_count).collect()),
            UnitSelection::Pages(pages) => {
                for &page in pages {
                    if page == 0 || page > page_count {
                        return Err(PipelineError::SourceUnavailable {
                            page,
                            pages: page_count,
                        });
                    }
                }
                let unique = pages.iter().copied().unique().collect::<Vec<_>>();
                if unique.len() < pages.len() {
                    debug!(
                        "Ignoring {} repeated page request(s)",
                        pages.len() - unique.len()
                    );
                }
                Ok(unique)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStatus {
    Extracted,
    NoTableFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitOutcome {
    pub page: usize,
    pub tables: usize,
    pub records: usize,
    pub status: UnitStatus,
}

impl UnitOutcome {
    /// The recoverable error for units that produced nothing.
    pub fn error(&self) -> Option<PipelineError> {
        match self.status {
            UnitStatus::NoTableFound => Some(PipelineError::NoTableFound { page: self.page }),
            UnitStatus::Extracted => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub records: Vec<CanonicalRecord>,
    pub units: Vec<UnitOutcome>,
    pub diagnostics: Diagnostics,
}

impl RunReport {
    pub fn missing_units(&self) -> Vec<usize> {
        self.units
            .iter()
            .filter(|u| u.status == UnitStatus::NoTableFound)
            .map(|u| u.page)
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct NormalizedUnits {
    pub tables: Vec<ClassifiedTable>,
    pub units: Vec<UnitOutcome>,
    pub diagnostics: Diagnostics,
}

pub struct Pipeline {
    config: PipelineConfig,
    classifier: RowClassifier,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let classifier = config.classifier();
        Ok(Self { config, classifier })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn classifier(&self) -> &RowClassifier {
        &self.classifier
    }

    /// Rectangularizes and classifies every table of the selected pages.
    pub fn normalize(
        &self,
        source: &dyn TableSource,
        selection: &UnitSelection,
    ) -> Result<NormalizedUnits, PipelineError> {
        let pages = selection.resolve(source.page_count())?;
        let mut result = NormalizedUnits::default();
        for page in pages {
            let raw_tables = source.tables(page);
            let mut found = 0usize;
            for raw in &raw_tables {
                match normalize_table(raw, result.tables.len()) {
                    Some(table) => {
                        result
                            .diagnostics
                            .add(DiagnosticKind::WidthMismatch, table.width_mismatches);
                        result.tables.push(self.classifier.apply(table));
                        found += 1;
                    }
                    None => result.diagnostics.tables_skipped += 1,
                }
            }
            let status = if found == 0 {
                warn!("No table found on page {page} of {}", source.describe());
                UnitStatus::NoTableFound
            } else {
                info!("Page {page}: {found} table(s)");
                UnitStatus::Extracted
            };
            result.units.push(UnitOutcome {
                page,
                tables: found,
                records: 0,
                status,
            });
        }
        Ok(result)
    }

    pub fn run(
        &self,
        source: &dyn TableSource,
        selection: &UnitSelection,
    ) -> Result<RunReport, PipelineError> {
        let normalized = self.normalize(source, selection)?;
        let mapper = SchemaMapper::new(&self.config);
        let mut keys = KeySequence::new();
        let mut report = RunReport {
            records: Vec::new(),
            units: normalized.units,
            diagnostics: normalized.diagnostics,
        };

        for table in &normalized.tables {
            let records = mapper.map_table(table, &mut keys, &mut report.diagnostics);
            if let Some(unit) = report
                .units
                .iter_mut()
                .find(|u| u.page == table.table.provenance.page)
            {
                unit.records += records.len();
            }
            info!(
                "{} (page {}): {} record(s), {} emphasis row(s)",
                table.table.provenance.table_id(),
                table.table.provenance.page,
                records.len(),
                table.emphasis_count()
            );
            report.records.extend(records);
        }

        info!(
            "Mapped {} record(s) from {} table(s) across {} page(s)",
            keys.issued(),
            normalized.tables.len(),
            report.units.len()
        );
        Ok(report)
    }
}
