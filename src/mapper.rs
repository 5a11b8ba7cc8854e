//! Projection of classified tables into the standard wide schema.
//!
//! Every body row becomes exactly one [`CanonicalRecord`]. Leading cells fill
//! the dimension slots, trailing (or header-labelled) cells fill the period
//! columns, and the document-family constants from [`PipelineConfig`] are
//! stamped on every record. Primary keys come from an injected
//! [`KeySequence`] so they stay dense across all tables of a run.

use chrono::NaiveDate;
use log::debug;

use crate::{
    classify::{ClassifiedTable, RowRole},
    config::{PeriodMapping, PipelineConfig},
    error::{DiagnosticKind, Diagnostics},
    numeric::{CellValue, canonicalize},
    rectangularize::TableProvenance,
};

pub const MAX_DIMENSIONS: usize = 4;

const LEADING_COLUMNS: &[&str] = &[
    "primary_key",
    "date_last_updated",
    "published_date",
    "reported_date",
    "doc_page_num",
    "file_page_num",
    "table_id",
    "country",
    "geo_1_id",
    "geo_1_name",
    "geo_1_type",
    "geo_2_id",
    "geo_2_name",
    "geo_2_type",
    "dim_4_id",
    "dim_4_name",
    "dim_3_id",
    "dim_3_name",
    "dim_2_id",
    "dim_2_name",
    "dim_1_id",
    "dim_1_name",
    "metric_id",
    "metric_name",
    "source_metric_id",
    "source_metric_name",
    "indentation",
    "process_flag",
    "base_factor",
    "display_power_factor",
    "data_frequency",
    "aggregation_method",
    "unit",
    "unit_type",
    "note_id",
    "note_reference",
    "cumulative_periods",
    "comments",
    "check_sum",
    "concat",
    "formula",
];

/// Column order of the standard schema for the given period labels.
pub fn standard_columns(periods: &[String]) -> Vec<String> {
    let mut columns = LEADING_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>();
    columns.extend(periods.iter().cloned());
    columns.extend(periods.iter().map(|p| format!("{p}_check")));
    columns
}

/// Monotonic primary key generator scoped to a single run.
#[derive(Debug, Clone)]
pub struct KeySequence {
    next: u64,
}

impl Default for KeySequence {
    fn default() -> Self {
        Self::new()
    }
}

impl KeySequence {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next_key(&mut self) -> u64 {
        let key = self.next;
        self.next += 1;
        key
    }

    /// Number of keys handed out so far.
    pub fn issued(&self) -> u64 {
        self.next - 1
    }
}

/// Which row cells feed which record fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPlan {
    /// Cell indices for `dim_1..`, in order.
    pub dimensions: Vec<usize>,
    /// One entry per configured period (oldest first); `None` leaves the
    /// period null.
    pub periods: Vec<Option<usize>>,
}

impl ColumnPlan {
    pub fn mapped_periods(&self) -> usize {
        self.periods.iter().filter(|p| p.is_some()).count()
    }

    pub fn is_partial(&self) -> bool {
        self.mapped_periods() < self.periods.len()
    }
}

/// Positional plan: the first cell is always a label, the trailing
/// `min(period_count, row_len - 1)` cells are period values (last cell is the
/// most recent period), and up to four leading cells are dimensions.
pub fn plan_columns(row_len: usize, period_count: usize) -> ColumnPlan {
    let value_count = period_count.min(row_len.saturating_sub(1));
    let first_value = row_len - value_count;
    let mut periods = vec![None; period_count];
    for offset in 0..value_count {
        periods[period_count - value_count + offset] = Some(first_value + offset);
    }
    let dimensions = (0..first_value.min(MAX_DIMENSIONS)).collect();
    ColumnPlan {
        dimensions,
        periods,
    }
}

/// Plan derived from header labels. Returns `None` when no header cell names
/// a configured period.
pub fn plan_from_header(header: &[String], periods: &[String]) -> Option<ColumnPlan> {
    let mut taken = Vec::new();
    let mut assigned = Vec::with_capacity(periods.len());
    for label in periods {
        let found = header
            .iter()
            .enumerate()
            .skip(1)
            .find(|(idx, cell)| !taken.contains(idx) && header_names_period(cell, label))
            .map(|(idx, _)| idx);
        if let Some(idx) = found {
            taken.push(idx);
        }
        assigned.push(found);
    }
    let first_value = taken.iter().copied().min()?;
    Some(ColumnPlan {
        dimensions: (0..first_value.min(MAX_DIMENSIONS)).collect(),
        periods: assigned,
    })
}

fn header_names_period(cell: &str, label: &str) -> bool {
    let label = label.trim();
    if label.is_empty() {
        return false;
    }
    cell.trim().eq_ignore_ascii_case(label)
        || cell
            .split(|c: char| !c.is_alphanumeric())
            .any(|token| token.eq_ignore_ascii_case(label))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dimension {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Geography {
    pub id: Option<String>,
    pub name: Option<String>,
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeriodValue {
    pub label: String,
    pub value: CellValue,
    pub check: CellValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    pub primary_key: u64,
    pub date_last_updated: NaiveDate,
    pub published_date: NaiveDate,
    pub reported_date: NaiveDate,
    pub doc_page_num: usize,
    pub file_page_num: usize,
    pub table_id: String,
    pub country: String,
    pub geographies: [Geography; 2],
    /// `dimensions[0]` is `dim_1`.
    pub dimensions: [Dimension; MAX_DIMENSIONS],
    pub metric_id: String,
    pub metric_name: String,
    pub source_metric_id: String,
    pub source_metric_name: String,
    pub indentation: u32,
    pub process_flag: u8,
    pub base_factor: i64,
    pub display_power_factor: i32,
    pub data_frequency: String,
    pub aggregation_method: String,
    pub unit: String,
    pub unit_type: String,
    pub note_id: Option<String>,
    pub note_reference: Option<String>,
    pub cumulative_periods: u32,
    pub comments: String,
    pub check_sum: Option<String>,
    pub concat: Option<String>,
    pub formula: Option<String>,
    /// Oldest period first.
    pub periods: Vec<PeriodValue>,
    pub role: RowRole,
}

fn text(value: &str) -> CellValue {
    CellValue::Text(value.to_string())
}

fn optional(value: &Option<String>) -> CellValue {
    value.as_deref().map(text).unwrap_or(CellValue::Null)
}

fn date(value: NaiveDate) -> CellValue {
    CellValue::Text(value.format("%Y-%m-%d").to_string())
}

impl CanonicalRecord {
    pub fn dimension(&self, number: usize) -> Option<&Dimension> {
        number
            .checked_sub(1)
            .and_then(|idx| self.dimensions.get(idx))
    }

    pub fn period(&self, label: &str) -> Option<&CellValue> {
        self.periods
            .iter()
            .find(|p| p.label == label)
            .map(|p| &p.value)
    }

    /// Field values in [`standard_columns()`] order.
    pub fn cells(&self) -> Vec<CellValue> {
        let mut cells = vec![
            CellValue::Number(self.primary_key as f64),
            date(self.date_last_updated),
            date(self.published_date),
            date(self.reported_date),
            CellValue::Number(self.doc_page_num as f64),
            CellValue::Number(self.file_page_num as f64),
            text(&self.table_id),
            text(&self.country),
        ];
        for geo in &self.geographies {
            cells.push(optional(&geo.id));
            cells.push(optional(&geo.name));
            cells.push(optional(&geo.kind));
        }
        for dim in self.dimensions.iter().rev() {
            cells.push(optional(&dim.id));
            cells.push(optional(&dim.name));
        }
        cells.extend([
            text(&self.metric_id),
            text(&self.metric_name),
            text(&self.source_metric_id),
            text(&self.source_metric_name),
            CellValue::Number(f64::from(self.indentation)),
            CellValue::Number(f64::from(self.process_flag)),
            CellValue::Number(self.base_factor as f64),
            CellValue::Number(f64::from(self.display_power_factor)),
            text(&self.data_frequency),
            text(&self.aggregation_method),
            text(&self.unit),
            text(&self.unit_type),
            optional(&self.note_id),
            optional(&self.note_reference),
            CellValue::Number(f64::from(self.cumulative_periods)),
            text(&self.comments),
            optional(&self.check_sum),
            optional(&self.concat),
            optional(&self.formula),
        ]);
        cells.extend(self.periods.iter().map(|p| p.value.clone()));
        cells.extend(self.periods.iter().map(|p| p.check.clone()));
        cells
    }
}

pub struct SchemaMapper<'a> {
    config: &'a PipelineConfig,
    run_date: NaiveDate,
}

impl<'a> SchemaMapper<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self {
            config,
            run_date: config.effective_run_date(),
        }
    }

    pub fn columns(&self) -> Vec<String> {
        standard_columns(&self.config.periods)
    }

    pub fn plan_for(&self, header: &[String]) -> ColumnPlan {
        let periods = &self.config.periods;
        let positional = || plan_columns(header.len(), periods.len());
        match self.config.period_mapping {
            PeriodMapping::Positional => positional(),
            PeriodMapping::HeaderLabels => {
                plan_from_header(header, periods).unwrap_or_else(|| ColumnPlan {
                    dimensions: (0..header.len().min(MAX_DIMENSIONS)).collect(),
                    periods: vec![None; periods.len()],
                })
            }
            PeriodMapping::Auto => plan_from_header(header, periods).unwrap_or_else(positional),
        }
    }

    pub fn map_table(
        &self,
        classified: &ClassifiedTable,
        keys: &mut KeySequence,
        diagnostics: &mut Diagnostics,
    ) -> Vec<CanonicalRecord> {
        let table = &classified.table;
        let plan = self.plan_for(&table.header);
        if plan.is_partial() {
            debug!(
                "{} maps {} of {} period column(s)",
                table.provenance.table_id(),
                plan.mapped_periods(),
                plan.periods.len()
            );
            diagnostics.add(DiagnosticKind::PartialPeriods, table.rows.len());
        }
        classified
            .rows()
            .enumerate()
            .map(|(row_idx, (row, role))| {
                let key = keys.next_key();
                let record = self.map_row(&table.provenance, &plan, row_idx, row, role, key);
                let non_numeric = record
                    .periods
                    .iter()
                    .filter(|p| matches!(p.value, CellValue::Text(_)))
                    .count();
                if non_numeric > 0 {
                    debug!(
                        "{} row {}: {} non-numeric period value(s)",
                        table.provenance.table_id(),
                        row_idx + 1,
                        non_numeric
                    );
                    diagnostics.add(DiagnosticKind::NonNumericValue, non_numeric);
                }
                record
            })
            .collect()
    }

    pub fn map_row(
        &self,
        provenance: &TableProvenance,
        plan: &ColumnPlan,
        row_idx: usize,
        row: &[String],
        role: RowRole,
        primary_key: u64,
    ) -> CanonicalRecord {
        let ordinal = provenance.ordinal;
        let mut dimensions: [Dimension; MAX_DIMENSIONS] = Default::default();
        for (slot, &cell_idx) in plan.dimensions.iter().enumerate().take(MAX_DIMENSIONS) {
            let name = row
                .get(cell_idx)
                .filter(|cell| !cell.is_empty())
                .cloned();
            dimensions[slot] = Dimension {
                id: Some(format!("DIM{}_{ordinal}_{row_idx}", slot + 1)),
                name,
            };
        }

        let periods = self
            .config
            .periods
            .iter()
            .zip(plan.periods.iter())
            .map(|(label, &cell_idx)| PeriodValue {
                label: label.clone(),
                value: cell_idx
                    .and_then(|idx| row.get(idx))
                    .map(|cell| canonicalize(Some(cell.as_str())))
                    .unwrap_or(CellValue::Null),
                check: CellValue::Null,
            })
            .collect();

        CanonicalRecord {
            primary_key,
            date_last_updated: self.run_date,
            published_date: self.run_date,
            reported_date: self.config.reported_date,
            doc_page_num: provenance.page,
            file_page_num: provenance.page,
            table_id: provenance.table_id(),
            country: self.config.country.clone(),
            geographies: Default::default(),
            dimensions,
            metric_id: format!("METRIC_{ordinal}_{row_idx}"),
            metric_name: format!("Value_{row_idx}"),
            source_metric_id: format!("SOURCE_{ordinal}_{row_idx}"),
            source_metric_name: self.config.source_metric_name.clone(),
            indentation: 0,
            process_flag: 1,
            base_factor: 1,
            display_power_factor: 0,
            data_frequency: self.config.data_frequency.clone(),
            aggregation_method: self.config.aggregation_method.clone(),
            unit: self.config.unit.clone(),
            unit_type: self.config.unit_type.clone(),
            note_id: None,
            note_reference: None,
            cumulative_periods: 1,
            comments: format!("Extracted from page {}", provenance.page),
            check_sum: None,
            concat: None,
            formula: None,
            periods,
            role,
        }
    }
}
