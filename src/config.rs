//! Pipeline configuration and YAML persistence.
//!
//! The configuration surface is deliberately small: the emphasis keyword set
//! used by the row classifier, and the document-family constants stamped
//! onto every canonical record (jurisdiction, unit, frequency, periods).

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::{
    classify::{DEFAULT_EMPHASIS_KEYWORDS, RowClassifier},
    error::PipelineError,
};

pub const MAX_PERIODS: usize = 3;

/// How trailing value cells are assigned to period columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum PeriodMapping {
    /// Use header labels when the header names a configured period,
    /// otherwise fall back to trailing positions.
    #[default]
    Auto,
    Positional,
    HeaderLabels,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub emphasis_keywords: Vec<String>,
    pub country: String,
    pub unit: String,
    pub unit_type: String,
    pub aggregation_method: String,
    pub data_frequency: String,
    pub reported_date: NaiveDate,
    /// Period labels, oldest first.
    pub periods: Vec<String>,
    pub period_mapping: PeriodMapping,
    pub source_metric_name: String,
    /// Stamped into `date_last_updated` and `published_date`; today when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_date: Option<NaiveDate>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            emphasis_keywords: DEFAULT_EMPHASIS_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect(),
            country: "PL".to_string(),
            unit: "PLN".to_string(),
            unit_type: "Thousands".to_string(),
            aggregation_method: "Sum".to_string(),
            data_frequency: "Annual".to_string(),
            reported_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap_or_default(),
            periods: vec!["2022".into(), "2023".into(), "2024".into()],
            period_mapping: PeriodMapping::Auto,
            source_metric_name: "PDF_Extracted".to_string(),
            run_date: None,
        }
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let reader = BufReader::new(file);
        let config: PipelineConfig =
            serde_yaml::from_reader(reader).context("Parsing config YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        let file = File::create(path).with_context(|| format!("Creating config file {path:?}"))?;
        serde_yaml::to_writer(file, self).context("Writing config YAML")
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Serializing config to YAML string")
    }

    pub fn validate(&self) -> std::result::Result<(), PipelineError> {
        if self.periods.is_empty() || self.periods.len() > MAX_PERIODS {
            return Err(PipelineError::InvalidConfig(format!(
                "expected between 1 and {MAX_PERIODS} period labels, found {}",
                self.periods.len()
            )));
        }
        let mut seen = Vec::with_capacity(self.periods.len());
        for label in &self.periods {
            let trimmed = label.trim();
            if trimmed.is_empty() {
                return Err(PipelineError::InvalidConfig(
                    "period labels cannot be empty".to_string(),
                ));
            }
            if seen.contains(&trimmed) {
                return Err(PipelineError::InvalidConfig(format!(
                    "duplicate period label '{trimmed}'"
                )));
            }
            seen.push(trimmed);
        }
        if self.country.trim().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "country code cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn classifier(&self) -> RowClassifier {
        RowClassifier::new(&self.emphasis_keywords)
    }

    pub fn effective_run_date(&self) -> NaiveDate {
        self.run_date.unwrap_or_else(|| Local::now().date_naive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_match_document_family() {
        let config = PipelineConfig::default();
        assert_eq!(config.country, "PL");
        assert_eq!(config.unit, "PLN");
        assert_eq!(config.periods, vec!["2022", "2023", "2024"]);
        assert_eq!(config.reported_date.to_string(), "2024-12-31");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let yaml = "country: CZ\nperiods: ['2023', '2024']\nperiod_mapping: positional\n";
        let config: PipelineConfig = serde_yaml::from_str(yaml).expect("parse config");
        assert_eq!(config.country, "CZ");
        assert_eq!(config.periods.len(), 2);
        assert_eq!(config.period_mapping, PeriodMapping::Positional);
        assert_eq!(config.unit, "PLN");
    }

    #[test]
    fn validate_rejects_bad_periods() {
        let mut config = PipelineConfig::default();
        config.periods.push("2025".into());
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));
        config.periods = vec!["2024".into(), " 2024 ".into()];
        assert!(config.validate().is_err());
        config.periods = Vec::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("pipeline.yaml");
        let mut config = PipelineConfig::default();
        config.emphasis_keywords = vec!["balance as at".into()];
        config.run_date = NaiveDate::from_ymd_opt(2025, 3, 1);
        config.save(&path).expect("save config");
        let loaded = PipelineConfig::load(&path).expect("load config");
        assert_eq!(loaded, config);
    }

    #[test]
    fn run_date_override_is_used() {
        let mut config = PipelineConfig::default();
        let date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        config.run_date = Some(date);
        assert_eq!(config.effective_run_date(), date);
    }
}
