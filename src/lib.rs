pub mod classify;
pub mod cli;
pub mod config;
pub mod error;
pub mod io_utils;
pub mod mapper;
pub mod numeric;
pub mod pipeline;
pub mod rectangularize;
pub mod sink;
pub mod source;
pub mod table;

use std::{env, io::Write, sync::OnceLock};

use anyhow::{Context, Result, bail};
use clap::Parser;
use itertools::Itertools;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands, ConfigArgs, InputArgs, OutputFormat},
    config::PipelineConfig,
    error::{DiagnosticKind, PipelineError},
    mapper::standard_columns,
    pipeline::{Pipeline, RunReport, UnitOutcome, UnitSelection},
    sink::{CsvRecordSink, JsonRecordSink, RecordSink},
    source::TableSource,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("statement_tables", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Map(args) => handle_map(&args),
        Commands::Normalize(args) => handle_normalize(&args),
        Commands::Preview(args) => handle_preview(&args),
        Commands::Columns(args) => handle_columns(&args),
        Commands::InitConfig(args) => handle_init_config(&args),
    }
}

/// Loads the configuration file (or defaults) and applies command line
/// overrides on top of it.
pub fn resolve_config(args: &ConfigArgs) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("Loading configuration from {path:?}"))?,
        None => PipelineConfig::default(),
    };
    if args.strict_keywords {
        config.emphasis_keywords = classify::STRICT_EMPHASIS_KEYWORDS
            .iter()
            .map(|k| k.to_string())
            .collect();
    } else if !args.keywords.is_empty() {
        config.emphasis_keywords = args.keywords.clone();
    }
    if let Some(country) = &args.country {
        config.country = country.clone();
    }
    if let Some(unit) = &args.unit {
        config.unit = unit.clone();
    }
    if !args.periods.is_empty() {
        config.periods = args.periods.clone();
    }
    if let Some(mapping) = args.period_mapping {
        config.period_mapping = mapping;
    }
    config.validate()?;
    debug!(
        "Emphasis keywords: {}; periods: {}",
        config.emphasis_keywords.iter().join(", "),
        config.periods.iter().join(", ")
    );
    Ok(config)
}

fn open_source(args: &InputArgs) -> Result<Box<dyn TableSource>> {
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let source = source::load_source(&args.inputs, args.delimiter, encoding).map_err(|err| {
        PipelineError::Source {
            path: args.inputs.first().cloned().unwrap_or_default(),
            message: format!("{err:#}"),
        }
    })?;
    info!(
        "Reading tables from {} ({} page(s), delimiter '{}')",
        source.describe(),
        source.page_count(),
        printable_delimiter(args.delimiter.unwrap_or(io_utils::DEFAULT_CSV_DELIMITER))
    );
    Ok(source)
}

fn unit_selection(args: &InputArgs) -> UnitSelection {
    if args.pages.is_empty() {
        UnitSelection::All
    } else {
        UnitSelection::Pages(args.pages.clone())
    }
}

fn report_missing_units(units: &[UnitOutcome]) {
    let missing = units
        .iter()
        .filter_map(UnitOutcome::error)
        .filter_map(|error| match error {
            PipelineError::NoTableFound { page } => Some(page),
            _ => None,
        })
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        info!(
            "{} of {} page(s) produced no table: {}",
            missing.len(),
            units.len(),
            missing.iter().join(", ")
        );
    }
}

fn report_diagnostics(report: &RunReport) {
    let counts = DiagnosticKind::ALL
        .iter()
        .map(|kind| (kind, report.diagnostics.count(*kind)))
        .filter(|(_, count)| *count > 0)
        .map(|(kind, count)| format!("{count} {kind}"))
        .join(", ");
    if !counts.is_empty() {
        info!("Diagnostics: {counts}");
    }
    if report.diagnostics.tables_skipped > 0 {
        debug!(
            "Skipped {} table(s) without a usable header or body",
            report.diagnostics.tables_skipped
        );
    }
}

fn handle_map(args: &cli::MapArgs) -> Result<()> {
    let config = resolve_config(&args.config)?;
    let pipeline = Pipeline::new(config)?;
    let source = open_source(&args.input)?;
    let report = pipeline.run(source.as_ref(), &unit_selection(&args.input))?;
    report_missing_units(&report.units);
    report_diagnostics(&report);

    let columns = standard_columns(&pipeline.config().periods);
    let writer = io_utils::open_output(args.output.as_deref())?;
    match args.format {
        OutputFormat::Csv => {
            let delimiter =
                io_utils::resolve_output_delimiter(args.output.as_deref(), args.output_delimiter);
            let mut sink = CsvRecordSink::new(writer, delimiter, args.include_role);
            sink.write_records(&columns, &report.records)?;
        }
        OutputFormat::Json => {
            let mut sink = JsonRecordSink::new(writer, args.include_role);
            sink.write_records(&columns, &report.records)?;
        }
    }
    info!(
        "Wrote {} record(s) across {} column(s)",
        report.records.len(),
        columns.len()
    );
    Ok(())
}

fn handle_normalize(args: &cli::NormalizeArgs) -> Result<()> {
    let config = resolve_config(&args.config)?;
    let pipeline = Pipeline::new(config)?;
    let source = open_source(&args.input)?;
    let units = pipeline.normalize(source.as_ref(), &unit_selection(&args.input))?;
    report_missing_units(&units.units);

    let delimiter =
        io_utils::resolve_output_delimiter(args.output.as_deref(), args.output_delimiter);
    let writer = io_utils::open_output(args.output.as_deref())?;
    sink::write_normalized_tables(writer, delimiter, &units.tables)?;
    info!(
        "Wrote {} normalized table(s) ({} width mismatch(es))",
        units.tables.len(),
        units.diagnostics.width_mismatches
    );
    Ok(())
}

fn handle_preview(args: &cli::PreviewArgs) -> Result<()> {
    let config = resolve_config(&args.config)?;
    let pipeline = Pipeline::new(config)?;
    let source = open_source(&args.input)?;
    let units = pipeline.normalize(source.as_ref(), &unit_selection(&args.input))?;
    report_missing_units(&units.units);

    let rendered = units
        .tables
        .iter()
        .map(|t| table::render_classified_table(t, Some(args.rows), !args.plain, args.show_roles))
        .join("\n");
    print!("{rendered}");
    info!("Displayed {} table(s)", units.tables.len());
    Ok(())
}

fn handle_columns(args: &cli::ColumnsArgs) -> Result<()> {
    let config = resolve_config(&args.config)?;
    let headers = vec!["#".to_string(), "column".to_string()];
    let rows = standard_columns(&config.periods)
        .into_iter()
        .enumerate()
        .map(|(idx, name)| vec![(idx + 1).to_string(), name])
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
    Ok(())
}

fn handle_init_config(args: &cli::InitConfigArgs) -> Result<()> {
    let mut config = PipelineConfig::default();
    if args.strict_keywords {
        config.emphasis_keywords = classify::STRICT_EMPHASIS_KEYWORDS
            .iter()
            .map(|k| k.to_string())
            .collect();
    }
    match &args.output {
        Some(path) if !io_utils::is_dash(path) => {
            if path.exists() && !args.force {
                bail!("{path:?} already exists; pass --force to overwrite");
            }
            config
                .save(path)
                .with_context(|| format!("Writing configuration to {path:?}"))?;
            info!("Default configuration written to {path:?}");
        }
        _ => {
            let yaml = config.to_yaml_string()?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(yaml.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PeriodMapping;

    #[test]
    fn overrides_replace_configured_values() {
        let args = ConfigArgs {
            keywords: vec!["Total".to_string()],
            country: Some("DE".to_string()),
            unit: Some("EUR".to_string()),
            periods: vec!["2023".to_string(), "2024".to_string()],
            period_mapping: Some(PeriodMapping::Positional),
            ..ConfigArgs::default()
        };
        let config = resolve_config(&args).expect("resolve config");
        assert_eq!(config.emphasis_keywords, vec!["Total"]);
        assert_eq!(config.country, "DE");
        assert_eq!(config.unit, "EUR");
        assert_eq!(config.periods, vec!["2023", "2024"]);
        assert_eq!(config.period_mapping, PeriodMapping::Positional);
    }

    #[test]
    fn strict_keywords_override_defaults() {
        let args = ConfigArgs {
            strict_keywords: true,
            ..ConfigArgs::default()
        };
        let config = resolve_config(&args).expect("resolve config");
        assert_eq!(config.emphasis_keywords.len(), 2);
    }

    #[test]
    fn invalid_override_is_rejected() {
        let args = ConfigArgs {
            periods: vec!["2024".to_string(), "2024".to_string()],
            ..ConfigArgs::default()
        };
        assert!(resolve_config(&args).is_err());
    }

    #[test]
    fn printable_delimiter_escapes_whitespace() {
        assert_eq!(printable_delimiter(b'\t'), "\\t");
        assert_eq!(printable_delimiter(b';'), ";");
    }
}
