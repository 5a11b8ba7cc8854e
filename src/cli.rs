use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::PeriodMapping;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Normalize tables extracted from financial statements",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Map extracted tables onto the standard record schema
    Map(MapArgs),
    /// Write rectangularized tables with canonical values and row roles
    Normalize(NormalizeArgs),
    /// Preview normalized tables in the terminal, emphasis rows in bold
    Preview(PreviewArgs),
    /// List the standard column layout for the active configuration
    Columns(ColumnsArgs),
    /// Write the default pipeline configuration as YAML
    InitConfig(InitConfigArgs),
}

/// Where raw tables come from and which pages to read.
#[derive(Debug, Args)]
pub struct InputArgs {
    /// Table bundle (.json/.yaml) or one CSV/TSV grid per page, in page order
    #[arg(short = 'i', long = "input", required = true, action = clap::ArgAction::Append)]
    pub inputs: Vec<PathBuf>,
    /// 1-based page to process (repeatable; all pages when omitted)
    #[arg(long = "page", action = clap::ArgAction::Append)]
    pub pages: Vec<usize>,
    /// CSV delimiter character for grid inputs (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of grid inputs (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

/// Pipeline configuration file plus per-run overrides.
#[derive(Debug, Args, Default)]
pub struct ConfigArgs {
    /// YAML configuration file (defaults are used when omitted)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Emphasis keyword replacing the configured set (repeatable)
    #[arg(long = "keyword", action = clap::ArgAction::Append)]
    pub keywords: Vec<String>,
    /// Use the narrow emphasis keyword set
    #[arg(long = "strict-keywords", conflicts_with = "keywords")]
    pub strict_keywords: bool,
    /// Country code stamped on every record
    #[arg(long)]
    pub country: Option<String>,
    /// Currency or measurement unit stamped on every record
    #[arg(long)]
    pub unit: Option<String>,
    /// Period label, oldest first (repeatable, up to three)
    #[arg(long = "period", action = clap::ArgAction::Append)]
    pub periods: Vec<String>,
    /// How value cells are assigned to period columns
    #[arg(long = "period-mapping")]
    pub period_mapping: Option<PeriodMapping>,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

#[derive(Debug, Args)]
pub struct MapArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub config: ConfigArgs,
    /// Output file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Output format
    #[arg(long, default_value = "csv")]
    pub format: OutputFormat,
    /// Delimiter for CSV output (defaults by output extension)
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Append a trailing row_role column
    #[arg(long = "include-role")]
    pub include_role: bool,
}

#[derive(Debug, Args)]
pub struct NormalizeArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub config: ConfigArgs,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Delimiter for output (defaults by output extension)
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub config: ConfigArgs,
    /// Number of body rows to display per table
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
    /// Show the role of each row in a trailing column
    #[arg(long = "show-roles")]
    pub show_roles: bool,
    /// Disable bold styling of emphasis rows
    #[arg(long = "plain")]
    pub plain: bool,
}

#[derive(Debug, Args)]
pub struct ColumnsArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(Debug, Args)]
pub struct InitConfigArgs {
    /// Destination YAML file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Seed the file with the narrow emphasis keyword set
    #[arg(long = "strict-keywords")]
    pub strict_keywords: bool,
    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_delimiter_accepts_names_and_characters() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter("semicolon"), Ok(b';'));
        assert_eq!(parse_delimiter("#"), Ok(b'#'));
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter("ab").is_err());
        assert!(parse_delimiter("é").is_err());
    }

    #[test]
    fn map_args_collect_repeated_flags() {
        let cli = Cli::try_parse_from([
            "statement-tables",
            "map",
            "-i",
            "p1.csv",
            "-i",
            "p2.csv",
            "--page",
            "2",
            "--period",
            "2023",
            "--period",
            "2024",
            "--period-mapping",
            "header-labels",
            "--format",
            "json",
        ])
        .expect("parse map args");
        let Commands::Map(args) = cli.command else {
            panic!("expected map command");
        };
        assert_eq!(args.input.inputs.len(), 2);
        assert_eq!(args.input.pages, vec![2]);
        assert_eq!(args.config.periods, vec!["2023", "2024"]);
        assert_eq!(
            args.config.period_mapping,
            Some(PeriodMapping::HeaderLabels)
        );
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn strict_keywords_conflict_with_explicit_keywords() {
        let result = Cli::try_parse_from([
            "statement-tables",
            "columns",
            "--keyword",
            "total",
            "--strict-keywords",
        ]);
        assert!(result.is_err());
    }
}
