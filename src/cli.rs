//! CLI argument parsing for Cronista

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Output format for session reports
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text summary (default)
    Text,
    /// JSON report for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "cronista")]
#[command(version)]
#[command(about = "Deterministic line-level execution profiler for recorded runtime event streams", long_about = None)]
pub struct Cli {
    /// Recorded trace capture (JSON) to profile
    #[arg(value_name = "TRACE")]
    pub trace: PathBuf,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Write the report to FILE instead of stdout
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Include per-line detail in the text summary
    #[arg(short = 'l', long = "lines")]
    pub lines: bool,

    /// Enable debug logging to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_trace_path() {
        let cli = Cli::parse_from(["cronista", "session.json"]);
        assert_eq!(cli.trace, PathBuf::from("session.json"));
        assert!(matches!(cli.format, OutputFormat::Text));
        assert!(cli.output.is_none());
    }

    #[test]
    fn test_cli_json_format_and_output_file() {
        let cli = Cli::parse_from([
            "cronista",
            "session.json",
            "--format",
            "json",
            "-o",
            "report.json",
        ]);
        assert!(matches!(cli.format, OutputFormat::Json));
        assert_eq!(cli.output, Some(PathBuf::from("report.json")));
    }

    #[test]
    fn test_cli_lines_flag_default_false() {
        let cli = Cli::parse_from(["cronista", "session.json"]);
        assert!(!cli.lines);

        let cli = Cli::parse_from(["cronista", "--lines", "session.json"]);
        assert!(cli.lines);
    }

    #[test]
    fn test_cli_requires_trace_argument() {
        assert!(Cli::try_parse_from(["cronista"]).is_err());
    }
}
