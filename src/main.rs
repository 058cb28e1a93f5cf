use anyhow::{Context, Result};
use clap::Parser;
use cronista::cli::{Cli, OutputFormat};
use cronista::replay::{self, RecordedTrace};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Write the rendered report to the chosen destination
fn emit(rendered: &str, output: Option<&std::path::Path>) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, rendered)
            .with_context(|| format!("Failed to write report to {}", path.display())),
        None => {
            print!("{rendered}");
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.debug);

    let raw = std::fs::read_to_string(&args.trace)
        .with_context(|| format!("Failed to read trace capture {}", args.trace.display()))?;
    let trace: RecordedTrace = serde_json::from_str(&raw)
        .with_context(|| format!("Malformed trace capture {}", args.trace.display()))?;

    let report = replay::replay(trace).context("Replay failed")?;

    let rendered = match args.format {
        OutputFormat::Text => report.to_text(args.lines),
        OutputFormat::Json => {
            let mut json = report.to_json()?;
            json.push('\n');
            json
        }
    };
    emit(&rendered, args.output.as_deref())
}
