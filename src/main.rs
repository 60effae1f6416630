use anyhow::{Context, Result};
use clap::Parser;
use huella::{cli::Cli, engine, filter, replay, report};
use std::path::Path;
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

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    // Parse filter pattern if provided
    let filter = if let Some(pattern) = &args.filter {
        filter::UnitFilter::from_pattern(pattern)?
    } else {
        filter::UnitFilter::all()
    };

    // The sink opens before replay so destination failures abort the run
    // up front rather than after a long collection.
    let sink = match &args.output {
        Some(path) => report::ReportSink::file(path)
            .with_context(|| format!("Failed to open report destination: {}", path.display()))?,
        None => report::ReportSink::stdout().context("Failed to duplicate stdout for the report")?,
    };

    let engine = engine::WssEngine::new(engine::EngineConfig {
        line_bytes: args.line_bytes,
        max_records: args.max_records,
        max_instructions: args.max_instructions,
    })?;

    let report = if args.trace == Path::new("-") {
        replay::replay_stdin(engine, args.flat)?
    } else {
        replay::replay_path(&args.trace, engine, args.flat)?
    };

    let text = report::render(&report, args.rank_by, &filter);
    sink.write_report(&text).context("Failed to write report")?;

    Ok(())
}
