//! Storerace command-line runner.
//!
//! Runs the benchmark, prints the comparison tables and writes the JSON
//! results file.

mod args;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use args::{Args, OutputFormat};
use storerace_bench::{render_report, BenchmarkRunner, ResultExporter, TracingReporter};

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storerace_cli=info,storerace_bench=info,storerace_docstore=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, kind = ?e.kind(), "benchmark failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> storerace_bench::Result<()> {
    let format = args.format;
    let config = args.into_config();
    config.validate()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        scales = ?config.scales.iter().map(|s| s.count()).collect::<Vec<_>>(),
        relational = %config.relational,
        aggregation_scale = ?config.aggregation_scale.map(|s| s.count()),
        output = %config.output_path.display(),
        "configuration loaded"
    );

    let adapters = config.build_adapters()?;
    let exporter = ResultExporter::new(&config.output_path);
    let mut runner = BenchmarkRunner::new(config, adapters, TracingReporter);
    let report = runner.run()?;

    match format {
        OutputFormat::Table => println!("{}", render_report(&report)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    exporter.export(&report)?;
    Ok(())
}
