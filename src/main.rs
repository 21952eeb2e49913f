use anyhow::{Context, Result};
use clap::Parser;
use cycletrace::cli::{Cli, OutputFormat};
use cycletrace::config::TraceConfig;
use cycletrace::encode::WireFormat;
use cycletrace::{replay, summary, tracer::Tracer};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Load the config file (or defaults) and apply CLI overrides
fn build_config(args: &Cli) -> Result<TraceConfig> {
    let mut config = match &args.config {
        Some(path) => TraceConfig::load(path)?,
        None => TraceConfig::default(),
    };

    if let Some(policy) = args.retry_policy {
        config.retry_policy = policy;
    }
    if let Some(count) = args.section_count {
        config.section_count = count;
    }
    match args.format {
        OutputFormat::Json => config.wire_format = WireFormat::Json,
        OutputFormat::Packed => config.wire_format = WireFormat::Packed,
        OutputFormat::Text => {}
    }

    if config.hooks.is_empty() {
        anyhow::bail!("No hooks configured. Pass --config with at least one [[hooks]] binding.");
    }
    Ok(config)
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let config = build_config(&args)?;
    let mut tracer = Tracer::new(&config).context("Invalid tracer configuration")?;
    let records = replay::load(&args.trace)?;

    let reports = replay::replay(&mut tracer, &records);
    if reports.is_empty() {
        eprintln!("[cycletrace: no session was finalized in {} records]", records.len());
    }

    match args.format {
        OutputFormat::Text => {
            for (idx, report) in reports.iter().enumerate() {
                if idx > 0 {
                    println!();
                }
                println!("Session {}", idx + 1);
                summary::print_summary(report);
            }
        }
        OutputFormat::Json | OutputFormat::Packed => {
            for outbound in tracer.outbox_mut().drain() {
                println!("{}", outbound.text);
            }
        }
    }

    Ok(())
}
