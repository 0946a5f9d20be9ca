//! ansi-optimize
//!
//! Reads terminal output from a file or stdin and writes a shorter stream
//! that displays identically.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ansi_optimizer::config::CliArgs;
use ansi_optimizer::{dump_events, optimize_stream, Config, Result, Stats};

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = CliArgs::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("ansi-optimize: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &CliArgs) -> Result<()> {
    let config = Config::load_with_args(args)?;
    tracing::debug!("config: {:?}", config);

    let reader: Box<dyn Read> = match &args.input {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(io::stdin().lock()),
    };
    let writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    };

    let stats = if args.dump_events {
        dump_events(reader, writer, &config)?
    } else {
        optimize_stream(reader, writer, &config)?
    };

    if args.stats {
        print_stats(&stats)?;
    }
    Ok(())
}

fn print_stats(stats: &Stats) -> Result<()> {
    let json = serde_json::to_string_pretty(stats)?;
    eprintln!("{}", json);
    Ok(())
}
