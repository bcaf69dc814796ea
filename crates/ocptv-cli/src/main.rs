mod cli;
mod demos;
mod error;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use ocptv_output::{validate_stream, BufferWriter, Config, StdoutWriter, StreamWriter, Writer};
use time::UtcOffset;
use tracing::{debug, info};

use crate::cli::{Cli, Command};
use crate::demos::{Demo, DEMOS};
use crate::error::CliError;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}

fn run() -> Result<ExitCode, CliError> {
    let cli = Cli::parse();

    let selected: Vec<&'static Demo> = match &cli.command {
        Command::List => {
            for demo in DEMOS {
                println!("{:<32} {}", demo.name, demo.description);
            }
            return Ok(ExitCode::SUCCESS);
        }
        Command::Run { names } => names
            .iter()
            .map(|name| demos::find(name).ok_or_else(|| CliError::UnknownDemo(name.clone())))
            .collect::<Result<_, _>>()?,
        Command::All => DEMOS.iter().collect(),
    };

    let timezone = resolve_timezone(&cli)?;
    let sink: Arc<dyn Writer> = match &cli.output {
        Some(path) => Arc::new(StreamWriter::create(path)?),
        None => Arc::new(StdoutWriter::new()),
    };
    let banners = matches!(cli.command, Command::All) && cli.output.is_none();

    for demo in selected {
        if banners {
            print_banner(demo.name);
        }
        let config = Config::new();
        config.enable_runtime_checks(!cli.no_runtime_checks);
        config.set_timezone(timezone);
        run_demo(demo, &config, &sink, cli.validate)?;
        if banners {
            println!();
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn resolve_timezone(cli: &Cli) -> Result<Option<UtcOffset>, CliError> {
    if cli.local_time {
        return Ok(None);
    }
    let hours = cli.utc_offset.unwrap_or(0);
    Ok(Some(UtcOffset::from_hms(hours, 0, 0)?))
}

fn run_demo(
    demo: &'static Demo,
    config: &Config,
    sink: &Arc<dyn Writer>,
    validate: bool,
) -> Result<(), CliError> {
    let fail = |source| CliError::Demo {
        demo: demo.name,
        source,
    };

    if !validate {
        config.set_writer(Arc::clone(sink));
        (demo.run)(config).map_err(fail)?;
        debug!(demo = demo.name, "demo finished");
        return Ok(());
    }

    let buffer = Arc::new(BufferWriter::new());
    config.set_writer(buffer.clone());
    (demo.run)(config).map_err(fail)?;

    let records = validate_stream(&buffer.contents()).map_err(|source| CliError::InvalidStream {
        demo: demo.name,
        source,
    })?;
    info!(demo = demo.name, records, "stream validated");

    for line in buffer.lines() {
        sink.write(&line)?;
    }
    Ok(())
}

fn print_banner(name: &str) {
    let rule = "-".repeat(80);
    println!("{rule}");
    println!("{name}");
    println!("{rule}");
}
