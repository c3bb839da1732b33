use anyhow::{Context, Result};
use clap::Parser;
use patchfinder::{RunConfig, cli, config, engine, github, governor, reporter};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    match cli.command {
        cli::Commands::Scan(args) => match scan_command(args) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: {:#}", e);
                ExitCode::FAILURE
            }
        },
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn scan_command(args: cli::ScanArgs) -> Result<()> {
    init_logging(args.verbose);

    // Reject bad input before anything touches the network
    let run = RunConfig::new(
        args.account.trim(),
        args.token.trim(),
        args.search_email.clone(),
    )?;

    let mut config =
        config::load_config(args.config.as_deref()).context("Failed to load configuration")?;

    if let Some(api_url) = args.api_url {
        config.api_url = api_url;
    }
    if let Some(timeout) = args.timeout {
        config.timeout = timeout;
    }
    if args.skip_forks {
        config.include_forks = false;
    }

    tracing::debug!(?run, ?config, "configuration loaded");

    let timeout = config::request_timeout(&config)?;
    let transport = github::GitHubTransport::new(run.credential(), timeout)?;
    let scanner = engine::Scanner::new(&config).context("Failed to build identity extractor")?;

    // Credential and account failures make a partial listing meaningless
    let report = match scanner.run(&run, transport, governor::SystemClock) {
        Ok(report) => report,
        Err(aborted) => {
            tracing::debug!(
                discarded = aborted.partial.len(),
                "discarding partial results"
            );
            return Err(aborted.into());
        }
    };

    reporter::generate_report(&report, args.format, args.output.as_deref())
        .context("Failed to generate report")?;

    Ok(())
}
