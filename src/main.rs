use anyhow::{Context, Result};
use bidiclip::cli::Cli;
use bidiclip::clipboard::select_gateway;
use bidiclip::control::ControlSignals;
use bidiclip::engine::SyncEngine;
use bidiclip::instance::InstanceGuard;
use bidiclip::prompt;
use clap::Parser;
use colored::Colorize;
use std::io;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Exit explicitly: a pending stdin read must not hold up runtime teardown
    let code = match run(cli) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            1
        }
    };
    std::process::exit(code);
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose {
        "bidiclip=debug"
    } else {
        "bidiclip=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config = cli.engine_config();

    // Same-path and read-only checks come before any clipboard or file access
    config.validate()?;

    if config.key.is_some() && !cli.yes {
        let proceed = prompt::confirm_obfuscation(&mut io::stdin().lock(), &mut io::stdout())
            .context("Failed to read confirmation")?;
        if !proceed {
            info!("Not starting");
            return Ok(());
        }
    }

    let _instance = InstanceGuard::acquire(&config.output)?;
    let clipboard = select_gateway(cli.clipboard)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let program = std::env::args()
        .next()
        .unwrap_or_else(|| "bidiclip".to_string());
    let keyed = config.key.is_some();

    let result = runtime.block_on(async move {
        // Listen before the output exists so an early SIGTERM still cleans up
        let signals = ControlSignals::listen()?;
        let engine = SyncEngine::new(config, clipboard)?;

        println!(
            "{}",
            prompt::banner(&program, engine.input_path(), engine.output_path(), keyed)
        );

        let operator = tokio::io::BufReader::new(tokio::io::stdin());
        engine.run(signals, operator).await
    });
    runtime.shutdown_background();

    let stats = result?;
    info!(
        "Done: {} sent, {} received",
        stats.frames_sent, stats.frames_received
    );
    Ok(())
}
