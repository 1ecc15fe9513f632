use anyhow::Context;
use clap::Parser;
use nc2json::cli::{write_completions, Cli};
use nc2json::log::{config_echo, init_logging, show_farewell_with_timing, show_greeting};
use nc2json::process_conversion;
use std::time::Instant;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        write_completions(shell, &mut std::io::stdout())?;
        return Ok(());
    }

    init_logging(cli.verbose, cli.quiet);
    run(&cli)
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let start_time = Instant::now();

    let config = cli.to_config().context("Invalid configuration")?;
    show_greeting(&config.source);
    config_echo(&config);

    process_conversion(&config).with_context(|| format!("Failed to convert {}", config.source))?;

    show_farewell_with_timing(start_time.elapsed());
    Ok(())
}
