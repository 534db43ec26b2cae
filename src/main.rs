use anyhow::Result;
use clap::Parser;

use subweave::{cli, config, pipeline};

fn main() -> Result<()> {
    let args = cli::Args::parse();

    let cfg = config::Config::load(args.config.as_deref())?;
    config::init_tracing(&cfg.logging, args.log_level.as_deref())?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "subweave starting");

    match args.command {
        cli::Command::Assemble(cmd) => pipeline::run_assemble(cmd, &cfg),
        cli::Command::Refine(cmd) => pipeline::run_refine(cmd, &cfg),
        cli::Command::Windows(cmd) => pipeline::run_windows(cmd, &cfg),
        cli::Command::PrintDefaultConfig => {
            let s = cfg.to_toml_pretty()?;
            print!("{s}");
            Ok(())
        }
    }
}
