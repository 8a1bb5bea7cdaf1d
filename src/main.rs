//! ionpack - asset build pipeline for hybrid mobile apps.

mod asset;
mod cli;
mod config;
mod core;
mod error;
mod lint;
mod logger;
mod pipeline;
mod transform;
mod utils;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands, hook::InvocationContext};
use config::BuildConfig;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log!("error"; "{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let root = std::path::absolute(&cli.root)
        .with_context(|| format!("invalid project root {}", cli.root.display()))?;
    let plugin_dir = std::path::absolute(cli.plugin_dir())
        .with_context(|| format!("invalid plugin directory {}", cli.plugin_dir().display()))?;

    let flags = cli.command.build_args().raw_flags();
    logger::set_verbose(flags.verbose.unwrap_or(false));

    match cli.command {
        Commands::Build { .. } => {
            let config = BuildConfig::new(&root, &plugin_dir, &flags);
            cli::build::build_project(config).await.map(|_| ())
        }
        Commands::Serve { .. } => {
            let config = BuildConfig::new(&root, &plugin_dir, &flags);
            cli::serve::serve_project(config).await
        }
        Commands::Hook { command_line, .. } => {
            let invocation = InvocationContext {
                project_root: root,
                flags,
                plugin_dir,
                command_line: command_line.join(" "),
            };
            cli::hook::run_hook(invocation).await
        }
    }
}
