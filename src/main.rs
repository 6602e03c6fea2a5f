//! Stagecraft CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use stagecraft::cli::{commands, Cli, Commands};
use stagecraft::config::{Config, ConfigManager};
use stagecraft::error::{StagecraftError, StagecraftResult};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> StagecraftResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };

    // Find local config unless --no-local is set
    let local_config_path = if cli.no_local {
        None
    } else {
        let cwd = std::env::current_dir()
            .map_err(|e| StagecraftError::io("getting current directory", e))?;
        ConfigManager::find_local_config(&cwd)
    };

    let config = config_manager
        .load_merged(local_config_path.as_deref())
        .await?;

    init_logging(cli.verbose, &config);
    if let Some(ref path) = local_config_path {
        debug!("Found local config: {}", path.display());
    }

    // Build directories are only needed by commands that reach the engine
    if matches!(
        cli.command,
        Commands::Build(_) | Commands::Run(_) | Commands::Save(_)
    ) {
        ConfigManager::ensure_state_dirs().await?;
    }

    match cli.command {
        Commands::Ls(args) => commands::ls(args, &config).await,
        Commands::Preview(args) => commands::preview(args, &config).await,
        Commands::Build(args) => commands::build(args, &config).await,
        Commands::Run(args) => commands::run(args, &config).await,
        Commands::Save(args) => commands::save(args, &config).await,
        Commands::CacheId(args) => commands::cache_id(args, &config).await,
        Commands::Config(args) => commands::config(args, &config, &config_manager).await,
    }
}

/// 0 = warn (spinners only), 1 = info, 2+ = debug
fn init_logging(verbose: u8, config: &Config) {
    let filter = match verbose {
        0 => EnvFilter::new("stagecraft=warn"),
        1 => EnvFilter::new("stagecraft=info"),
        _ => EnvFilter::new("stagecraft=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
