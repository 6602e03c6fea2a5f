//! Preview command - print the solved manifest

use crate::cli::args::PreviewArgs;
use crate::cli::commands::load_plan;
use crate::config::Config;
use crate::error::StagecraftResult;
use crate::solve::{solve_with, SolveOptions};

/// Execute the preview command
pub async fn execute(args: PreviewArgs, config: &Config) -> StagecraftResult<()> {
    let loaded = load_plan(args.target.file.as_deref(), config).await?;
    let stage = loaded.plan.stage(&args.target.target)?;

    let options = SolveOptions {
        syntax: config.build.syntax.clone(),
    };
    println!("{}", solve_with(stage, &options)?);

    Ok(())
}
