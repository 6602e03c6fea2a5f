//! Save command - export a path from a target to the host

use crate::cli::args::SaveArgs;
use crate::cli::commands::{load_plan, ready_engine};
use crate::config::Config;
use crate::engine::Orchestrator;
use crate::error::StagecraftResult;
use crate::ui::{TaskSpinner, UiContext};
use tracing::debug;

/// Execute the save command
pub async fn execute(args: SaveArgs, config: &Config) -> StagecraftResult<()> {
    let ctx = UiContext::detect();
    let loaded = load_plan(args.target.file.as_deref(), config).await?;
    let artifact = loaded
        .plan
        .stage(&args.target.target)?
        .save_artifact(&args.path);

    let engine = ready_engine(config).await?;
    let orchestrator =
        Orchestrator::new(engine.as_ref(), loaded.plan.project_dir()).with_config(&config.build);

    let label = format!("Save: {}", args.path);
    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&label);

    let result = orchestrator
        .save(&artifact, &args.dest, &loaded.names, &|line| debug!("{}", line))
        .await;
    match result {
        Ok(()) => {
            spinner.stop(&format!("Saved {} to {}", args.path, args.dest.display()));
            Ok(())
        }
        Err(e) => {
            spinner.stop_error(&label);
            Err(e)
        }
    }
}
