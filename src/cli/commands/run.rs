//! Run command - build a target for its side effects

use crate::cli::args::RunArgs;
use crate::cli::commands::{load_plan, ready_engine};
use crate::config::Config;
use crate::engine::Orchestrator;
use crate::error::StagecraftResult;
use crate::ui::{TaskSpinner, UiContext};
use tracing::debug;

/// Execute the run command
pub async fn execute(args: RunArgs, config: &Config) -> StagecraftResult<()> {
    let ctx = UiContext::detect();
    let loaded = load_plan(args.target.file.as_deref(), config).await?;
    let stage = loaded.plan.stage(&args.target.target)?;

    let engine = ready_engine(config).await?;
    let orchestrator =
        Orchestrator::new(engine.as_ref(), loaded.plan.project_dir()).with_config(&config.build);

    let label = match stage.task_name() {
        Some(task) => format!("Run: {task}"),
        None => "Run task".to_string(),
    };

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&label);
    match orchestrator.run(stage, &|line| debug!("{}", line)).await {
        Ok(()) => {
            spinner.stop(&label);
            Ok(())
        }
        Err(e) => {
            spinner.stop_error(&label);
            Err(e)
        }
    }
}
