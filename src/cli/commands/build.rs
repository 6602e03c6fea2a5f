//! Build command - build and tag a target

use crate::cli::args::BuildArgs;
use crate::cli::commands::{load_plan, ready_engine};
use crate::config::Config;
use crate::engine::Orchestrator;
use crate::error::StagecraftResult;
use crate::ui::{self, BuildProgress, UiContext};

/// Execute the build command
pub async fn execute(args: BuildArgs, config: &Config) -> StagecraftResult<()> {
    let ctx = UiContext::detect();
    let loaded = load_plan(args.target.file.as_deref(), config).await?;

    let mut stage = loaded.plan.stage(&args.target.target)?.clone();
    if let Some(tag) = args.tag {
        stage = stage.with_tag(tag);
    }

    let engine = ready_engine(config).await?;
    let orchestrator =
        Orchestrator::new(engine.as_ref(), loaded.plan.project_dir()).with_config(&config.build);

    let progress = BuildProgress::new(&ctx, &args.target.target);
    let result = orchestrator
        .build(&stage, args.push, &|line| progress.on_line(line))
        .await;
    progress.finish();
    let tag = result?;

    let message = if args.push { "Built and pushed" } else { "Built" };
    ui::step_ok_detail(&ctx, message, &tag);

    Ok(())
}
