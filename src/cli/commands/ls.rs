//! Ls command - list the targets of a build file

use crate::cli::args::{LsArgs, OutputFormat};
use crate::cli::commands::load_plan;
use crate::config::Config;
use crate::error::StagecraftResult;
use crate::plan::Plan;
use crate::ui::{self, UiContext};
use console::style;
use serde::Serialize;

/// One listed target
#[derive(Debug, Serialize)]
struct TargetInfo<'a> {
    target: &'a str,
    base: &'a str,
    steps: usize,
    tag: Option<&'a str>,
    description: Option<&'a str>,
}

/// Execute the ls command
pub async fn execute(args: LsArgs, config: &Config) -> StagecraftResult<()> {
    let loaded = load_plan(args.file.as_deref(), config).await?;
    let targets = describe(&loaded.plan)?;

    if targets.is_empty() {
        match args.format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => {
                let ctx = UiContext::detect();
                ui::step_info(
                    &ctx,
                    &format!("No targets in {}", loaded.plan.path().display()),
                );
            }
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&targets),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&targets)?),
        OutputFormat::Plain => {
            for info in &targets {
                println!("{}", info.target);
            }
        }
    }

    Ok(())
}

fn describe(plan: &Plan) -> StagecraftResult<Vec<TargetInfo<'_>>> {
    plan.targets()
        .into_iter()
        .map(|target| {
            let stage = plan.stage(target)?;
            Ok(TargetInfo {
                target,
                base: stage.base().reference(),
                steps: stage.instructions().len(),
                tag: stage.tag(),
                description: plan.description(target),
            })
        })
        .collect()
}

fn print_table(targets: &[TargetInfo<'_>]) {
    println!(
        "{:<20} {:<28} {:<6} {:<30}",
        style("TARGET").bold(),
        style("BASE").bold(),
        style("STEPS").bold(),
        style("TAG").bold()
    );
    println!("{}", "-".repeat(86));

    for info in targets {
        println!(
            "{:<20} {:<28} {:<6} {:<30}",
            info.target,
            info.base,
            info.steps,
            info.tag.unwrap_or("-")
        );
        if let Some(description) = info.description {
            println!("  {}", style(description).dim());
        }
    }

    println!();
    println!("{} target(s)", targets.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::PlanOptions;
    use crate::stage::SequentialNames;
    use std::path::Path;

    #[test]
    fn describe_lists_every_target() {
        let plan = Plan::parse(
            r#"
[stages.builder]
from = "rust:1.82"
steps = [{ cargo = "build" }]

[stages.default]
from_stage = "builder"
tag = "example/app"
description = "Release image"
steps = [{ cmd = ["app"] }, { expose = 80 }]
"#,
            Path::new("build.toml"),
            Path::new("/src"),
            &SequentialNames::new(),
            &PlanOptions::default(),
        )
        .unwrap();

        let targets = describe(&plan).unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].target, "builder");
        assert_eq!(targets[0].base, "rust:1.82");
        assert_eq!(targets[1].base, "stage-0");
        assert_eq!(targets[1].steps, 2);
        assert_eq!(targets[1].tag, Some("example/app"));

        let json = serde_json::to_value(&targets).unwrap();
        assert_eq!(json[1]["description"], "Release image");
    }
}
