//! CLI command implementations

pub mod build;
pub mod cache_id;
pub mod config;
pub mod ls;
pub mod preview;
pub mod run;
pub mod save;

pub use build::execute as build;
pub use cache_id::execute as cache_id;
pub use config::execute as config;
pub use ls::execute as ls;
pub use preview::execute as preview;
pub use run::execute as run;
pub use save::execute as save;

use crate::config::Config;
use crate::engine::{create_engine, BuildEngine};
use crate::error::{StagecraftError, StagecraftResult};
use crate::plan::{Plan, PlanOptions};
use crate::stage::SequentialNames;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A loaded build file with the generator that named its stages
pub(crate) struct LoadedPlan {
    pub plan: Plan,
    pub names: SequentialNames,
}

/// Load `file`, or the configured default build file
pub(crate) async fn load_plan(file: Option<&Path>, config: &Config) -> StagecraftResult<LoadedPlan> {
    let path = file
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.build.default_file));
    debug!("Loading build file {}", path.display());

    let names = SequentialNames::new();
    let options = PlanOptions {
        stable_cache_ids: config.build.stable_cache_ids,
    };
    let plan = Plan::from_file(&path, &names, &options).await?;

    Ok(LoadedPlan { plan, names })
}

/// Create the configured engine and check that its CLI answers
pub(crate) async fn ready_engine(config: &Config) -> StagecraftResult<Box<dyn BuildEngine>> {
    let engine = create_engine(config)?;
    if !engine.is_available().await {
        return Err(StagecraftError::EngineNotFound(engine.engine_name()));
    }
    debug!("Using engine: {}", engine.engine_name());
    Ok(engine)
}
