//! Engine factory
//!
//! Turns the `[engine]` config section into a runnable engine.

use crate::config::{Config, ConfigManager};
use crate::engine::cli_engine::CliEngine;
use crate::engine::runtime::BuildEngine;
use crate::error::{StagecraftError, StagecraftResult};

/// Create the build engine selected in `config`
pub fn create_engine(config: &Config) -> StagecraftResult<Box<dyn BuildEngine>> {
    let kind = config.engine.engine_kind().ok_or_else(|| {
        StagecraftError::User(
            "engine.kind = \"depot\" requires engine.project to be set".to_string(),
        )
    })?;

    Ok(Box::new(CliEngine::new(kind, ConfigManager::builds_dir())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::EngineKindConfig;

    #[test]
    fn docker_by_default() {
        let engine = create_engine(&Config::default()).unwrap();
        assert_eq!(engine.engine_name(), "docker");
    }

    #[test]
    fn depot_requires_project() {
        let mut config = Config::default();
        config.engine.kind = EngineKindConfig::Depot;
        assert!(create_engine(&config).is_err());

        config.engine.project = Some("abc".to_string());
        let engine = create_engine(&config).unwrap();
        assert_eq!(engine.engine_name(), "depot (abc)");
    }
}
