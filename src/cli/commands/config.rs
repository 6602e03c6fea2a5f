//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::schema::EngineKindConfig;
use crate::config::{Config, ConfigManager, LOCAL_CONFIG_FILE};
use crate::error::{StagecraftError, StagecraftResult};
use crate::ui::{self, UiContext};
use std::path::Path;
use tokio::fs;

/// Keys accepted by `config set`
const VALID_KEYS: [&str; 7] = [
    "general.log_format",
    "build.syntax",
    "build.tag_prefix",
    "build.default_file",
    "build.stable_cache_ids",
    "engine.kind",
    "engine.project",
];

/// Execute the config command
pub async fn execute(
    args: ConfigArgs,
    config: &Config,
    manager: &ConfigManager,
) -> StagecraftResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value, local }) => {
            if local {
                let cwd = std::env::current_dir()
                    .map_err(|e| StagecraftError::io("getting current directory", e))?;
                set_local_value(&cwd.join(LOCAL_CONFIG_FILE), &key, &value).await?
            } else {
                set_value(manager, config, &key, &value).await?
            }
        }
    }

    Ok(())
}

fn show_config(config: &Config) -> StagecraftResult<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> StagecraftResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    ui::step_ok_detail(&ctx, "Configuration initialized", &path.display().to_string());

    Ok(())
}

async fn set_value(
    manager: &ConfigManager,
    config: &Config,
    key: &str,
    value: &str,
) -> StagecraftResult<()> {
    let mut config = config.clone();
    apply_value(&mut config, key, value)?;

    manager.save(&config).await?;
    ui::step_ok(&UiContext::detect(), &format!("Set {} = {}", key, value));

    Ok(())
}

/// Assign `value` to the typed field named by `key`
fn apply_value(config: &mut Config, key: &str, value: &str) -> StagecraftResult<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["general", "log_format"] => config.general.log_format = parse_log_format(value)?,
        ["build", "syntax"] => config.build.syntax = value.to_string(),
        ["build", "tag_prefix"] => config.build.tag_prefix = value.to_string(),
        ["build", "default_file"] => config.build.default_file = value.to_string(),
        ["build", "stable_cache_ids"] => config.build.stable_cache_ids = parse_bool(value)?,
        ["engine", "kind"] => config.engine.kind = parse_engine_kind(value)?,
        ["engine", "project"] => config.engine.project = Some(value.to_string()),
        _ => return Err(unknown_key(key)),
    }

    Ok(())
}

/// Write only the given key into a project-local file, keeping its other keys
async fn set_local_value(local_path: &Path, key: &str, value: &str) -> StagecraftResult<()> {
    // Validate through the typed config before touching the file
    apply_value(&mut Config::default(), key, value)?;

    let mut doc: toml::Value = if local_path.exists() {
        let content = fs::read_to_string(local_path)
            .await
            .map_err(|e| StagecraftError::io(format!("reading {}", local_path.display()), e))?;
        content
            .parse()
            .map_err(|e: toml::de::Error| StagecraftError::ConfigInvalid {
                path: local_path.to_path_buf(),
                reason: e.to_string(),
            })?
    } else {
        toml::Value::Table(toml::map::Map::new())
    };

    set_toml_value(&mut doc, key, value)?;

    let content = toml::to_string_pretty(&doc)?;
    fs::write(local_path, content)
        .await
        .map_err(|e| StagecraftError::io(format!("writing {}", local_path.display()), e))?;

    ui::step_ok(
        &UiContext::detect(),
        &format!("Set {} = {} in {}", key, value, local_path.display()),
    );

    Ok(())
}

/// Set a `section.field` key in a TOML value tree, creating the section as needed.
fn set_toml_value(doc: &mut toml::Value, key: &str, value: &str) -> StagecraftResult<()> {
    let (section, field) = key.split_once('.').ok_or_else(|| unknown_key(key))?;

    let table = doc
        .as_table_mut()
        .ok_or_else(|| StagecraftError::User("Expected a table at the top level".to_string()))?
        .entry(section)
        .or_insert_with(|| toml::Value::Table(toml::map::Map::new()))
        .as_table_mut()
        .ok_or_else(|| StagecraftError::User(format!("Expected table for key: {}", section)))?;

    let toml_value = if key == "build.stable_cache_ids" {
        toml::Value::Boolean(parse_bool(value)?)
    } else {
        toml::Value::String(value.to_string())
    };

    table.insert(field.to_string(), toml_value);
    Ok(())
}

fn unknown_key(key: &str) -> StagecraftError {
    StagecraftError::User(format!(
        "Unknown config key: {}. Valid keys: {}",
        key,
        VALID_KEYS.join(", ")
    ))
}

fn parse_bool(value: &str) -> StagecraftResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(StagecraftError::User(format!(
            "Invalid boolean value: {}. Use true/false",
            value
        ))),
    }
}

fn parse_log_format(value: &str) -> StagecraftResult<String> {
    match value {
        "text" | "json" => Ok(value.to_string()),
        _ => Err(StagecraftError::User(format!(
            "Invalid log format: {}. Use text/json",
            value
        ))),
    }
}

fn parse_engine_kind(value: &str) -> StagecraftResult<EngineKindConfig> {
    match value {
        "docker" => Ok(EngineKindConfig::Docker),
        "depot" => Ok(EngineKindConfig::Depot),
        _ => Err(StagecraftError::User(format!(
            "Invalid engine: {}. Use docker/depot",
            value
        ))),
    }
}
