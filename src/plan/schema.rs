//! Build file schema
//!
//! A build file declares named stages:
//!
//! ```toml
//! [stages.build]
//! from = "rust:1.82"
//! steps = [
//!     { workdir = "/app" },
//!     { copy = { src = ".", dest = "." } },
//!     { run = { command = "cargo build --release", cache = [{ target = "/usr/local/cargo/registry", stable_id = true }] } },
//! ]
//!
//! [stages.default]
//! from = "debian:bookworm-slim"
//! steps = [
//!     { copy_artifact = { stage = "build", path = "/app/target/release/app", dest = "/usr/local/bin/app" } },
//!     { cmd = ["/usr/local/bin/app"] },
//! ]
//! ```

use crate::instruction::{CacheMount, Chown, CommandForm};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Parsed build file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanFile {
    /// Stage definitions keyed by target name
    #[serde(default)]
    pub stages: BTreeMap<String, StageDef>,
}

/// One `[stages.<key>]` table
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageDef {
    /// Base image reference
    pub from: Option<String>,

    /// Key of another stage to build on
    pub from_stage: Option<String>,

    /// Image tag used by `build` and `push`
    pub tag: Option<String>,

    /// Shown by `ls`
    pub description: Option<String>,

    #[serde(default)]
    pub steps: Vec<StepDef>,
}

/// A single step, written as a one-key table
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepDef {
    Run(RunDef),
    Copy(CopyDef),
    CopyArtifact(ArtifactDef),
    Env(BTreeMap<String, toml::Value>),
    Label(BTreeMap<String, toml::Value>),
    Expose(u16),
    Workdir(String),
    User(UserDef),
    Cmd(CommandDef),
    Entrypoint(CommandDef),
    Volume(CommandDef),
    Arg(ArgDef),
    Shell(Vec<String>),
    AptInstall(Vec<String>),
    Cargo(String),
    RustToolchain(String),
}

/// `run = "cmd"` or `run = { command = "cmd", cache = [...] }`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RunDef {
    Command(String),
    Detailed {
        command: String,
        #[serde(default)]
        cache: Vec<MountDef>,
    },
}

/// Cache mount entry of a `run` step
#[derive(Debug, Clone, Deserialize)]
pub struct MountDef {
    #[serde(flatten)]
    pub mount: CacheMount,

    /// Derive the mount id from the project directory and target
    #[serde(default)]
    pub stable_id: bool,

    /// Keys the mount did not recognise, rejected when the plan resolves
    #[serde(flatten)]
    pub unknown: BTreeMap<String, toml::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CopyDef {
    pub src: String,
    pub dest: String,
    pub chown: Option<ChownDef>,
}

/// Copy of a path out of another stage of the same file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArtifactDef {
    /// Key of the producing stage
    pub stage: String,
    pub path: String,
    pub dest: String,
    pub chown: Option<ChownDef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChownDef {
    pub user: String,
    pub group: String,
}

impl From<ChownDef> for Chown {
    fn from(def: ChownDef) -> Self {
        Chown::new(def.user, def.group)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum UserDef {
    Name(String),
    WithGroup { name: String, group: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CommandDef {
    Shell(String),
    Exec(Vec<String>),
}

impl From<CommandDef> for CommandForm {
    fn from(def: CommandDef) -> Self {
        match def {
            CommandDef::Shell(line) => CommandForm::Shell(line),
            CommandDef::Exec(args) => CommandForm::Exec(args),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ArgDef {
    Name(String),
    WithDefault {
        name: String,
        default: Option<toml::Value>,
    },
}

/// Render a TOML scalar the way it reads in the file
pub(crate) fn scalar_to_string(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_step_kind() {
        let content = r#"
[stages.default]
from = "ubuntu:20.04"
tag = "example/app"
steps = [
    { run = "echo hi" },
    { run = { command = "make", cache = [{ target = "/ccache", sharing = "shared", stable_id = true }] } },
    { copy = { src = "a", dest = "b", chown = { user = "app", group = "app" } } },
    { copy_artifact = { stage = "other", path = "/out", dest = "/in" } },
    { env = { ROCKET_PORT = 8080, MODE = "release" } },
    { label = { team = "infra" } },
    { expose = 8000 },
    { workdir = "/root" },
    { user = "app" },
    { user = { name = "app", group = "staff" } },
    { cmd = ["./bin"] },
    { entrypoint = "./start.sh" },
    { volume = ["/data"] },
    { arg = "TARGET" },
    { arg = { name = "VERSION", default = 3 } },
    { shell = ["/bin/bash", "-c"] },
    { apt_install = ["curl"] },
    { cargo = "build --release" },
    { rust_toolchain = "1.63.0" },
]
"#;
        let plan: PlanFile = toml::from_str(content).unwrap();
        let stage = &plan.stages["default"];
        assert_eq!(stage.from.as_deref(), Some("ubuntu:20.04"));
        assert_eq!(stage.steps.len(), 19);

        match &stage.steps[1] {
            StepDef::Run(RunDef::Detailed { command, cache }) => {
                assert_eq!(command, "make");
                assert_eq!(cache[0].mount.target, "/ccache");
                assert!(cache[0].stable_id);
            }
            other => panic!("unexpected step: {other:?}"),
        }
        assert!(matches!(stage.steps[9], StepDef::User(UserDef::WithGroup { .. })));
        assert!(matches!(stage.steps[10], StepDef::Cmd(CommandDef::Exec(_))));
        assert!(matches!(stage.steps[11], StepDef::Entrypoint(CommandDef::Shell(_))));
    }

    #[test]
    fn rejects_unknown_step() {
        let content = r#"
[stages.default]
from = "alpine"
steps = [{ teleport = "/" }]
"#;
        assert!(toml::from_str::<PlanFile>(content).is_err());
    }

    #[test]
    fn scalar_rendering() {
        assert_eq!(scalar_to_string(&toml::Value::Integer(8080)), "8080");
        assert_eq!(scalar_to_string(&toml::Value::String("x".into())), "x");
        assert_eq!(scalar_to_string(&toml::Value::Boolean(true)), "true");
    }
}
