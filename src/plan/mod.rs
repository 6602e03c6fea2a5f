//! Declarative build files
//!
//! A [`Plan`] is a TOML file of named stages resolved into [`Stage`] graphs.
//! Stages may build on each other (`from_stage`) and copy artifacts out of
//! each other (`copy_artifact`); references are resolved in sorted key
//! order so the generated stage names are the same on every load.

mod schema;

pub use schema::{PlanFile, StageDef, StepDef};

use crate::error::{StagecraftError, StagecraftResult};
use crate::instruction::{CacheMount, Chown, CommandForm};
use crate::stage::{NameGenerator, Stage};
use schema::{scalar_to_string, ArgDef, MountDef, RunDef, UserDef};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name looked up when no build file is given
pub const DEFAULT_PLAN_FILE: &str = "build.toml";

/// Target used when none is given
pub const DEFAULT_TARGET: &str = "default";

/// Load-time options
#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    /// Give every cache mount without an explicit id a stable one
    pub stable_cache_ids: bool,
}

/// A loaded build file with every stage resolved
#[derive(Debug, Clone)]
pub struct Plan {
    path: PathBuf,
    project_dir: PathBuf,
    descriptions: BTreeMap<String, String>,
    stages: BTreeMap<String, Stage>,
}

impl Plan {
    /// Load and resolve a build file
    pub async fn from_file<N>(path: &Path, names: &N, options: &PlanOptions) -> StagecraftResult<Self>
    where
        N: NameGenerator + ?Sized,
    {
        if !path.exists() {
            return Err(StagecraftError::PlanNotFound(path.to_path_buf()));
        }

        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            StagecraftError::io(format!("reading build file {}", path.display()), e)
        })?;

        let project_dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => std::env::current_dir()
                .map_err(|e| StagecraftError::io("resolving working directory", e))?,
        };

        Self::parse(&content, path, &project_dir, names, options)
    }

    /// Resolve build file `content`; `path` is used for error messages and
    /// `project_dir` seeds stable cache ids.
    pub fn parse<N>(
        content: &str,
        path: &Path,
        project_dir: &Path,
        names: &N,
        options: &PlanOptions,
    ) -> StagecraftResult<Self>
    where
        N: NameGenerator + ?Sized,
    {
        let file: PlanFile = toml::from_str(content).map_err(|e| StagecraftError::PlanInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut resolver = Resolver {
            defs: &file.stages,
            names,
            path,
            project_dir,
            options,
            built: HashMap::new(),
            resolving: HashSet::new(),
        };

        let mut stages = BTreeMap::new();
        for key in file.stages.keys() {
            let stage = resolver.resolve(key, key)?;
            stages.insert(key.clone(), stage);
        }

        let descriptions = file
            .stages
            .iter()
            .filter_map(|(key, def)| def.description.clone().map(|d| (key.clone(), d)))
            .collect();

        debug!("Loaded {} stages from {}", stages.len(), path.display());

        Ok(Self {
            path: path.to_path_buf(),
            project_dir: project_dir.to_path_buf(),
            descriptions,
            stages,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Target keys in sorted order
    pub fn targets(&self) -> Vec<&str> {
        self.stages.keys().map(String::as_str).collect()
    }

    pub fn description(&self, target: &str) -> Option<&str> {
        self.descriptions.get(target).map(String::as_str)
    }

    /// The resolved stage for `target`
    pub fn stage(&self, target: &str) -> StagecraftResult<&Stage> {
        self.stages
            .get(target)
            .ok_or_else(|| StagecraftError::TargetNotFound {
                target: target.to_string(),
                file: self.path.clone(),
            })
    }
}

struct Resolver<'p, N: ?Sized> {
    defs: &'p BTreeMap<String, StageDef>,
    names: &'p N,
    path: &'p Path,
    project_dir: &'p Path,
    options: &'p PlanOptions,
    built: HashMap<String, Stage>,
    resolving: HashSet<String>,
}

impl<N> Resolver<'_, N>
where
    N: NameGenerator + ?Sized,
{
    fn resolve(&mut self, key: &str, referenced_by: &str) -> StagecraftResult<Stage> {
        if let Some(stage) = self.built.get(key) {
            return Ok(stage.clone());
        }

        let def = self
            .defs
            .get(key)
            .ok_or_else(|| StagecraftError::UnknownStage {
                name: key.to_string(),
                referenced_by: referenced_by.to_string(),
            })?;

        if !self.resolving.insert(key.to_string()) {
            return Err(StagecraftError::CircularStage(key.to_string()));
        }

        let mut stage = match (&def.from, &def.from_stage) {
            (Some(image), None) => Stage::from_base(self.names, image.as_str()),
            (None, Some(parent)) => {
                let parent = self.resolve(parent, key)?;
                Stage::from_base(self.names, &parent)
            }
            _ => {
                return Err(self.invalid(format!(
                    "stage `{key}` must set exactly one of `from` or `from_stage`"
                )))
            }
        };
        debug!("Resolving stage {} as {}", key, stage.name());

        for step in &def.steps {
            stage = self.apply(stage, key, step)?;
        }
        if let Some(tag) = &def.tag {
            stage = stage.with_tag(tag);
        }

        self.resolving.remove(key);
        self.built.insert(key.to_string(), stage.clone());
        Ok(stage)
    }

    fn apply(&mut self, stage: Stage, key: &str, step: &StepDef) -> StagecraftResult<Stage> {
        let next = match step {
            StepDef::Run(RunDef::Command(command)) => stage.run(command),
            StepDef::Run(RunDef::Detailed { command, cache }) => {
                let mounts = cache
                    .iter()
                    .map(|m| self.mount(key, m))
                    .collect::<StagecraftResult<Vec<_>>>()?;
                stage.run_with_mounts(command, mounts)
            }
            StepDef::Copy(copy) => match &copy.chown {
                Some(chown) => stage.copy_owned(&copy.src, &copy.dest, Chown::from(chown.clone())),
                None => stage.copy(&copy.src, &copy.dest),
            },
            StepDef::CopyArtifact(artifact) => {
                let source = self.resolve(&artifact.stage, key)?;
                let saved = source.save_artifact(&artifact.path);
                match &artifact.chown {
                    Some(chown) => stage.copy_artifact_owned(
                        &saved,
                        &artifact.dest,
                        Chown::from(chown.clone()),
                    ),
                    None => stage.copy_artifact(&saved, &artifact.dest),
                }
            }
            StepDef::Env(vars) => stage.env(vars.iter().map(|(k, v)| (k, scalar_to_string(v)))),
            StepDef::Label(labels) => {
                stage.label(labels.iter().map(|(k, v)| (k, scalar_to_string(v))))
            }
            StepDef::Expose(port) => stage.expose(*port),
            StepDef::Workdir(path) => stage.workdir(path),
            StepDef::User(UserDef::Name(name)) => stage.user(name),
            StepDef::User(UserDef::WithGroup { name, group }) => stage.user_group(name, group),
            StepDef::Cmd(command) => stage.cmd(CommandForm::from(command.clone())),
            StepDef::Entrypoint(command) => stage.entrypoint(CommandForm::from(command.clone())),
            StepDef::Volume(paths) => stage.volume(CommandForm::from(paths.clone())),
            StepDef::Arg(ArgDef::Name(name)) => stage.arg(name),
            StepDef::Arg(ArgDef::WithDefault { name, default }) => match default {
                Some(value) => stage.arg_default(name, scalar_to_string(value)),
                None => stage.arg(name),
            },
            StepDef::Shell(command) => {
                if command.is_empty() {
                    return Err(self.invalid(format!("stage `{key}` has an empty shell")));
                }
                stage.shell(command.iter().cloned())
            }
            StepDef::AptInstall(packages) => stage.apt_install(packages.as_slice()),
            StepDef::Cargo(subcommand) => stage.cargo(subcommand),
            StepDef::RustToolchain(version) => stage.install_rust_toolchain(version),
        };
        Ok(next)
    }

    fn mount(&self, key: &str, def: &MountDef) -> StagecraftResult<CacheMount> {
        if let Some(field) = def.unknown.keys().next() {
            return Err(self.invalid(format!(
                "stage `{key}`: unknown cache mount key `{field}`"
            )));
        }

        let wants_stable = def.stable_id || (self.options.stable_cache_ids && def.mount.id.is_none());
        Ok(if wants_stable {
            def.mount.clone().stable_id(self.project_dir)
        } else {
            def.mount.clone()
        })
    }

    fn invalid(&self, reason: String) -> StagecraftError {
        StagecraftError::PlanInvalid {
            path: self.path.to_path_buf(),
            reason,
        }
    }
}
