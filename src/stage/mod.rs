//! Immutable build stages
//!
//! A [`Stage`] is one `FROM ... AS <name>` block of a multi-stage manifest.
//! Stages are values: every builder method returns a new stage and leaves the
//! receiver untouched. Unchanged instructions and dependencies are shared
//! between the two through [`Chain`].
//!
//! ```rust,ignore
//! use stagecraft::{solve, SequentialNames, Stage};
//!
//! let names = SequentialNames::new();
//! let build = Stage::from_base(&names, "rust:1.82")
//!     .workdir("/app")
//!     .copy(".", ".")
//!     .cargo("build --release");
//! let binary = build.save_artifact("/app/target/release/server");
//!
//! let app = Stage::from_base(&names, "debian:bookworm-slim")
//!     .copy_artifact(&binary, "/usr/local/bin/server")
//!     .cmd(["/usr/local/bin/server"]);
//!
//! println!("{}", solve(&app)?);
//! ```

mod chain;
mod names;

pub use chain::Chain;
pub use names::{NameGenerator, SequentialNames, UuidNames};

use crate::instruction::{CacheMount, Chown, CommandForm, Instruction};
use crate::recipes;
use std::fmt;
use std::sync::Arc;

/// What a stage is built on top of
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Base {
    /// An image reference such as `ubuntu:20.04`
    Image(String),
    /// Another stage, referenced by its assigned name
    Stage(String),
}

impl Base {
    /// The reference written after `FROM`
    pub fn reference(&self) -> &str {
        match self {
            Self::Image(image) => image,
            Self::Stage(name) => name,
        }
    }
}

/// Argument accepted by [`Stage::from_base`]
#[derive(Debug)]
pub enum BaseRef<'a> {
    Image(String),
    Stage(&'a Stage),
}

impl From<&str> for BaseRef<'_> {
    fn from(image: &str) -> Self {
        Self::Image(image.to_string())
    }
}

impl From<String> for BaseRef<'_> {
    fn from(image: String) -> Self {
        Self::Image(image)
    }
}

impl<'a> From<&'a Stage> for BaseRef<'a> {
    fn from(stage: &'a Stage) -> Self {
        Self::Stage(stage)
    }
}

/// One stage of a multi-stage build
#[derive(Debug, Clone)]
pub struct Stage {
    name: Arc<str>,
    base: Base,
    layers: Chain<Instruction>,
    dependencies: Chain<Stage>,
    tag: Option<String>,
}

impl Stage {
    /// Start a new stage on `base` with a fresh name from `names`.
    ///
    /// When `base` is another stage, that stage becomes the first dependency.
    pub fn from_base<'a, N>(names: &N, base: impl Into<BaseRef<'a>>) -> Self
    where
        N: NameGenerator + ?Sized,
    {
        let name: Arc<str> = names.next_name().into();
        let (base, dependencies) = match base.into() {
            BaseRef::Image(image) => (Base::Image(image), Chain::new()),
            BaseRef::Stage(stage) => (
                Base::Stage(stage.name().to_string()),
                Chain::new().push(stage.clone()),
            ),
        };

        Self {
            name,
            base,
            layers: Chain::new(),
            dependencies,
            tag: None,
        }
    }

    /// The assigned stage name, unique per generator
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base(&self) -> &Base {
        &self.base
    }

    /// Instructions in declaration order
    pub fn instructions(&self) -> Vec<&Instruction> {
        self.layers.to_vec()
    }

    /// Stages this one reads from, in the order they were linked
    pub fn dependencies(&self) -> Vec<&Stage> {
        self.dependencies.to_vec()
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// The command of the last instruction when it is a RUN
    pub fn task_name(&self) -> Option<&str> {
        match self.layers.last() {
            Some(Instruction::Run { command, .. }) => Some(command),
            _ => None,
        }
    }

    /// True when `other` carries the same name and the same definition
    pub fn same_definition(&self, other: &Stage) -> bool {
        if self.name != other.name || self.base != other.base {
            return false;
        }
        if self.layers.ptr_eq(&other.layers) && self.dependencies.ptr_eq(&other.dependencies) {
            return true;
        }
        let own: Vec<&str> = self.dependencies.to_vec().into_iter().map(Stage::name).collect();
        let theirs: Vec<&str> = other.dependencies.to_vec().into_iter().map(Stage::name).collect();
        own == theirs && self.layers == other.layers
    }

    /// True when both stages hold the very same dependency chain
    pub(crate) fn shares_dependencies(&self, other: &Stage) -> bool {
        self.dependencies.ptr_eq(&other.dependencies)
    }

    /// Append a single instruction
    pub fn push(&self, instruction: Instruction) -> Self {
        Self {
            layers: self.layers.push(instruction),
            ..self.clone()
        }
    }

    /// Append several instructions at once
    pub fn with(&self, instructions: impl IntoIterator<Item = Instruction>) -> Self {
        let layers = instructions
            .into_iter()
            .fold(self.layers.clone(), |layers, instruction| layers.push(instruction));
        Self {
            layers,
            ..self.clone()
        }
    }

    pub fn run(&self, command: impl Into<String>) -> Self {
        self.push(Instruction::run(command))
    }

    pub fn run_with_mounts(&self, command: impl Into<String>, mounts: Vec<CacheMount>) -> Self {
        self.push(Instruction::run_with_mounts(command, mounts))
    }

    pub fn cmd(&self, command: impl Into<CommandForm>) -> Self {
        self.push(Instruction::Cmd {
            command: command.into(),
        })
    }

    pub fn entrypoint(&self, command: impl Into<CommandForm>) -> Self {
        self.push(Instruction::Entrypoint {
            command: command.into(),
        })
    }

    pub fn volume(&self, paths: impl Into<CommandForm>) -> Self {
        self.push(Instruction::Volume {
            paths: paths.into(),
        })
    }

    pub fn label<K, V>(&self, labels: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: ToString,
    {
        self.push(Instruction::label(labels))
    }

    pub fn env<K, V>(&self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: ToString,
    {
        self.push(Instruction::env(vars))
    }

    pub fn expose(&self, port: u16) -> Self {
        self.push(Instruction::Expose { port })
    }

    pub fn copy(&self, source: impl Into<String>, destination: impl Into<String>) -> Self {
        self.push(Instruction::copy(source, destination))
    }

    pub fn copy_owned(
        &self,
        source: impl Into<String>,
        destination: impl Into<String>,
        chown: Chown,
    ) -> Self {
        self.push(Instruction::Copy {
            source: source.into(),
            destination: destination.into(),
            chown: Some(chown),
            from: None,
        })
    }

    pub fn workdir(&self, path: impl Into<String>) -> Self {
        self.push(Instruction::WorkDir { path: path.into() })
    }

    pub fn user(&self, name: impl Into<String>) -> Self {
        self.push(Instruction::User {
            name: name.into(),
            group: None,
        })
    }

    pub fn user_group(&self, name: impl Into<String>, group: impl Into<String>) -> Self {
        self.push(Instruction::User {
            name: name.into(),
            group: Some(group.into()),
        })
    }

    pub fn arg(&self, name: impl Into<String>) -> Self {
        self.push(Instruction::Arg {
            name: name.into(),
            default: None,
        })
    }

    pub fn arg_default(&self, name: impl Into<String>, default: impl ToString) -> Self {
        self.push(Instruction::Arg {
            name: name.into(),
            default: Some(default.to_string()),
        })
    }

    pub fn shell<S: Into<String>>(&self, command: impl IntoIterator<Item = S>) -> Self {
        self.push(Instruction::Shell {
            command: command.into_iter().map(Into::into).collect(),
        })
    }

    /// Install Debian packages with the apt caches mounted
    pub fn apt_install<S: AsRef<str>>(&self, packages: &[S]) -> Self {
        self.push(recipes::apt_install(packages))
    }

    /// Run a cargo subcommand with the registry cache mounted
    pub fn cargo(&self, subcommand: &str) -> Self {
        self.push(recipes::cargo(subcommand))
    }

    pub fn install_rust_toolchain(&self, version: &str) -> Self {
        self.with(recipes::install_rust_toolchain(version))
    }

    /// Attach the image tag used when this stage is built and pushed
    pub fn with_tag(&self, tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            ..self.clone()
        }
    }

    /// Reference a path inside this stage's filesystem
    pub fn save_artifact(&self, path: impl Into<String>) -> Artifact {
        Artifact {
            source: self.clone(),
            path: path.into(),
        }
    }

    /// Copy an artifact out of its stage into this one.
    ///
    /// The artifact's stage is linked as a dependency unless that exact stage
    /// is already linked. A diverging stage under a linked name is still
    /// linked so that solving reports the collision.
    pub fn copy_artifact(&self, artifact: &Artifact, destination: impl Into<String>) -> Self {
        self.link_artifact(artifact, destination.into(), None)
    }

    pub fn copy_artifact_owned(
        &self,
        artifact: &Artifact,
        destination: impl Into<String>,
        chown: Chown,
    ) -> Self {
        self.link_artifact(artifact, destination.into(), Some(chown))
    }

    fn link_artifact(&self, artifact: &Artifact, destination: String, chown: Option<Chown>) -> Self {
        let source = artifact.source();
        let copy = Instruction::Copy {
            source: artifact.path().to_string(),
            destination,
            chown,
            from: Some(source.name().to_string()),
        };

        let already_linked = self
            .dependencies
            .to_vec()
            .iter()
            .any(|dep| dep.same_definition(source) && dep.shares_dependencies(source));
        let dependencies = if already_linked {
            self.dependencies.clone()
        } else {
            self.dependencies.push(source.clone())
        };

        Self {
            layers: self.layers.push(copy),
            dependencies,
            ..self.clone()
        }
    }

    /// Render the `FROM` header followed by every instruction
    pub fn serialize(&self) -> String {
        let mut lines = Vec::with_capacity(self.layers.len() + 1);
        lines.push(format!("FROM {} AS {}", self.base.reference(), self.name));
        lines.extend(self.layers.to_vec().iter().map(|i| i.serialize()));
        lines.join("\n")
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

/// A path inside a stage, copyable into other stages
#[derive(Debug, Clone)]
pub struct Artifact {
    source: Stage,
    path: String,
}

impl Artifact {
    pub fn source(&self) -> &Stage {
        &self.source
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}
