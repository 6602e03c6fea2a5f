//! Build engine orchestration
//!
//! Solved manifests are handed to an external BuildKit frontend:
//! - `docker buildx build` for local builds
//! - `depot build` for remote builders
//!
//! [`Orchestrator`] implements the user-facing operations (build, push,
//! run, save) on top of any [`BuildEngine`].

mod cli_engine;
mod factory;
mod ops;
mod runtime;

pub use cli_engine::CliEngine;
pub use factory::create_engine;
pub use ops::{content_tag, Orchestrator};
pub use runtime::BuildEngine;

use crate::error::{StagecraftError, StagecraftResult};
use std::fmt;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Max number of output lines to include in build error messages.
const BUILD_ERROR_TAIL_LINES: usize = 50;

/// File name the manifest is written under inside a build directory
pub const MANIFEST_FILE: &str = "Dockerfile";

/// Which CLI drives the build
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineKind {
    Docker,
    Depot { project: String },
}

impl EngineKind {
    /// Executable to spawn
    pub fn program(&self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Depot { .. } => "depot",
        }
    }

    /// Leading arguments of a build invocation
    pub fn build_args(&self) -> Vec<String> {
        match self {
            Self::Docker => vec!["buildx".to_string(), "build".to_string()],
            Self::Depot { project } => vec![
                "build".to_string(),
                "--suppress-no-output-warning".to_string(),
                "--project".to_string(),
                project.clone(),
            ],
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Docker => f.write_str("docker"),
            Self::Depot { project } => write!(f, "depot ({project})"),
        }
    }
}

/// One invocation of the engine's build command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    /// Manifest file passed with `-f`
    pub manifest_path: PathBuf,

    /// Build context directory
    pub context: PathBuf,

    pub tag: Option<String>,

    /// Suppress build output (`--quiet`)
    pub quiet: bool,

    /// Export the result to a local directory instead of an image
    pub output: Option<PathBuf>,

    /// Push the tagged image once built
    pub push: bool,
}

impl BuildRequest {
    pub fn new(context: impl Into<PathBuf>) -> Self {
        Self {
            manifest_path: PathBuf::from(MANIFEST_FILE),
            context: context.into(),
            tag: None,
            quiet: false,
            output: None,
            push: false,
        }
    }

    pub fn manifest_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.manifest_path = path.into();
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    pub fn output(mut self, dest: impl Into<PathBuf>) -> Self {
        self.output = Some(dest.into());
        self
    }

    pub fn push(mut self, push: bool) -> Self {
        self.push = push;
        self
    }

    /// Name used in progress and error messages
    pub fn label(&self) -> String {
        self.tag
            .clone()
            .unwrap_or_else(|| "untagged build".to_string())
    }

    /// Full argument list for `kind`, excluding the program name
    pub fn args(&self, kind: &EngineKind) -> Vec<String> {
        let mut args = kind.build_args();

        if self.quiet {
            args.push("--quiet".to_string());
        }
        if let Some(tag) = &self.tag {
            args.push("-t".to_string());
            args.push(tag.clone());
        }
        if let Some(dest) = &self.output {
            args.push("--output".to_string());
            args.push(format!("type=local,dest={}", dest.display()));
        }
        if self.push {
            args.push("--push".to_string());
        }
        args.push("-f".to_string());
        args.push(self.manifest_path.display().to_string());
        args.push(self.context.display().to_string());

        args
    }
}

/// Extract the useful tail of build output for error diagnostics.
pub(crate) fn build_error_output(stdout: &str, stderr: &str) -> String {
    let lines: Vec<&str> = stdout.lines().chain(stderr.lines()).collect();
    let start = lines.len().saturating_sub(BUILD_ERROR_TAIL_LINES);
    lines[start..].join("\n")
}

/// Stream stdout+stderr from a child process, calling `on_output` for each line.
///
/// Returns every collected line for error reporting.
pub(crate) async fn stream_child_output(
    child: &mut tokio::process::Child,
    on_output: &(dyn Fn(String) + Send + Sync),
) -> StagecraftResult<Vec<String>> {
    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        return Err(StagecraftError::User(
            "engine output was not captured".to_string(),
        ));
    };

    let mut stderr_reader = BufReader::new(stderr).lines();
    let mut stdout_reader = BufReader::new(stdout).lines();

    let mut all_output = Vec::new();
    let mut stderr_done = false;
    let mut stdout_done = false;

    while !stderr_done || !stdout_done {
        tokio::select! {
            line = stderr_reader.next_line(), if !stderr_done => {
                match line {
                    Ok(Some(line)) => {
                        on_output(line.clone());
                        all_output.push(line);
                    }
                    _ => stderr_done = true,
                }
            }
            line = stdout_reader.next_line(), if !stdout_done => {
                match line {
                    Ok(Some(line)) => {
                        on_output(line.clone());
                        all_output.push(line);
                    }
                    _ => stdout_done = true,
                }
            }
        }
    }

    Ok(all_output)
}
