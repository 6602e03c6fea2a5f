//! Engine backed by an installed BuildKit CLI
//!
//! Each build gets a throwaway directory under the state dir holding the
//! manifest; the directory is removed once the engine exits.

use crate::engine::runtime::BuildEngine;
use crate::engine::{
    build_error_output, stream_child_output, BuildRequest, EngineKind, MANIFEST_FILE,
};
use crate::error::{StagecraftError, StagecraftResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::{debug, info};

/// Build engine driving `docker` or `depot`
pub struct CliEngine {
    kind: EngineKind,
    builds_dir: PathBuf,
}

impl CliEngine {
    /// Create an engine that stages manifests under `builds_dir`
    pub fn new(kind: EngineKind, builds_dir: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            builds_dir: builds_dir.into(),
        }
    }

    pub fn kind(&self) -> &EngineKind {
        &self.kind
    }

    /// Spawn `program args` with both output streams piped
    fn spawn_piped(&self, program: &str, args: &[String]) -> StagecraftResult<Child> {
        debug!("Executing: {} {:?}", program, args);

        Command::new(program)
            .args(args)
            .env("DOCKER_SCAN_SUGGEST", "false")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    StagecraftError::EngineNotFound(program.to_string())
                } else {
                    StagecraftError::command_failed(program, e)
                }
            })
    }

    /// Run to completion, returning collected output on success
    async fn run_streamed(
        &self,
        program: &str,
        args: &[String],
        on_output: &(dyn Fn(String) + Send + Sync),
    ) -> StagecraftResult<Result<(), String>> {
        let mut child = self.spawn_piped(program, args)?;
        let all_output = stream_child_output(&mut child, on_output).await?;

        let status = child
            .wait()
            .await
            .map_err(|e| StagecraftError::command_failed(program, e))?;

        if status.success() {
            Ok(Ok(()))
        } else {
            Ok(Err(build_error_output(&all_output.join("\n"), "")))
        }
    }
}

#[async_trait]
impl BuildEngine for CliEngine {
    async fn is_available(&self) -> bool {
        Command::new(self.kind.program())
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    async fn build(
        &self,
        manifest: &str,
        request: &BuildRequest,
        on_output: &(dyn Fn(String) + Send + Sync),
    ) -> StagecraftResult<()> {
        let build_dir = prepare_build_dir(&self.builds_dir, manifest).await?;
        let request = request.clone().manifest_path(build_dir.join(MANIFEST_FILE));
        info!("Building {} with {}", request.label(), self.kind);

        let result = self
            .run_streamed(self.kind.program(), &request.args(&self.kind), on_output)
            .await;

        // Clean up build directory (best-effort)
        let _ = tokio::fs::remove_dir_all(&build_dir).await;

        match result? {
            Ok(()) => Ok(()),
            Err(output) => Err(StagecraftError::BuildFailed {
                target: request.label(),
                output,
            }),
        }
    }

    async fn push(&self, tag: &str, on_output: &(dyn Fn(String) + Send + Sync)) -> StagecraftResult<()> {
        info!("Pushing {}", tag);
        let args = vec!["push".to_string(), tag.to_string()];

        match self.run_streamed("docker", &args, on_output).await? {
            Ok(()) => Ok(()),
            Err(reason) => Err(StagecraftError::PushFailed {
                tag: tag.to_string(),
                reason,
            }),
        }
    }

    fn engine_name(&self) -> String {
        self.kind.to_string()
    }
}

/// Write `manifest` into a fresh directory under `builds_dir`
async fn prepare_build_dir(builds_dir: &Path, manifest: &str) -> StagecraftResult<PathBuf> {
    let build_dir = builds_dir.join(uuid::Uuid::new_v4().to_string());
    tokio::fs::create_dir_all(&build_dir)
        .await
        .map_err(|e| StagecraftError::io("creating build directory", e))?;

    tokio::fs::write(build_dir.join(MANIFEST_FILE), manifest)
        .await
        .map_err(|e| StagecraftError::io("writing manifest", e))?;

    Ok(build_dir)
}
