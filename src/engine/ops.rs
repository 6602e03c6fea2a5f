//! Build, push, run and save operations
//!
//! Every operation solves the stage graph first, so a graph error never
//! reaches the engine.

use crate::config::schema::BuildConfig;
use crate::engine::runtime::BuildEngine;
use crate::engine::BuildRequest;
use crate::error::StagecraftResult;
use crate::solve::{solve_with, SolveOptions};
use crate::stage::{Artifact, NameGenerator, Stage};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default repository prefix for content-addressed tags
const DEFAULT_TAG_PREFIX: &str = "stagecraft";

/// Tag derived from the manifest text: `<prefix>/<sha256 hex>`
pub fn content_tag(prefix: &str, manifest: &str) -> String {
    let hash = hex::encode(Sha256::digest(manifest.as_bytes()));
    format!("{prefix}/{hash}")
}

/// Runs stage graphs through a [`BuildEngine`]
pub struct Orchestrator<'e> {
    engine: &'e dyn BuildEngine,
    context: PathBuf,
    options: SolveOptions,
    tag_prefix: String,
}

impl<'e> Orchestrator<'e> {
    /// Build with `context` as the engine's build context
    pub fn new(engine: &'e dyn BuildEngine, context: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            context: context.into(),
            options: SolveOptions::default(),
            tag_prefix: DEFAULT_TAG_PREFIX.to_string(),
        }
    }

    /// Apply the `[build]` config section
    pub fn with_config(mut self, config: &BuildConfig) -> Self {
        self.options = SolveOptions {
            syntax: config.syntax.clone(),
        };
        self.tag_prefix = config.tag_prefix.clone();
        self
    }

    pub fn engine(&self) -> &dyn BuildEngine {
        self.engine
    }

    /// Solve `stage` into manifest text
    pub fn manifest(&self, stage: &Stage) -> StagecraftResult<String> {
        Ok(solve_with(stage, &self.options)?)
    }

    /// The stage's own tag, or one derived from its manifest
    pub fn image_tag(&self, stage: &Stage, manifest: &str) -> String {
        stage
            .tag()
            .map(str::to_string)
            .unwrap_or_else(|| content_tag(&self.tag_prefix, manifest))
    }

    /// Build and tag `stage`, optionally pushing it, and return the tag
    pub async fn build(
        &self,
        stage: &Stage,
        push: bool,
        on_output: &(dyn Fn(String) + Send + Sync),
    ) -> StagecraftResult<String> {
        let manifest = self.manifest(stage)?;
        let tag = self.image_tag(stage, &manifest);
        debug!("Build tag for {}: {}", stage.name(), tag);

        let request = BuildRequest::new(&self.context).tag(&tag).push(push);
        self.engine.build(&manifest, &request, on_output).await?;

        info!("Built {}", tag);
        Ok(tag)
    }

    /// Push the image for `stage` under the same tag `build` uses
    pub async fn push(
        &self,
        stage: &Stage,
        on_output: &(dyn Fn(String) + Send + Sync),
    ) -> StagecraftResult<String> {
        let manifest = self.manifest(stage)?;
        let tag = self.image_tag(stage, &manifest);
        self.engine.push(&tag, on_output).await?;
        Ok(tag)
    }

    /// Build `stage` quietly without a tag, for its side effects
    pub async fn run(
        &self,
        stage: &Stage,
        on_output: &(dyn Fn(String) + Send + Sync),
    ) -> StagecraftResult<()> {
        let manifest = self.manifest(stage)?;
        let request = BuildRequest::new(&self.context).quiet();
        self.engine.build(&manifest, &request, on_output).await
    }

    /// Export `artifact` into the local directory `dest`.
    ///
    /// `names` must be the generator that named the artifact's stage graph.
    pub async fn save<N>(
        &self,
        artifact: &Artifact,
        dest: &Path,
        names: &N,
        on_output: &(dyn Fn(String) + Send + Sync),
    ) -> StagecraftResult<()>
    where
        N: NameGenerator + ?Sized,
    {
        let export = export_stage(artifact, names);
        let manifest = self.manifest(&export)?;
        let request = BuildRequest::new(&self.context).quiet().output(dest);
        self.engine.build(&manifest, &request, on_output).await
    }
}

/// Scratch stage holding only `artifact`
fn export_stage<N>(artifact: &Artifact, names: &N) -> Stage
where
    N: NameGenerator + ?Sized,
{
    Stage::from_base(names, "scratch").copy_artifact(artifact, "./")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StagecraftError;
    use crate::stage::SequentialNames;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every request instead of spawning anything
    #[derive(Default)]
    struct RecordingEngine {
        builds: Mutex<Vec<(String, BuildRequest)>>,
        pushes: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl BuildEngine for RecordingEngine {
        async fn is_available(&self) -> bool {
            true
        }

        async fn build(
            &self,
            manifest: &str,
            request: &BuildRequest,
            on_output: &(dyn Fn(String) + Send + Sync),
        ) -> StagecraftResult<()> {
            on_output("#1 DONE".to_string());
            self.builds
                .lock()
                .unwrap()
                .push((manifest.to_string(), request.clone()));
            if self.fail {
                return Err(StagecraftError::BuildFailed {
                    target: request.label(),
                    output: "boom".to_string(),
                });
            }
            Ok(())
        }

        async fn push(&self, tag: &str, _on_output: &(dyn Fn(String) + Send + Sync)) -> StagecraftResult<()> {
            self.pushes.lock().unwrap().push(tag.to_string());
            Ok(())
        }

        fn engine_name(&self) -> String {
            "recording".to_string()
        }
    }

    #[test]
    fn content_tag_is_sha256_of_manifest() {
        assert_eq!(
            content_tag("stagecraft", ""),
            "stagecraft/e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[tokio::test]
    async fn build_uses_content_tag_without_explicit_tag() {
        let engine = RecordingEngine::default();
        let orchestrator = Orchestrator::new(&engine, ".");
        let names = SequentialNames::new();
        let stage = Stage::from_base(&names, "alpine").run("true");

        let tag = orchestrator.build(&stage, false, &|_| {}).await.unwrap();

        let builds = engine.builds.lock().unwrap();
        let (manifest, request) = &builds[0];
        assert_eq!(tag, content_tag("stagecraft", manifest));
        assert_eq!(request.tag.as_deref(), Some(tag.as_str()));
        assert!(!request.quiet);
        assert!(!request.push);
    }

    #[tokio::test]
    async fn build_prefers_stage_tag_and_config() {
        let engine = RecordingEngine::default();
        let config = BuildConfig {
            syntax: "docker/dockerfile:1.7".to_string(),
            ..BuildConfig::default()
        };
        let orchestrator = Orchestrator::new(&engine, "/src").with_config(&config);
        let names = SequentialNames::new();
        let stage = Stage::from_base(&names, "alpine").with_tag("example/app:1");

        let tag = orchestrator.build(&stage, true, &|_| {}).await.unwrap();
        assert_eq!(tag, "example/app:1");

        let builds = engine.builds.lock().unwrap();
        let (manifest, request) = &builds[0];
        assert!(manifest.starts_with("#syntax=docker/dockerfile:1.7"));
        assert!(request.push);
        assert_eq!(request.context, PathBuf::from("/src"));
    }

    #[tokio::test]
    async fn push_uses_build_tag() {
        let engine = RecordingEngine::default();
        let orchestrator = Orchestrator::new(&engine, ".");
        let names = SequentialNames::new();
        let stage = Stage::from_base(&names, "alpine").run("true");

        let pushed = orchestrator.push(&stage, &|_| {}).await.unwrap();
        let manifest = orchestrator.manifest(&stage).unwrap();
        assert_eq!(pushed, orchestrator.image_tag(&stage, &manifest));
        assert_eq!(engine.pushes.lock().unwrap().as_slice(), &[pushed]);
    }

    #[tokio::test]
    async fn run_is_quiet_and_untagged() {
        let engine = RecordingEngine::default();
        let orchestrator = Orchestrator::new(&engine, ".");
        let names = SequentialNames::new();
        let stage = Stage::from_base(&names, "alpine").run("make test");

        let lines = Mutex::new(Vec::new());
        orchestrator
            .run(&stage, &|line| lines.lock().unwrap().push(line))
            .await
            .unwrap();

        let builds = engine.builds.lock().unwrap();
        assert!(builds[0].1.quiet);
        assert_eq!(builds[0].1.tag, None);
        assert_eq!(lines.lock().unwrap().as_slice(), &["#1 DONE".to_string()]);
    }

    #[tokio::test]
    async fn save_exports_scratch_stage() {
        let engine = RecordingEngine::default();
        let orchestrator = Orchestrator::new(&engine, ".");
        let names = SequentialNames::new();
        let builder = Stage::from_base(&names, "rust:1.82").cargo("build --release");
        let artifact = builder.save_artifact("/app/target/release/app");

        orchestrator
            .save(&artifact, Path::new("./dist"), &names, &|_| {})
            .await
            .unwrap();

        let builds = engine.builds.lock().unwrap();
        let (manifest, request) = &builds[0];
        assert!(manifest.contains("FROM rust:1.82 AS stage-0"));
        assert!(manifest.contains("FROM scratch AS stage-1"));
        assert!(manifest.contains("COPY --from=stage-0 /app/target/release/app ./"));
        assert_eq!(request.output, Some(PathBuf::from("./dist")));
        assert!(request.quiet);
    }

    #[tokio::test]
    async fn build_failure_propagates() {
        let engine = RecordingEngine {
            fail: true,
            ..RecordingEngine::default()
        };
        let orchestrator = Orchestrator::new(&engine, ".");
        let names = SequentialNames::new();
        let stage = Stage::from_base(&names, "alpine").with_tag("x/y");

        let err = orchestrator.build(&stage, false, &|_| {}).await.unwrap_err();
        assert!(matches!(err, StagecraftError::BuildFailed { ref target, .. } if target == "x/y"));
    }
}
