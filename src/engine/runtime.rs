//! Build engine abstraction
//!
//! Provides a trait for the build operations Stagecraft needs, so the
//! orchestrator can drive Docker, Depot, or a test double alike.

use crate::engine::BuildRequest;
use crate::error::StagecraftResult;
use async_trait::async_trait;

/// Abstract build engine interface
#[async_trait]
pub trait BuildEngine: Send + Sync {
    /// Check if the engine's CLI is installed and answering
    async fn is_available(&self) -> bool;

    /// Build `manifest` as described by `request`, forwarding each output
    /// line to `on_output`.
    ///
    /// The engine decides where the manifest lives; `request.manifest_path`
    /// is overwritten.
    async fn build(
        &self,
        manifest: &str,
        request: &BuildRequest,
        on_output: &(dyn Fn(String) + Send + Sync),
    ) -> StagecraftResult<()>;

    /// Push an already built image
    async fn push(&self, tag: &str, on_output: &(dyn Fn(String) + Send + Sync)) -> StagecraftResult<()>;

    /// Get the human-readable engine name for display
    fn engine_name(&self) -> String;
}
