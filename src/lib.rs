//! Stagecraft - typed multi-stage container builds
//!
//! Build stages are immutable values chained from a base image. Stages that
//! copy artifacts out of other stages record them as dependencies, and
//! [`solve`] flattens the resulting graph into one multi-stage BuildKit
//! manifest with every stage emitted after the stages it depends on.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod instruction;
pub mod plan;
pub mod recipes;
pub mod solve;
pub mod stage;
pub mod ui;

pub use error::{SolveError, StagecraftError, StagecraftResult};
pub use instruction::{cache_id, CacheMount, Instruction, Sharing};
pub use solve::{solve, solve_with, SolveOptions};
pub use stage::{Artifact, NameGenerator, SequentialNames, Stage, UuidNames};
