//! Terminal output for the CLI
//!
//! Spinners and progress bars in an interactive terminal; plain
//! `[OK]`/`[FAIL]` lines in CI or when output is piped.

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{step_info, step_ok, step_ok_detail, step_warn_hint};
pub use progress::{BuildProgress, TaskSpinner};
