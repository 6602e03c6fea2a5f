//! Progress indicators with CI fallback

use super::context::UiContext;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Longest output line shown as the progress bar message
const MAX_MESSAGE_CHARS: usize = 60;

/// A task spinner with CI fallback
pub struct TaskSpinner {
    spinner: Option<cliclack::ProgressBar>,
    interactive: bool,
}

impl TaskSpinner {
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            spinner: None,
            interactive: ctx.use_fancy_output(),
        }
    }

    /// Start the spinner with a message
    pub fn start(&mut self, message: &str) {
        if self.interactive {
            let spinner = cliclack::spinner();
            spinner.start(message);
            self.spinner = Some(spinner);
        } else {
            println!("{} {}", style("...").dim(), message);
        }
    }

    /// Stop with success message
    pub fn stop(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.stop(message);
        } else if self.interactive {
            println!("{} {}", style("✓").green(), message);
        } else {
            println!("{} {}", style("[OK]").green(), message);
        }
    }

    /// Stop with error message
    pub fn stop_error(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.error(message);
        } else if self.interactive {
            println!("{} {}", style("✗").red(), message);
        } else {
            println!("{} {}", style("[FAIL]").red(), message);
        }
    }
}

/// Progress bar for engine builds.
///
/// Parses BuildKit plain progress lines (`#7 [stage-1 2/5] RUN make`) and
/// shows an indicatif bar in interactive mode, or plain text in CI.
pub struct BuildProgress {
    bar: Option<ProgressBar>,
}

impl BuildProgress {
    pub fn new(ctx: &UiContext, label: &str) -> Self {
        let bar = if ctx.use_fancy_output() {
            let bar = ProgressBar::new(0);
            let style = ProgressStyle::default_bar()
                .template("  {spinner:.cyan} Building {prefix}  {bar:20.cyan/dim} {pos}/{len} {msg:.dim}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                .progress_chars("━╸─");
            bar.set_style(style);
            bar.set_prefix(label.to_string());
            bar.enable_steady_tick(std::time::Duration::from_millis(120));
            Some(bar)
        } else {
            println!("Building {}...", label);
            None
        };
        Self { bar }
    }

    /// Process one line of engine output
    pub fn on_line(&self, line: String) {
        if let Some(step) = parse_step_line(&line) {
            if let Some(ref bar) = self.bar {
                bar.set_length(step.total);
                bar.set_position(step.index);
                bar.set_message(format!("{}: {}", step.stage, step.instruction));
            } else {
                println!(
                    "  [{} {}/{}] {}",
                    step.stage, step.index, step.total, step.instruction
                );
            }
        } else if let Some(ref bar) = self.bar {
            let trimmed = line.trim();
            if !trimmed.is_empty() && !is_build_noise(trimmed) {
                bar.set_message(truncate(trimmed));
            }
        }
    }

    /// Finish and clear the progress bar.
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}

/// A `[stage k/n] INSTRUCTION` progress header
#[derive(Debug, PartialEq, Eq)]
struct StepLine<'a> {
    stage: &'a str,
    index: u64,
    total: u64,
    instruction: &'a str,
}

/// Parse `#<vertex> [<stage> <k>/<n>] <instruction>`
fn parse_step_line(line: &str) -> Option<StepLine<'_>> {
    let rest = line.strip_prefix('#')?;
    let (_vertex, rest) = rest.split_once(' ')?;
    let rest = rest.strip_prefix('[')?;
    let (header, instruction) = rest.split_once("] ")?;
    let (stage, counts) = header.rsplit_once(' ')?;
    let (index, total) = counts.split_once('/')?;

    Some(StepLine {
        stage,
        index: index.parse().ok()?,
        total: total.parse().ok()?,
        instruction: instruction.trim(),
    })
}

/// Vertex bookkeeping lines that carry no build output
fn is_build_noise(line: &str) -> bool {
    let Some(rest) = line.strip_prefix('#') else {
        return false;
    };
    let body = rest.split_once(' ').map(|(_, body)| body).unwrap_or("");
    body.starts_with("DONE")
        || body.starts_with("CACHED")
        || body.starts_with("sha256:")
        || body.starts_with("[internal]")
        || body.starts_with("transferring")
}

fn truncate(line: &str) -> String {
    if line.chars().count() > MAX_MESSAGE_CHARS {
        let head: String = line.chars().take(MAX_MESSAGE_CHARS - 3).collect();
        format!("{head}...")
    } else {
        line.to_string()
    }
}
