//! Manifest instructions
//!
//! A closed set of build instructions. Each variant renders to one manifest
//! line, except `Env`, which renders one line per variable. Nothing is
//! validated here: values are written out as given and any problem surfaces
//! when the build engine reads the manifest.

pub mod mount;

pub use mount::{cache_id, CacheMount, Sharing};

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Ownership applied by `COPY --chown`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Chown {
    pub user: String,
    pub group: String,
}

impl Chown {
    pub fn new(user: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            group: group.into(),
        }
    }
}

/// The two legal argument forms of CMD, ENTRYPOINT and VOLUME
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CommandForm {
    /// Bare string, run through the stage's shell
    Shell(String),
    /// JSON array, executed directly
    Exec(Vec<String>),
}

impl CommandForm {
    fn render(&self) -> String {
        match self {
            Self::Shell(line) => line.clone(),
            Self::Exec(args) => json_array(args),
        }
    }
}

impl From<&str> for CommandForm {
    fn from(line: &str) -> Self {
        Self::Shell(line.to_string())
    }
}

impl From<String> for CommandForm {
    fn from(line: String) -> Self {
        Self::Shell(line)
    }
}

impl From<Vec<String>> for CommandForm {
    fn from(args: Vec<String>) -> Self {
        Self::Exec(args)
    }
}

impl From<Vec<&str>> for CommandForm {
    fn from(args: Vec<&str>) -> Self {
        Self::Exec(args.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for CommandForm {
    fn from(args: [&str; N]) -> Self {
        Self::Exec(args.iter().map(|a| a.to_string()).collect())
    }
}

/// A single manifest instruction
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Instruction {
    /// RUN [--mount=...]... <command>
    Run {
        command: String,
        mounts: Vec<CacheMount>,
    },

    /// COPY [--chown=u:g] [--from=stage] <src> <dest>
    Copy {
        source: String,
        destination: String,
        chown: Option<Chown>,
        /// Name of the stage the files are copied out of
        from: Option<String>,
    },

    /// ENV <key> <value>, one line per key
    Env { vars: BTreeMap<String, String> },

    Expose { port: u16 },

    WorkDir { path: String },

    Cmd { command: CommandForm },

    Entrypoint { command: CommandForm },

    Label { labels: BTreeMap<String, String> },

    Volume { paths: CommandForm },

    User { name: String, group: Option<String> },

    /// ARG <name>[="<default>"]
    Arg {
        name: String,
        default: Option<String>,
    },

    Shell { command: Vec<String> },
}

impl Instruction {
    pub fn run(command: impl Into<String>) -> Self {
        Self::Run {
            command: command.into(),
            mounts: Vec::new(),
        }
    }

    pub fn run_with_mounts(command: impl Into<String>, mounts: Vec<CacheMount>) -> Self {
        Self::Run {
            command: command.into(),
            mounts,
        }
    }

    pub fn copy(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self::Copy {
            source: source.into(),
            destination: destination.into(),
            chown: None,
            from: None,
        }
    }

    pub fn env<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: ToString,
    {
        Self::Env {
            vars: collect_vars(vars),
        }
    }

    pub fn label<K, V>(labels: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: ToString,
    {
        Self::Label {
            labels: collect_vars(labels),
        }
    }

    /// Render the instruction as manifest text, without a trailing newline
    pub fn serialize(&self) -> String {
        match self {
            Self::Run { command, mounts } if mounts.is_empty() => format!("RUN {command}"),
            Self::Run { command, mounts } => {
                let flags: Vec<String> = mounts
                    .iter()
                    .map(|mount| format!("--mount={}", mount.serialize()))
                    .collect();
                format!("RUN {} {command}", flags.join(" "))
            }
            Self::Copy {
                source,
                destination,
                chown,
                from,
            } => {
                let mut segments = vec!["COPY".to_string()];
                if let Some(chown) = chown {
                    segments.push(format!("--chown={}:{}", chown.user, chown.group));
                }
                if let Some(stage) = from {
                    segments.push(format!("--from={stage}"));
                }
                segments.push(source.clone());
                segments.push(destination.clone());
                segments.join(" ")
            }
            Self::Env { vars } => vars
                .iter()
                .map(|(key, value)| format!("ENV {key} {value}"))
                .collect::<Vec<_>>()
                .join("\n"),
            Self::Expose { port } => format!("EXPOSE {port}"),
            Self::WorkDir { path } => format!("WORKDIR {path}"),
            Self::Cmd { command } => format!("CMD {}", command.render()),
            Self::Entrypoint { command } => format!("ENTRYPOINT {}", command.render()),
            Self::Label { labels } => {
                let pairs: Vec<String> = labels
                    .iter()
                    .map(|(key, value)| format!("\"{key}\"=\"{value}\""))
                    .collect();
                format!("LABEL {}", pairs.join(" "))
            }
            Self::Volume { paths } => format!("VOLUME {}", paths.render()),
            Self::User { name, group: None } => format!("USER {name}"),
            Self::User {
                name,
                group: Some(group),
            } => format!("USER {name}:{group}"),
            Self::Arg {
                name,
                default: None,
            } => format!("ARG {name}"),
            Self::Arg {
                name,
                default: Some(default),
            } => format!("ARG {name}=\"{default}\""),
            Self::Shell { command } => format!("SHELL {}", json_array(command)),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

fn collect_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> BTreeMap<String, String>
where
    K: Into<String>,
    V: ToString,
{
    vars.into_iter()
        .map(|(key, value)| (key.into(), value.to_string()))
        .collect()
}

fn json_array(items: &[String]) -> String {
    Value::from(items.to_vec()).to_string()
}
