//! CLI argument definitions using clap derive

use crate::plan::DEFAULT_TARGET;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Stagecraft - typed multi-stage container builds
///
/// Declares build stages in a TOML file, solves them into a single
/// BuildKit manifest and drives docker or depot to build it.
#[derive(Parser, Debug)]
#[command(name = "stagecraft")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "STAGECRAFT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Skip local stagecraft.toml discovery
    #[arg(long, global = true)]
    pub no_local: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the targets of a build file
    Ls(LsArgs),

    /// Print the solved manifest for a target
    Preview(PreviewArgs),

    /// Build and tag a target
    Build(BuildArgs),

    /// Build a target quietly for its side effects
    Run(RunArgs),

    /// Export a file or directory from a target to the host
    Save(SaveArgs),

    /// Print the stable cache id for a mount target
    CacheId(CacheIdArgs),

    /// Show or edit configuration
    Config(ConfigArgs),
}

/// Build file plus the target to operate on
#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Build file (defaults to build.default_file from config)
    pub file: Option<PathBuf>,

    /// Stage key inside the build file
    #[arg(short, long, default_value = DEFAULT_TARGET)]
    pub target: String,
}

/// Arguments for the ls command
#[derive(Parser, Debug)]
pub struct LsArgs {
    /// Build file (defaults to build.default_file from config)
    pub file: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the preview command
#[derive(Parser, Debug)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub target: TargetArgs,
}

/// Arguments for the build command
#[derive(Parser, Debug)]
pub struct BuildArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Override the image tag
    #[arg(long)]
    pub tag: Option<String>,

    /// Push the image after building
    #[arg(long)]
    pub push: bool,
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub target: TargetArgs,
}

/// Arguments for the save command
#[derive(Parser, Debug)]
pub struct SaveArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Path inside the target stage to export
    #[arg(long)]
    pub path: String,

    /// Host directory to write into
    #[arg(long)]
    pub dest: PathBuf,
}

/// Arguments for the cache-id command
#[derive(Parser, Debug)]
pub struct CacheIdArgs {
    /// Mount target path inside the build container
    pub target: String,

    /// Project directory (defaults to current directory)
    #[arg(long)]
    pub dir: Option<PathBuf>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., build.tag_prefix)
        key: String,
        /// Value to set
        value: String,
        /// Write to project-local stagecraft.toml instead of global config
        #[arg(long)]
        local: bool,
    },
}

/// Output format for the ls command
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_preview_defaults() {
        let cli = Cli::parse_from(["stagecraft", "preview"]);
        match cli.command {
            Commands::Preview(args) => {
                assert_eq!(args.target.file, None);
                assert_eq!(args.target.target, "default");
            }
            _ => panic!("expected Preview command"),
        }
    }

    #[test]
    fn cli_parses_build() {
        let cli = Cli::parse_from([
            "stagecraft",
            "build",
            "images.toml",
            "-t",
            "release",
            "--tag",
            "example/app:1.0",
            "--push",
        ]);
        match cli.command {
            Commands::Build(args) => {
                assert_eq!(args.target.file, Some(PathBuf::from("images.toml")));
                assert_eq!(args.target.target, "release");
                assert_eq!(args.tag.as_deref(), Some("example/app:1.0"));
                assert!(args.push);
            }
            _ => panic!("expected Build command"),
        }
    }

    #[test]
    fn cli_parses_save() {
        let cli = Cli::parse_from([
            "stagecraft",
            "save",
            "--target",
            "builder",
            "--path",
            "/app/target/release/app",
            "--dest",
            "dist",
        ]);
        match cli.command {
            Commands::Save(args) => {
                assert_eq!(args.target.target, "builder");
                assert_eq!(args.path, "/app/target/release/app");
                assert_eq!(args.dest, PathBuf::from("dist"));
            }
            _ => panic!("expected Save command"),
        }
    }

    #[test]
    fn cli_save_requires_path_and_dest() {
        assert!(Cli::try_parse_from(["stagecraft", "save"]).is_err());
    }

    #[test]
    fn cli_parses_cache_id() {
        let cli = Cli::parse_from(["stagecraft", "cache-id", "/root/.cache", "--dir", "/src"]);
        match cli.command {
            Commands::CacheId(args) => {
                assert_eq!(args.target, "/root/.cache");
                assert_eq!(args.dir, Some(PathBuf::from("/src")));
            }
            _ => panic!("expected CacheId command"),
        }
    }

    #[test]
    fn cli_parses_ls_format() {
        let cli = Cli::parse_from(["stagecraft", "ls", "--format", "json"]);
        assert!(matches!(
            cli.command,
            Commands::Ls(LsArgs {
                format: OutputFormat::Json,
                ..
            })
        ));
    }

    #[test]
    fn cli_parses_config_set_local() {
        let cli = Cli::parse_from([
            "stagecraft",
            "config",
            "set",
            "build.tag_prefix",
            "registry/team",
            "--local",
        ]);
        match cli.command {
            Commands::Config(ConfigArgs {
                action: Some(ConfigAction::Set { key, value, local }),
            }) => {
                assert_eq!(key, "build.tag_prefix");
                assert_eq!(value, "registry/team");
                assert!(local);
            }
            _ => panic!("expected Config Set command"),
        }
    }

    #[test]
    fn cli_no_local_flag() {
        let cli = Cli::parse_from(["stagecraft", "--no-local", "ls"]);
        assert!(cli.no_local);
    }

    #[test]
    fn cli_verbose_levels() {
        let cli = Cli::parse_from(["stagecraft", "ls"]);
        assert_eq!(cli.verbose, 0);

        let cli = Cli::parse_from(["stagecraft", "-v", "ls"]);
        assert_eq!(cli.verbose, 1);

        let cli = Cli::parse_from(["stagecraft", "-vv", "ls"]);
        assert_eq!(cli.verbose, 2);
    }
}
