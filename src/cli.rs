// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::plan::default_plan_path;

/// Command-line arguments for `jobsched`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "jobsched",
    version,
    about = "Run a plan of dependent jobs on a prioritised worker pool.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the plan file (TOML).
    ///
    /// Default: `Jobsched.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value_os_t = default_plan_path())]
    pub plan: PathBuf,

    /// Number of persistent workers; overrides `[config].workers`.
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `JOBSCHED_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the plan in submission order, but don't run
    /// anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_plan_in_cwd() {
        let args = CliArgs::try_parse_from(["jobsched"]).unwrap();
        assert_eq!(args.plan, PathBuf::from("Jobsched.toml"));
        assert!(args.workers.is_none());
        assert!(!args.dry_run);
    }

    #[test]
    fn parses_overrides() {
        let args = CliArgs::try_parse_from([
            "jobsched",
            "--plan",
            "plans/nightly.toml",
            "--workers",
            "8",
            "--log-level",
            "debug",
            "--dry-run",
        ])
        .unwrap();
        assert_eq!(args.plan, PathBuf::from("plans/nightly.toml"));
        assert_eq!(args.workers, Some(8));
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
        assert!(args.dry_run);
    }
}
