// src/exec/shell.rs

//! Shell-command job body.

use std::process::{Command, Output};

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::job::JobBody;

/// Runs a command line through the platform shell on the worker thread.
///
/// A non-zero exit status fails the job. Output is captured and logged at
/// debug level, one line per event.
#[derive(Debug, Clone)]
pub struct ShellJob {
    name: String,
    cmd: String,
    kind: String,
}

impl ShellJob {
    pub fn new(name: impl Into<String>, cmd: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cmd: cmd.into(),
            kind: "shell".to_string(),
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cmd(&self) -> &str {
        &self.cmd
    }

    fn command(&self) -> Command {
        if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&self.cmd);
            c
        }
    }

    fn log_output(&self, output: &Output) {
        for line in String::from_utf8_lossy(&output.stdout).lines() {
            debug!(name = %self.name, "stdout: {}", line);
        }
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            debug!(name = %self.name, "stderr: {}", line);
        }
    }
}

impl JobBody for ShellJob {
    fn run(&mut self) -> Result<()> {
        info!(name = %self.name, cmd = %self.cmd, "starting command");

        let output = self
            .command()
            .output()
            .with_context(|| format!("spawning process for job '{}'", self.name))?;
        self.log_output(&output);

        let code = output.status.code().unwrap_or(-1);
        info!(
            name = %self.name,
            exit_code = code,
            success = output.status.success(),
            "command exited"
        );

        if !output.status.success() {
            bail!("command `{}` exited with status {}", self.cmd, code);
        }
        Ok(())
    }

    fn kind(&self) -> &str {
        &self.kind
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn zero_exit_status_succeeds() {
        let mut job = ShellJob::new("ok", "true");
        assert!(job.run().is_ok());
    }

    #[test]
    fn non_zero_exit_status_fails_with_code() {
        let mut job = ShellJob::new("bad", "exit 3").with_kind("metric");
        let err = job.run().unwrap_err();
        assert!(err.to_string().contains("exited with status 3"), "{err}");
        assert_eq!(job.kind(), "metric");
    }
}
