//! External command execution.
//!
//! Every tool invocation is described by a [`CommandSpec`]: program, argument
//! vector, environment overrides and working directory. Overrides apply to the
//! child process only, so nothing leaks into the server process or into the
//! next invocation, whichever way the command ends.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

use dockflow_common::{DockflowError, Result};

/// What a non-zero exit code means for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExitPolicy {
    /// Non-zero exit is a `StageExecution` error.
    #[default]
    Strict,
    /// The output is returned whatever the exit code (inspection commands).
    BestEffort,
}

/// Structured description of one external invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub working_dir: Option<PathBuf>,
    pub exit_policy: ExitPolicy,
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            working_dir: None,
            exit_policy: ExitPolicy::Strict,
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy().into_owned())
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn best_effort(mut self) -> Self {
        self.exit_policy = ExitPolicy::BestEffort;
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Value following `flag` in the argument list, if any.
    pub fn flag_value(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    /// Human-readable command line, for logs and error messages only.
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|part| {
                if part.is_empty() || part.contains(char::is_whitespace) {
                    format!("{:?}", part)
                } else {
                    part.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Executes command specs. Implemented by [`ProcessRunner`] for real tools.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;
}

/// Runs commands as child processes through `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let command_line = spec.display();
        debug!(command = %command_line, cwd = ?spec.working_dir, "Spawning external command");

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &spec.working_dir {
            command.current_dir(dir);
        }
        // Launchers such as `micromamba run` fork the real tool; a group of
        // its own lets a timeout reach every descendant.
        #[cfg(unix)]
        command.process_group(0);

        let child = command.spawn().map_err(|e| DockflowError::StageExecution {
            command: command_line.clone(),
            exit_code: None,
            stderr: format!("failed to start {}: {}", spec.program, e),
        })?;
        let pid = child.id();

        let started = Instant::now();
        let finished = match spec.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(res) => res,
                Err(_) => {
                    if let Some(pid) = pid {
                        kill_process_group(pid).await;
                    }
                    warn!(command = %command_line, "Command exceeded {:?}, killed", limit);
                    return Err(DockflowError::StageTimeout {
                        command: command_line,
                        after: limit,
                    });
                }
            },
            None => child.wait_with_output().await,
        };

        let output = finished.map_err(|e| DockflowError::StageExecution {
            command: command_line.clone(),
            exit_code: None,
            stderr: format!("failed to wait for {}: {}", spec.program, e),
        })?;

        let result = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        };
        debug!(
            command = %command_line,
            exit_code = ?result.exit_code,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "External command finished"
        );

        if !output.status.success() {
            match spec.exit_policy {
                ExitPolicy::Strict => {
                    return Err(DockflowError::StageExecution {
                        command: command_line,
                        exit_code: result.exit_code,
                        stderr: result.stderr.trim().to_string(),
                    });
                }
                ExitPolicy::BestEffort => {
                    debug!(command = %command_line, "Non-zero exit tolerated (best effort)");
                }
            }
        }

        Ok(result)
    }
}

/// SIGKILL every process in the group led by `pgid`.
#[cfg(unix)]
async fn kill_process_group(pgid: u32) {
    let status = Command::new("kill")
        .arg("-KILL")
        .arg("--")
        .arg(format!("-{}", pgid))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    match status {
        Ok(s) if s.success() => debug!(pgid, "Process group killed"),
        // the group may already be gone
        Ok(s) => debug!(pgid, code = ?s.code(), "kill returned non-zero"),
        Err(e) => warn!(pgid, "Could not signal process group: {}", e),
    }
}

#[cfg(not(unix))]
async fn kill_process_group(_pgid: u32) {}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sh(script: &str) -> CommandSpec {
        CommandSpec::new("sh").arg("-c").arg(script)
    }

    #[tokio::test]
    async fn test_captures_stdout_and_stderr_separately() {
        let out = ProcessRunner::new()
            .run(&sh("echo docked; echo warning >&2"))
            .await
            .unwrap();
        assert_eq!(out.stdout.trim(), "docked");
        assert_eq!(out.stderr.trim(), "warning");
        assert!(out.success());
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_stage_error() {
        let err = ProcessRunner::new()
            .run(&sh("echo 'bad receptor' >&2; exit 3"))
            .await
            .unwrap_err();
        match err {
            DockflowError::StageExecution { exit_code, stderr, command } => {
                assert_eq!(exit_code, Some(3));
                assert_eq!(stderr, "bad receptor");
                assert!(command.starts_with("sh -c"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_best_effort_returns_non_zero_result() {
        let out = ProcessRunner::new()
            .run(&sh("exit 1").best_effort())
            .await
            .unwrap();
        assert_eq!(out.exit_code, Some(1));
        assert!(!out.success());
    }

    #[tokio::test]
    async fn test_missing_program_is_stage_error_without_exit_code() {
        let err = ProcessRunner::new()
            .run(&CommandSpec::new("dockflow-no-such-tool-xyz"))
            .await
            .unwrap_err();
        assert!(matches!(err, DockflowError::StageExecution { exit_code: None, .. }));
    }

    #[tokio::test]
    async fn test_env_and_cwd_are_scoped_to_the_child() {
        let dir = tempdir().unwrap();
        let cwd_before = std::env::current_dir().unwrap();

        let out = ProcessRunner::new()
            .run(
                &sh("echo \"$DOCKFLOW_SCOPED_VAR\"; pwd; exit 4")
                    .env("DOCKFLOW_SCOPED_VAR", "monomers")
                    .current_dir(dir.path())
                    .best_effort(),
            )
            .await
            .unwrap();

        let mut lines = out.stdout.lines();
        assert_eq!(lines.next(), Some("monomers"));
        let child_cwd = std::fs::canonicalize(lines.next().unwrap()).unwrap();
        assert_eq!(child_cwd, std::fs::canonicalize(dir.path()).unwrap());

        assert!(std::env::var("DOCKFLOW_SCOPED_VAR").is_err());
        assert_eq!(std::env::current_dir().unwrap(), cwd_before);
    }

    #[tokio::test]
    async fn test_timeout_is_hard_failure() {
        let err = ProcessRunner::new()
            .run(&sh("sleep 5").timeout(Some(Duration::from_millis(100))))
            .await
            .unwrap_err();
        assert!(matches!(err, DockflowError::StageTimeout { .. }));
    }

    #[tokio::test]
    async fn test_timeout_kills_forked_descendants() {
        let dir = tempdir().unwrap();
        let marker = dir.path().join("marker");

        let script = "sh -c 'sleep 1; touch marker'; true";
        let err = ProcessRunner::new()
            .run(
                &sh(script)
                    .current_dir(dir.path())
                    .timeout(Some(Duration::from_millis(200))),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DockflowError::StageTimeout { .. }));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!marker.exists(), "grandchild survived the timeout");
    }

    #[test]
    fn test_display_quotes_arguments_with_spaces() {
        let spec = CommandSpec::new("scrub.py").arg("CC(=O) O").arg("-o").arg("out.sdf");
        assert_eq!(spec.display(), r#"scrub.py "CC(=O) O" -o out.sdf"#);
        assert_eq!(spec.flag_value("-o"), Some("out.sdf"));
        assert_eq!(spec.flag_value("--missing"), None);
    }
}
