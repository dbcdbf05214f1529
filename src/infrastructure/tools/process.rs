//! # Process Runner
//!
//! Executes a script from inside the confinement root under a wall-clock limit.
//! The child runs with the root as its working directory and the host environment.
//! A script that outlives the limit is killed together with everything it
//! started (the child leads its own process group), then reaped before returning.

use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use crate::domain::config::ProcessConfig;
use crate::domain::types::{ExecutionOutcome, ToolResult};
use crate::infrastructure::tools::path_guard::PathGuard;
use crate::strings::messages;

#[derive(Debug, Clone)]
pub struct ProcessRunner {
    interpreter: String,
    extensions: Vec<String>,
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new(interpreter: impl Into<String>, extensions: Vec<String>, timeout: Duration) -> Self {
        Self {
            interpreter: interpreter.into(),
            extensions,
            timeout,
        }
    }

    pub fn from_config(config: &ProcessConfig) -> Self {
        Self::new(
            config.interpreter.clone(),
            config.extensions.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Validates and runs `file_path` with `args`, formatting the outcome as text.
    ///
    /// A non-zero exit is still `Ok`: the exit code is part of the payload.
    pub async fn run(&self, guard: &PathGuard, file_path: &str, args: &[String]) -> ToolResult {
        let script = match guard.resolve(file_path) {
            Ok(path) => path,
            Err(rejected) => {
                tracing::warn!("Blocked execution: {}", rejected);
                return ToolResult::error(messages::outside_root("execute", file_path));
            }
        };

        if !script.exists() {
            return ToolResult::error(messages::script_not_found(file_path));
        }
        if !self.is_allowed_script(file_path) {
            return ToolResult::error(messages::not_an_allowed_script(file_path, &self.extensions));
        }

        match self.execute(&script, args, guard.root()).await {
            Ok(outcome) if outcome.timed_out => {
                tracing::warn!(
                    script = %script.display(),
                    timeout_secs = self.timeout.as_secs(),
                    "Script timed out and was killed"
                );
                ToolResult::error(messages::execution_timed_out(self.timeout))
            }
            Ok(outcome) => ToolResult::ok(format_outcome(&outcome)),
            Err(e) => ToolResult::error(messages::execution_failed(&e.to_string())),
        }
    }

    fn is_allowed_script(&self, file_path: &str) -> bool {
        self.extensions.iter().any(|ext| file_path.ends_with(ext.as_str()))
    }

    /// Spawns `<interpreter> <script> <args..>` in `cwd` and waits up to the timeout.
    pub async fn execute(&self, script: &Path, args: &[String], cwd: &Path) -> io::Result<ExecutionOutcome> {
        let mut cmd = Command::new(&self.interpreter);
        cmd.arg(script)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        {
            cmd.process_group(0);
        }

        tracing::debug!("Spawning {} {:?} {:?}", self.interpreter, script, args);
        let mut child = cmd.spawn()?;
        let pid = child.id();

        let mut stdout_pipe = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("failed to capture stdout"))?;
        let mut stderr_pipe = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::other("failed to capture stderr"))?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        let finished = tokio::time::timeout(self.timeout, async {
            let (out, err, status) = tokio::join!(
                drain(&mut stdout_pipe, &mut stdout),
                drain(&mut stderr_pipe, &mut stderr),
                child.wait()
            );
            out?;
            err?;
            status
        })
        .await;

        match finished {
            Ok(status) => {
                let status = status?;
                Ok(ExecutionOutcome {
                    stdout: String::from_utf8_lossy(&stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&stderr).into_owned(),
                    exit_code: status.code(),
                    timed_out: false,
                })
            }
            Err(_) => {
                if let Some(pid) = pid {
                    kill_process_group(pid);
                }
                // kill() also waits, so no zombie is left behind.
                if let Err(e) = child.kill().await {
                    tracing::error!("Failed to kill timed out script: {}", e);
                }
                Ok(ExecutionOutcome::timed_out(
                    String::from_utf8_lossy(&stdout).into_owned(),
                    String::from_utf8_lossy(&stderr).into_owned(),
                ))
            }
        }
    }
}

/// Sends SIGKILL to every process in the group led by `pid`.
#[cfg(unix)]
fn kill_process_group(pid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    let result = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if result != 0 {
        tracing::warn!(pgid, "Failed to kill process group: {}", io::Error::last_os_error());
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}

async fn drain<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<()> {
    reader.read_to_end(buf).await.map(|_| ())
}

/// Renders a completed outcome the way the agent sees it.
pub fn format_outcome(outcome: &ExecutionOutcome) -> String {
    let mut sections = Vec::new();

    if !outcome.stdout.is_empty() {
        sections.push(format!("STDOUT:\n{}", outcome.stdout));
    }
    if !outcome.stderr.is_empty() {
        sections.push(format!("STDERR:\n{}", outcome.stderr));
    }
    match outcome.exit_code {
        Some(0) => {}
        Some(code) => sections.push(messages::exited_with_code(code)),
        None => sections.push(messages::TERMINATED_BY_SIGNAL.to_string()),
    }

    if sections.is_empty() {
        messages::NO_OUTPUT.to_string()
    } else {
        sections.join("\n")
    }
}
