//! Reference [`Runner`] that invokes the tmux binary as a child process.
//!
//! When this process was itself launched from inside a tmux client, tmux
//! conveys the live server socket through `$TMUX` (`<socket>,<pid>,<idx>`).
//! Dropping that context and running a bare `tmux ...` can hit the default
//! socket instead and fail with "no server running", so the runner prepends
//! `-S <socket>` unless the caller already passed a socket/server override.

use std::io::Read;
use std::process::{Child, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::errors::RunnerError;
use super::Runner;
use crate::plan::shell_join;

/// Child-process tmux runner.
#[derive(Debug, Clone, Default)]
pub struct TmuxRunner {
    /// tmux executable path/name; empty means "tmux".
    pub bin: String,

    /// Extra KEY=VALUE pairs appended to the child environment.
    pub extra_env: Vec<(String, String)>,

    /// Per-command timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,

    /// Echo executed commands to the debug log.
    pub debug: bool,
}

impl TmuxRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Self::default()
        }
    }

    fn bin(&self) -> &str {
        if self.bin.trim().is_empty() {
            "tmux"
        } else {
            self.bin.trim()
        }
    }
}

/// Extract the socket path from a `$TMUX` value (`<socket>,<pid>,<idx>`).
pub fn parse_socket_path(tmux_env: &str) -> Option<String> {
    let tmux_env = tmux_env.trim();
    if tmux_env.is_empty() {
        return None;
    }
    let socket = match tmux_env.split_once(',') {
        Some((socket, _)) => socket.trim(),
        None => tmux_env,
    };
    if socket.is_empty() {
        None
    } else {
        Some(socket.to_string())
    }
}

fn has_socket_override(args: &[String]) -> bool {
    args.iter().any(|a| a == "-S" || a == "-L")
}

/// Prepend `-S <socket>` from the tmux client env unless the argv already
/// selects a server.
pub fn inherit_socket_args(args: &[String], tmux_env: Option<&str>) -> Vec<String> {
    if has_socket_override(args) {
        return args.to_vec();
    }
    let Some(socket) = tmux_env.and_then(parse_socket_path) else {
        return args.to_vec();
    };
    let mut out = Vec::with_capacity(args.len() + 2);
    out.push("-S".to_string());
    out.push(socket);
    out.extend(args.iter().cloned());
    out
}

impl Runner for TmuxRunner {
    fn run(&self, args: &[String]) -> Result<(), RunnerError> {
        self.run_output(args).map(|_| ())
    }

    fn run_output(&self, args: &[String]) -> Result<String, RunnerError> {
        if args.is_empty() {
            return Err(RunnerError::EmptyArgs);
        }

        let tmux_env = std::env::var("TMUX").ok();
        let args = inherit_socket_args(args, tmux_env.as_deref());

        let bin = self.bin();
        let command_line = format!("{} {}", bin, shell_join(&args));

        if self.debug {
            debug!(event = "runner.tmux.exec", command = command_line.as_str());
        }

        let mut command = std::process::Command::new(bin);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (key, value) in &self.extra_env {
            command.env(key, value);
        }

        let child = command.spawn().map_err(|e| RunnerError::Spawn {
            command: command_line.clone(),
            message: e.to_string(),
        })?;

        let output = match self.timeout {
            Some(timeout) => wait_with_timeout(child, timeout, &command_line)?,
            None => wait_to_completion(child, &command_line)?,
        };

        let stdout = output.stdout.trim().to_string();
        let stderr = output.stderr.trim().to_string();

        if !output.success {
            warn!(
                event = "runner.tmux.command_failed",
                command = command_line.as_str(),
                code = output.code,
                stderr = stderr.as_str()
            );
            return Err(RunnerError::CommandFailed {
                command: command_line,
                code: output.code,
                stdout,
                stderr,
            });
        }

        if self.debug && (!stdout.is_empty() || !stderr.is_empty()) {
            debug!(
                event = "runner.tmux.output",
                stdout = stdout.as_str(),
                stderr = stderr.as_str()
            );
        }

        Ok(match (stdout.is_empty(), stderr.is_empty()) {
            (false, false) => format!("{}\n{}", stdout, stderr),
            (false, true) => stdout,
            (true, _) => stderr,
        })
    }
}

struct ChildOutput {
    success: bool,
    code: i32,
    stdout: String,
    stderr: String,
}

fn wait_to_completion(child: Child, command_line: &str) -> Result<ChildOutput, RunnerError> {
    let output = child
        .wait_with_output()
        .map_err(|e| RunnerError::Spawn {
            command: command_line.to_string(),
            message: e.to_string(),
        })?;
    Ok(ChildOutput {
        success: output.status.success(),
        code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Poll the child until exit or deadline. Stdout/stderr are drained on
/// reader threads so a chatty command cannot deadlock on full pipes.
fn wait_with_timeout(
    mut child: Child,
    timeout: Duration,
    command_line: &str,
) -> Result<ChildOutput, RunnerError> {
    let stdout_handle = child.stdout.take().map(spawn_pipe_reader);
    let stderr_handle = child.stderr.take().map(spawn_pipe_reader);

    let deadline = Instant::now() + timeout;
    let poll_every = Duration::from_millis(10);

    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(RunnerError::Timeout {
                        command: command_line.to_string(),
                        timeout_ms: timeout.as_millis() as u64,
                    });
                }
                std::thread::sleep(poll_every);
            }
            Err(e) => {
                return Err(RunnerError::Spawn {
                    command: command_line.to_string(),
                    message: e.to_string(),
                });
            }
        }
    };

    let stdout = join_pipe_reader(stdout_handle);
    let stderr = join_pipe_reader(stderr_handle);

    Ok(ChildOutput {
        success: status.success(),
        code: status.code().unwrap_or(-1),
        stdout,
        stderr,
    })
}

fn spawn_pipe_reader<R: Read + Send + 'static>(mut pipe: R) -> std::thread::JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buf = String::new();
        let _ = pipe.read_to_string(&mut buf);
        buf
    })
}

fn join_pipe_reader(handle: Option<std::thread::JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}
