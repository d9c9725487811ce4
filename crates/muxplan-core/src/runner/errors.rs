use crate::errors::MuxplanError;

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("tmux runner: empty args")]
    EmptyArgs,

    #[error("tmux runner: failed to execute {command}: {message}")]
    Spawn { command: String, message: String },

    #[error("tmux runner: timed out after {timeout_ms}ms: {command}")]
    Timeout { command: String, timeout_ms: u64 },

    #[error(
        "tmux runner: {command} failed (exit {code}) (stdout=\"{stdout}\" stderr=\"{stderr}\")"
    )]
    CommandFailed {
        command: String,
        code: i32,
        stdout: String,
        stderr: String,
    },
}

impl RunnerError {
    /// Whether the error text carries one of the phrases tmux emits when
    /// its server is gone. Callers treat these as clean terminations.
    pub fn is_server_gone(&self) -> bool {
        let text = self.to_string();
        text.contains("no server running")
            || text.contains("server exited")
            || text.contains("lost server")
    }
}

impl MuxplanError for RunnerError {
    fn error_code(&self) -> &'static str {
        match self {
            RunnerError::EmptyArgs => "RUNNER_EMPTY_ARGS",
            RunnerError::Spawn { .. } => "RUNNER_SPAWN_FAILED",
            RunnerError::Timeout { .. } => "RUNNER_TIMEOUT",
            RunnerError::CommandFailed { .. } => "RUNNER_COMMAND_FAILED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failed_names_argv_and_streams() {
        let error = RunnerError::CommandFailed {
            command: "tmux new-window -t demo".to_string(),
            code: 1,
            stdout: String::new(),
            stderr: "can't find session: demo".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("tmux new-window -t demo"));
        assert!(msg.contains("can't find session"));
        assert_eq!(error.error_code(), "RUNNER_COMMAND_FAILED");
        assert!(!error.is_user_error());
    }

    #[test]
    fn test_server_gone_detection() {
        let error = RunnerError::CommandFailed {
            command: "tmux list-sessions".to_string(),
            code: 1,
            stdout: String::new(),
            stderr: "no server running on /tmp/tmux-1000/default".to_string(),
        };
        assert!(error.is_server_gone());

        let error = RunnerError::CommandFailed {
            command: "tmux list-sessions".to_string(),
            code: 1,
            stdout: String::new(),
            stderr: "lost server".to_string(),
        };
        assert!(error.is_server_gone());

        let error = RunnerError::EmptyArgs;
        assert!(!error.is_server_gone());
    }

    #[test]
    fn test_timeout_error() {
        let error = RunnerError::Timeout {
            command: "tmux capture-pane -p".to_string(),
            timeout_ms: 5000,
        };
        assert!(error.to_string().contains("timed out after 5000ms"));
        assert_eq!(error.error_code(), "RUNNER_TIMEOUT");
    }
}
