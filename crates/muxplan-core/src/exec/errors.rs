use crate::errors::MuxplanError;
use crate::runner::RunnerError;

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("runner error: {source}")]
    Runner {
        #[from]
        source: RunnerError,
    },

    #[error("{sentinel}: invalid sentinel args: {message}")]
    InvalidSentinel { sentinel: String, message: String },

    #[error("wait_for_prompt: invalid prompt_regex \"{pattern}\": {message}")]
    InvalidPromptRegex { pattern: String, message: String },

    #[error("wait_for_prompt: timed out after {timeout_ms}ms waiting for readiness in {target}")]
    GateTimeout { timeout_ms: i64, target: String },

    #[error("ssh_manager_connect: unsupported login_mode \"{mode}\"")]
    UnsupportedLoginMode { mode: String },
}

impl ExecError {
    pub fn invalid_sentinel(sentinel: &str, message: impl Into<String>) -> Self {
        ExecError::InvalidSentinel {
            sentinel: sentinel.trim_matches('_').to_string(),
            message: message.into(),
        }
    }

    /// Whether the underlying failure is the tmux server going away.
    pub fn is_server_gone(&self) -> bool {
        matches!(self, ExecError::Runner { source } if source.is_server_gone())
    }
}

impl MuxplanError for ExecError {
    fn error_code(&self) -> &'static str {
        match self {
            ExecError::Runner { .. } => "EXEC_RUNNER_ERROR",
            ExecError::InvalidSentinel { .. } => "EXEC_INVALID_SENTINEL",
            ExecError::InvalidPromptRegex { .. } => "EXEC_INVALID_PROMPT_REGEX",
            ExecError::GateTimeout { .. } => "EXEC_GATE_TIMEOUT",
            ExecError::UnsupportedLoginMode { .. } => "EXEC_UNSUPPORTED_LOGIN_MODE",
        }
    }

    fn is_user_error(&self) -> bool {
        matches!(
            self,
            ExecError::InvalidPromptRegex { .. } | ExecError::UnsupportedLoginMode { .. }
        )
    }
}
