use crate::errors::MuxplanError;
use crate::spec::SpecError;

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("build options: project_root is required")]
    MissingProjectRoot,

    #[error("context: missing session name")]
    MissingSessionName,

    #[error("context: missing project path")]
    MissingProjectPath,

    #[error("resolved session name is empty")]
    EmptySessionName,

    #[error("plan has no actions")]
    EmptyPlan,

    #[error("too many actions ({count} > {max})")]
    TooManyActions { count: usize, max: usize },

    #[error("compiled command[{index}] too long ({len} bytes > {max})")]
    CommandTooLong {
        index: usize,
        len: usize,
        max: usize,
    },

    #[error("{path} ({kind}): {message}")]
    InvalidAction {
        path: String,
        kind: String,
        message: String,
    },

    #[error("{path} ({kind}): {message}")]
    PolicyViolation {
        path: String,
        kind: String,
        message: String,
    },

    #[error("spec error: {source}")]
    Spec {
        #[from]
        source: SpecError,
    },
}

impl PlanError {
    pub fn invalid(path: impl Into<String>, kind: impl Into<String>, message: impl Into<String>) -> Self {
        PlanError::InvalidAction {
            path: path.into(),
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn policy(path: impl Into<String>, kind: impl Into<String>, message: impl Into<String>) -> Self {
        PlanError::PolicyViolation {
            path: path.into(),
            kind: kind.into(),
            message: message.into(),
        }
    }
}

impl MuxplanError for PlanError {
    fn error_code(&self) -> &'static str {
        match self {
            PlanError::MissingProjectRoot => "PLAN_MISSING_PROJECT_ROOT",
            PlanError::MissingSessionName => "PLAN_MISSING_SESSION_NAME",
            PlanError::MissingProjectPath => "PLAN_MISSING_PROJECT_PATH",
            PlanError::EmptySessionName => "PLAN_EMPTY_SESSION_NAME",
            PlanError::EmptyPlan => "PLAN_EMPTY",
            PlanError::TooManyActions { .. } => "PLAN_TOO_MANY_ACTIONS",
            PlanError::CommandTooLong { .. } => "PLAN_COMMAND_TOO_LONG",
            PlanError::InvalidAction { .. } => "PLAN_INVALID_ACTION",
            PlanError::PolicyViolation { .. } => "PLAN_POLICY_VIOLATION",
            PlanError::Spec { .. } => "PLAN_SPEC_ERROR",
        }
    }

    fn is_user_error(&self) -> bool {
        true
    }
}
