use std::path::PathBuf;

use crate::errors::MuxplanError;

#[derive(Debug, thiserror::Error)]
pub enum SpecError {
    #[error("Failed to read spec file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse spec file '{path}' as {format}: {message}")]
    Parse {
        path: PathBuf,
        format: String,
        message: String,
    },

    #[error("unsupported spec version {found} (expected {expected})")]
    UnsupportedVersion { found: i64, expected: i64 },

    #[error("spec must define either windows[] or actions[]")]
    EmptySpec,

    #[error("{path}: {message}")]
    Schema { path: String, message: String },

    #[error("invalid name '{name}' (allowed: [A-Za-z0-9_-])")]
    InvalidName { name: String },

    #[error("{path}: {message}")]
    PolicyViolation { path: String, message: String },

    #[error("spec path is required")]
    EmptyPath,
}

impl SpecError {
    /// Schema error with the location path prefixed, e.g.
    /// `windows[2](editor).pane_plan[4]: last step must be pane`.
    pub fn schema(path: impl Into<String>, message: impl Into<String>) -> Self {
        SpecError::Schema {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn policy(path: impl Into<String>, message: impl Into<String>) -> Self {
        SpecError::PolicyViolation {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl MuxplanError for SpecError {
    fn error_code(&self) -> &'static str {
        match self {
            SpecError::Io { .. } => "SPEC_IO_ERROR",
            SpecError::Parse { .. } => "SPEC_PARSE_ERROR",
            SpecError::UnsupportedVersion { .. } => "SPEC_UNSUPPORTED_VERSION",
            SpecError::EmptySpec => "SPEC_EMPTY",
            SpecError::Schema { .. } => "SPEC_SCHEMA_ERROR",
            SpecError::InvalidName { .. } => "SPEC_INVALID_NAME",
            SpecError::PolicyViolation { .. } => "SPEC_POLICY_VIOLATION",
            SpecError::EmptyPath => "SPEC_EMPTY_PATH",
        }
    }

    fn is_user_error(&self) -> bool {
        !matches!(self, SpecError::Io { .. })
    }
}
