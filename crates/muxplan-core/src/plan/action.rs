//! The intermediate representation consumed by the second compiler stage.
//!
//! Each spec-level construct lowers to one or more [`PlanAction`]s. The
//! operation set mirrors the tmux primitives the pipeline is willing to
//! emit, plus the two runtime gates and the two escape hatches.

/// A linear plan: the output of compiler stage A.
#[derive(Debug, Clone, Default)]
pub struct PlanSpec {
    pub version: i64,

    /// Display name (spec name or project name).
    pub name: String,

    /// Executed strictly in order; the compiler never re-orders.
    pub actions: Vec<PlanAction>,

    /// True when the plan needs an unsafe capability (shell or tmux
    /// passthrough).
    pub unsafe_required: bool,
}

/// One plan step plus its error disposition.
#[derive(Debug, Clone)]
pub struct PlanAction {
    pub op: PlanOp,

    /// Best-effort: the executor continues past a failure of any command
    /// emitted from this action.
    pub ignore_error: bool,
}

impl PlanAction {
    pub fn new(op: PlanOp) -> Self {
        Self {
            op,
            ignore_error: false,
        }
    }

    pub fn with_ignore_error(op: PlanOp, ignore_error: bool) -> Self {
        Self { op, ignore_error }
    }

    /// Short kind name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match &self.op {
            PlanOp::EnsureSession(_) => "ensure_session",
            PlanOp::NewWindow(_) => "new_window",
            PlanOp::SplitWindow(_) => "split_window",
            PlanOp::RenameWindow(_) => "rename_window",
            PlanOp::SelectWindow(_) => "select_window",
            PlanOp::SelectPane(_) => "select_pane",
            PlanOp::SelectLayout(_) => "select_layout",
            PlanOp::SendKeys(_) => "send_keys",
            PlanOp::SetOption(_) => "set_option",
            PlanOp::DisplayMessage(_) => "display_message",
            PlanOp::WaitForPrompt(_) => "wait_for_prompt",
            PlanOp::SshManagerConnect(_) => "ssh_manager_connect",
            PlanOp::Shell(_) => "shell",
            PlanOp::Tmux(_) => "tmux",
        }
    }
}

/// The operation set.
#[derive(Debug, Clone)]
pub enum PlanOp {
    EnsureSession(EnsureSessionOp),
    NewWindow(NewWindowOp),
    SplitWindow(SplitWindowOp),
    RenameWindow(RenameWindowOp),
    SelectWindow(SelectWindowOp),
    SelectPane(SelectPaneOp),
    SelectLayout(SelectLayoutOp),
    SendKeys(SendKeysOp),
    SetOption(SetOptionOp),
    DisplayMessage(DisplayMessageOp),

    /// Runtime polling gate; compiles to a sentinel command.
    WaitForPrompt(WaitForPromptOp),

    /// Structured SSH connect; compiles to a sentinel command.
    SshManagerConnect(SshManagerConnectOp),

    /// Escape hatch: `bash -lc <cmd>` in a fresh window. Unsafe.
    Shell(ShellOp),

    /// Escape hatch: raw tmux args (allowlist-validated). Unsafe.
    Tmux(TmuxOp),
}

/// Create the session detached if missing. Non-atomic: may fail when the
/// session already exists, so callers usually pre-check instead.
#[derive(Debug, Clone, Default)]
pub struct EnsureSessionOp {
    pub session: String,
    /// Empty means the context working dir.
    pub cwd: String,
}

#[derive(Debug, Clone, Default)]
pub struct NewWindowOp {
    pub session: String,
    pub name: String,
    pub cwd: String,
    /// Optional command to run in the window via `bash -lc`.
    pub command: String,
}

/// Split direction, tmux-flag oriented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitDirection {
    Horizontal,
    Vertical,
}

impl SplitDirection {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "h" => Some(SplitDirection::Horizontal),
            "v" => Some(SplitDirection::Vertical),
            _ => None,
        }
    }

    pub fn flag(self) -> &'static str {
        match self {
            SplitDirection::Horizontal => "-h",
            SplitDirection::Vertical => "-v",
        }
    }

    pub fn short(self) -> &'static str {
        match self {
            SplitDirection::Horizontal => "h",
            SplitDirection::Vertical => "v",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SplitWindowOp {
    pub session: String,
    /// Window name; empty targets the session's current window.
    pub window: String,
    pub direction: SplitDirection,
    pub cwd: String,
    /// 1..=99 when set.
    pub percent: Option<u8>,
    pub command: String,
}

#[derive(Debug, Clone, Default)]
pub struct RenameWindowOp {
    pub session: String,
    /// Source window identifier; empty means window "0".
    pub from: String,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct SelectWindowOp {
    pub session: String,
    pub window: String,
}

#[derive(Debug, Clone, Default)]
pub struct SelectPaneOp {
    pub session: String,
    /// Pane index, `%id`, or a full `session:window.pane` target.
    pub pane: String,
}

#[derive(Debug, Clone, Default)]
pub struct SelectLayoutOp {
    pub session: String,
    pub window: String,
    pub layout: String,
}

#[derive(Debug, Clone, Default)]
pub struct SendKeysOp {
    pub session: String,
    pub window: String,
    pub pane: String,

    /// Raw key tokens; used instead of `command` when non-empty.
    pub keys: Vec<String>,

    /// Command line sent as a single key token.
    pub command: String,

    /// Append `C-m`.
    pub enter: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SetOptionOp {
    pub session: String,
    pub option: String,
    pub value: String,
    /// `set-option -g`.
    pub global: bool,
}

#[derive(Debug, Clone, Default)]
pub struct DisplayMessageOp {
    pub message: String,
    /// <= 0 means 1500.
    pub duration_ms: i64,
}

#[derive(Debug, Clone, Default)]
pub struct WaitForPromptOp {
    pub session: String,
    pub window: String,
    pub pane: String,
    pub timeout_ms: i64,
    pub min_quiet_ms: i64,
    pub settle_ms: i64,
    pub prompt_regex: String,
    pub max_lines: i64,
}

#[derive(Debug, Clone, Default)]
pub struct SshManagerConnectOp {
    pub session: String,
    pub window: String,
    pub pane: String,
    pub host: String,
    pub user: String,
    pub port: i64,
    pub login_mode: String,
    pub connect_timeout_ms: i64,
}

#[derive(Debug, Clone, Default)]
pub struct ShellOp {
    pub session: String,
    /// Window name for the shell window; empty means "shell".
    pub name: String,
    pub cwd: String,
    pub cmd: String,
}

#[derive(Debug, Clone, Default)]
pub struct TmuxOp {
    /// Raw args excluding the leading binary name.
    pub args: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_direction_parse() {
        assert_eq!(SplitDirection::parse("h"), Some(SplitDirection::Horizontal));
        assert_eq!(SplitDirection::parse(" V "), Some(SplitDirection::Vertical));
        assert_eq!(SplitDirection::parse("x"), None);
        assert_eq!(SplitDirection::parse(""), None);
    }

    #[test]
    fn test_split_direction_flags() {
        assert_eq!(SplitDirection::Horizontal.flag(), "-h");
        assert_eq!(SplitDirection::Vertical.flag(), "-v");
        assert_eq!(SplitDirection::Horizontal.short(), "h");
    }

    #[test]
    fn test_plan_action_kind_names() {
        let action = PlanAction::new(PlanOp::SelectWindow(SelectWindowOp::default()));
        assert_eq!(action.kind(), "select_window");
        assert!(!action.ignore_error);

        let action = PlanAction::with_ignore_error(
            PlanOp::Shell(ShellOp::default()),
            true,
        );
        assert_eq!(action.kind(), "shell");
        assert!(action.ignore_error);
    }
}
