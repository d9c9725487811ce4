//! Runtime safety policy shared by the compiler and the executor.
//!
//! The policy is never persisted in a spec file; it is supplied by the
//! caller (CLI flags, environment overrides) and answers two questions:
//! is this tmux subcommand allowed, and is this shell command allowed?
//! It also carries guardrails against runaway specs.

use std::collections::BTreeSet;

/// Default cap on the number of plan actions a single spec may produce.
pub const DEFAULT_MAX_ACTIONS: usize = 200;

/// Default cap on the total argument bytes of a single compiled command.
pub const DEFAULT_MAX_COMMAND_LEN: usize = 4096;

/// Runtime execution allowances.
#[derive(Debug, Clone)]
pub struct Policy {
    /// Permits `shell` actions (and `sleep`, which lowers to shell).
    /// Disabled by default.
    pub allow_shell: bool,

    /// Permits raw `tmux` passthrough actions. Disabled by default.
    pub allow_tmux_passthrough: bool,

    /// Allowlist of tmux subcommands accepted for passthrough.
    pub allowed_tmux_commands: BTreeSet<String>,

    /// Subcommands blocked even if allowlisted.
    pub denied_tmux_commands: BTreeSet<String>,

    /// When non-empty, shell commands must start with one of these prefixes.
    pub allowed_shell_prefixes: Vec<String>,

    /// Guardrail against runaway specs.
    pub max_actions: usize,

    /// Bounds the total argument bytes of a single compiled command.
    pub max_command_len: usize,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            allow_shell: false,
            allow_tmux_passthrough: false,
            allowed_tmux_commands: default_allowed_tmux_commands(),
            denied_tmux_commands: default_denied_tmux_commands(),
            allowed_shell_prefixes: Vec::new(),
            max_actions: DEFAULT_MAX_ACTIONS,
            max_command_len: DEFAULT_MAX_COMMAND_LEN,
        }
    }
}

/// Conservative "session construction" interface.
///
/// Notably excludes execution vectors: run-shell, pipe-pane, source-file,
/// display-popup, and friends live in the denylist instead.
pub fn default_allowed_tmux_commands() -> BTreeSet<String> {
    [
        // Sessions
        "new-session",
        "kill-session",
        "rename-session",
        "switch-client",
        "select-session",
        "attach-session",
        // Windows
        "new-window",
        "kill-window",
        "rename-window",
        "select-window",
        "move-window",
        "swap-window",
        // Panes
        "split-window",
        "kill-pane",
        "select-pane",
        "swap-pane",
        "resize-pane",
        "break-pane",
        "join-pane",
        // Layout
        "select-layout",
        // Input / config
        "send-keys",
        "set-buffer",
        "display-message",
        "set-option",
        "set-window-option",
        "set-hook",
        // Introspection (useful for preview)
        "list-windows",
        "list-panes",
        "list-sessions",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

/// High-risk or surprising subcommands: execution vectors and state
/// mutation beyond session layout.
pub fn default_denied_tmux_commands() -> BTreeSet<String> {
    [
        "run-shell",
        "if-shell",
        "pipe-pane",
        "respawn-pane",
        "respawn-window",
        "source-file",
        "source",
        "display-popup",
        "load-buffer",
        "save-buffer",
        "capture-pane",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

impl Policy {
    /// Whether a tmux subcommand may be emitted through the passthrough
    /// escape hatch.
    ///
    /// Always false when passthrough is disabled. Otherwise the trimmed,
    /// lower-cased subcommand must not be denied and must be allowlisted;
    /// an empty allowlist admits nothing.
    pub fn is_tmux_command_allowed(&self, cmd: &str) -> bool {
        if !self.allow_tmux_passthrough {
            return false;
        }
        let cmd = cmd.trim().to_lowercase();
        if cmd.is_empty() {
            return false;
        }
        if self
            .denied_tmux_commands
            .iter()
            .any(|d| d.trim().to_lowercase() == cmd)
        {
            return false;
        }
        self.allowed_tmux_commands
            .iter()
            .any(|a| a.trim().to_lowercase() == cmd)
    }

    /// Whether an arbitrary shell command may run.
    ///
    /// Requires `allow_shell`. When the prefix list is non-empty, the
    /// command (leading whitespace stripped) must start with one of the
    /// configured prefixes.
    pub fn is_shell_command_allowed(&self, cmd: &str) -> bool {
        if !self.allow_shell {
            return false;
        }
        let cmd = cmd.trim_start_matches([' ', '\t']);
        if cmd.is_empty() {
            return false;
        }
        if self.allowed_shell_prefixes.is_empty() {
            return true;
        }
        self.allowed_shell_prefixes.iter().any(|p| {
            let p = p.trim_start_matches([' ', '\t']);
            !p.is_empty() && cmd.starts_with(p)
        })
    }

    /// Whether a denied subcommand blocks this name regardless of the
    /// passthrough toggle. Used by spec-level policy validation.
    pub fn is_tmux_command_denied(&self, cmd: &str) -> bool {
        let cmd = cmd.trim().to_lowercase();
        self.denied_tmux_commands
            .iter()
            .any(|d| d.trim().to_lowercase() == cmd)
    }

    /// Allowlist membership check, independent of the passthrough toggle.
    pub fn is_tmux_command_allowlisted(&self, cmd: &str) -> bool {
        let cmd = cmd.trim().to_lowercase();
        self.allowed_tmux_commands
            .iter()
            .any(|a| a.trim().to_lowercase() == cmd)
    }
}
