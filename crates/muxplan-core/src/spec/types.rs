//! The spec data model.
//!
//! Field shapes mirror the on-disk YAML/JSON format. Unknown fields are
//! ignored for forward compatibility; unknown action types are rejected at
//! validation time. Optional booleans that default to true (`attach`,
//! `switch_client`, `run.enter`) are modelled as `Option<bool>` with
//! accessor methods so an absent key and an explicit `true` behave the same.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Current schema version for project-local specs.
pub const CURRENT_VERSION: i64 = 1;

/// Root document of a session spec.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Spec {
    /// Schema version; 0 (absent) defaults to [`CURRENT_VERSION`].
    pub version: i64,

    /// Optional display name; session naming is driven by [`Session`].
    pub name: String,

    pub description: String,

    pub session: Session,

    /// Extra variables for `${VAR}` substitution in action strings.
    pub env: BTreeMap<String, String>,

    /// Declarative windows representation.
    pub windows: Vec<Window>,

    /// Script-like alternative to `windows`; at least one of the two must
    /// be non-empty.
    pub actions: Vec<Action>,

    /// Non-functional metadata, ignored by the pipeline.
    pub meta: BTreeMap<String, String>,
}

/// How to create/target the session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    /// Overrides the derived session name. Charset `[A-Za-z0-9_-]+`.
    pub name: String,

    /// Namespace prefix used when the name is derived from the project dir.
    pub prefix: String,

    /// Working directory for the session; defaults to the project root.
    pub root: String,

    pub attach: Option<bool>,

    pub switch_client: Option<bool>,

    /// Mirror of the user's tmux `base-index` / `pane-base-index` options.
    pub base_index: Option<i64>,
    pub pane_base_index: Option<i64>,

    /// Window to select after all windows are created: `"active"` (no-op),
    /// a numeric index, or a window name.
    pub focus_window: String,
}

impl Session {
    pub fn attach(&self) -> bool {
        self.attach.unwrap_or(true)
    }

    pub fn switch_client(&self) -> bool {
        self.switch_client.unwrap_or(true)
    }
}

/// A tmux window.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Window {
    pub name: String,

    /// Working directory for panes in this window; defaults to the session
    /// root.
    pub root: String,

    /// tmux layout name ("even-horizontal", "main-vertical", ...).
    pub layout: String,

    /// Select this window after creation.
    pub focus: bool,

    /// Pane to select after the window's panes are created: `"active"`
    /// (no-op) or a numeric index relative to the user's pane-base-index.
    pub focus_pane: String,

    /// Legacy sequential pane list. Ignored when `pane_plan` is present.
    pub panes: Vec<Pane>,

    /// Declarative split plan; preferred over `panes` because it encodes
    /// split geometry.
    pub pane_plan: Vec<PanePlanStep>,

    /// Window-scoped actions (advanced usage).
    pub actions: Vec<Action>,
}

/// One step of a pane plan: exactly one of `pane` or `split`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PanePlanStep {
    pub pane: Option<PanePlanPane>,
    pub split: Option<PanePlanSplit>,
}

/// The pane created/selected after a split.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PanePlanPane {
    pub name: String,
    pub root: String,

    /// Focus request. Lowered to selecting the window, never a hardcoded
    /// pane index; use `Window::focus_pane` for explicit indices.
    pub focus: bool,

    pub actions: Vec<Action>,

    /// Shorthand for a single `shell` action (subject to policy).
    pub command: String,
}

/// How to split from the currently active pane.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PanePlanSplit {
    /// "h" (side-by-side) or "v" (stacked).
    pub direction: String,

    /// Optional size: "30%" (percent) or "20" (absolute rows/cols).
    pub size: String,
}

/// Legacy pane representation within a window.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Pane {
    pub name: String,
    pub root: String,
    pub focus: bool,
    pub actions: Vec<Action>,

    /// Shorthand for a single `shell` action (subject to policy).
    pub command: String,
}

/// A single declarative operation, dispatched on `type`.
///
/// Exactly one payload field matching the type must be present; validation
/// enforces this and rejects unknown types.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: String,

    /// Where the action applies; unset fields default to the enclosing
    /// session/window during compilation.
    pub target: Target,

    pub run: Option<RunAction>,
    pub send_keys: Option<SendKeysAction>,
    pub shell: Option<ShellAction>,
    pub sleep: Option<SleepAction>,
    pub watch: Option<WatchAction>,
    pub wait_for_prompt: Option<WaitForPromptAction>,
    pub ssh_manager_connect: Option<SshManagerConnectAction>,
    /// Accepted under either key: `tmux:` (canonical) or the
    /// mux-agnostic `mux:` spelling; same for the `type` tag.
    #[serde(alias = "mux")]
    pub tmux: Option<TmuxAction>,

    /// Best-effort: a failure does not abort the remaining plan.
    pub ignore_error: bool,

    /// Shown in previews.
    pub comment: String,
}

/// tmux target coordinates for an action.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Target {
    pub session: String,
    pub window: String,
    pub pane: String,
}

/// Run a program with args (sent as keystrokes to the target pane).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunAction {
    pub program: String,
    pub args: Vec<String>,

    /// Send Enter after the command line. Defaults to true.
    pub enter: Option<bool>,
}

impl RunAction {
    pub fn enter(&self) -> bool {
        self.enter.unwrap_or(true)
    }
}

/// Send literal key tokens to a pane.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SendKeysAction {
    pub keys: Vec<String>,
    pub enter: bool,
}

/// Escape hatch for arbitrary shell. Requires `Policy::allow_shell`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellAction {
    pub cmd: String,

    /// Shell override (e.g. "zsh"); informational for now.
    pub shell: String,
}

/// Pause for timing. Lowers to a shell `sleep`, so it requires
/// `Policy::allow_shell`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SleepAction {
    pub ms: i64,
}

/// Safe repeat helper; compiles to a send-keys of
/// `watch -n <interval> -t -- <command>`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchAction {
    /// Seconds between runs; values <= 0 mean 2.
    pub interval_s: i64,
    pub command: String,
}

/// Safe readiness gate: poll pane output until a prompt-like last line
/// appears and the output has settled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitForPromptAction {
    /// Total bound; <= 0 means 15000.
    pub timeout_ms: i64,

    /// Output must be unchanged for this long; <= 0 means 500.
    pub min_quiet_ms: i64,

    /// Extra delay after readiness; <= 0 means 250.
    pub settle_ms: i64,

    /// Regex for the prompt-like last line; empty means the executor
    /// default.
    pub prompt_regex: String,

    /// How many trailing lines of pane output to inspect; <= 0 means 200.
    pub max_lines: i64,
}

/// Safe structured SSH connect. Password automation is delegated to the
/// external connector binary; secrets never pass through this process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SshManagerConnectAction {
    pub host: String,
    pub user: String,

    /// <= 0 means ssh default.
    pub port: i64,

    /// "askpass" (default), "manual", or "key".
    pub login_mode: String,

    /// Best-effort bound for the connect attempt; <= 0 means executor
    /// default.
    pub connect_timeout_ms: i64,
}

/// Raw tmux subcommand invocation. Requires
/// `Policy::allow_tmux_passthrough` and allowlist membership.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TmuxAction {
    pub name: String,
    pub args: Vec<String>,
}
