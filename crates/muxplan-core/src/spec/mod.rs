//! Project-local session specification: data model, validation, loading.
//!
//! A spec file (`.muxplan.yaml` / `.muxplan.yml` / `.muxplan.json`) declares
//! the windows, panes, layouts, and actions for one tmux session. The model
//! is deliberately a schema plus an executor, not a scripting language:
//! safe declarative actions by default, with explicit opt-in escape hatches
//! (`shell`, raw `tmux`) gated by [`crate::policy::Policy`].

pub mod errors;
pub mod load;
pub mod naming;
pub mod types;
pub mod validate;

pub use errors::SpecError;
pub use load::{load_file, load_project_local, load_project_local_with_names};
pub use naming::{derive_session_name, sanitize_name, validate_tmux_name};
pub use types::{
    Action, Pane, PanePlanPane, PanePlanSplit, PanePlanStep, RunAction, SendKeysAction, Session,
    ShellAction, SleepAction, Spec, SshManagerConnectAction, Target, TmuxAction,
    WaitForPromptAction, WatchAction, Window, CURRENT_VERSION,
};
