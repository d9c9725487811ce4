//! The two-stage plan compiler.
//!
//! Stage A ([`build_from_spec`]) lowers a validated [`crate::spec::Spec`]
//! into a linear stream of [`PlanAction`]s. Stage B ([`compile`]) turns that
//! stream into concrete tmux command invocations ([`Compiled`]), applying
//! variable substitution and the safety policy, and producing deterministic
//! dry-run text.
//!
//! Two operations do not reduce to a single tmux command
//! (`wait_for_prompt`, `ssh_manager_connect`); these compile to sentinel
//! commands whose reserved first token is consumed by the executor and
//! never forwarded to the runner.

pub mod action;
pub mod build;
pub mod compile;
pub mod errors;
pub mod quote;

pub use action::{
    DisplayMessageOp, EnsureSessionOp, NewWindowOp, PlanAction, PlanOp, PlanSpec, RenameWindowOp,
    SelectLayoutOp, SelectPaneOp, SelectWindowOp, SendKeysOp, SetOptionOp, ShellOp,
    SplitDirection, SplitWindowOp, SshManagerConnectOp, TmuxOp, WaitForPromptOp,
};
pub use build::{build_from_spec, from_spec, BuildOptions};
pub use compile::{
    compile, dry_run_lines, render_dry_run, Command, Compiled, SENTINEL_SSH_MANAGER_CONNECT,
    SENTINEL_WAIT_FOR_PROMPT,
};
pub use errors::PlanError;
pub use quote::{shell_join, shell_quote};
