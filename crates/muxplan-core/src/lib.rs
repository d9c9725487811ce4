//! muxplan-core: Core library for declarative tmux session planning
//!
//! This library compiles a repo-local session spec (windows, panes, layouts,
//! per-pane actions) into an ordered list of tmux commands under a safety
//! policy, and executes that plan against a running tmux server. It is used
//! by the `muxplan` CLI.
//!
//! # Main Entry Points
//!
//! - [`spec`] - Load and validate spec files
//! - [`plan`] - Two-stage compiler (spec -> plan actions -> tmux commands)
//! - [`exec`] - Execute a compiled plan (with runtime gates)
//! - [`runner`] - The tmux client boundary
//! - [`policy`] - Safety policy (allowlists, escape hatches, guardrails)

pub mod errors;
pub mod exec;
pub mod logging;
pub mod plan;
pub mod policy;
pub mod runner;
pub mod spec;
pub mod subst;

pub use errors::{MuxplanError, MuxplanResult};
pub use exec::{ExecError, Executor};
pub use plan::{
    build_from_spec, compile, dry_run_lines, from_spec, render_dry_run, BuildOptions, Command,
    Compiled, PlanAction, PlanError, PlanSpec,
};
pub use policy::Policy;
pub use runner::{NoopRunner, Runner, RunnerError, TmuxRunner};
pub use spec::{
    derive_session_name, load_file, load_project_local, Action, Pane, PanePlanPane, PanePlanSplit,
    PanePlanStep, Session, Spec, SpecError, Target, Window,
};
pub use subst::{expand_user, subst, Context};

pub use logging::init_logging;
