//! Compiler stage A: lower a validated spec into a linear plan.
//!
//! The conversion is deterministic and explicit; it does not attempt to
//! infer split graphs beyond the "first pane + sequential splits" model the
//! pane plan encodes. Policy is enforced here for the escape hatches so a
//! rejected spec never produces a plan at all.

use std::path::Path;

use tracing::debug;

use crate::policy::Policy;
use crate::spec::{derive_session_name, Action, Spec, Window};
use crate::subst::{expand_user, subst, Context};

use super::action::{
    EnsureSessionOp, NewWindowOp, PlanAction, PlanOp, PlanSpec, SelectLayoutOp, SelectPaneOp,
    SelectWindowOp, SendKeysOp, SetOptionOp, ShellOp, SplitDirection, SplitWindowOp,
    SshManagerConnectOp, TmuxOp, WaitForPromptOp,
};
use super::errors::PlanError;
use super::quote::{shell_join, shell_quote};

/// Controls conversion and policy enforcement.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Absolute (or `~`-prefixed) project root directory. Required.
    pub project_root: String,

    /// Derived from `basename(project_root)` when empty.
    pub project_name: String,

    /// Session the executor intends to target. When empty, resolved from
    /// the spec (`session.name`, then prefix + project basename).
    pub session_name: String,

    /// Prefer the windows representation when both windows and actions are
    /// present. Defaults to true.
    pub prefer_windows: bool,

    /// Prepend an ensure-session action. When false the caller is expected
    /// to create the session before executing the plan.
    pub include_ensure_session: bool,

    /// Safety gates for the escape hatches.
    pub policy: Policy,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            project_root: String::new(),
            project_name: String::new(),
            session_name: String::new(),
            prefer_windows: true,
            include_ensure_session: false,
            policy: Policy::default(),
        }
    }
}

/// Convenience entry point for callers that already hold a [`Context`].
///
/// Resolves the session name from the context, then the spec, then the
/// project path, and lowers with a default policy carrying the two toggles.
/// Does not execute anything; pair with [`super::compile`].
pub fn from_spec(
    ctx: &Context,
    spec: &Spec,
    allow_shell: bool,
    allow_tmux_passthrough: bool,
    include_ensure_session: bool,
) -> Result<PlanSpec, PlanError> {
    let policy = Policy {
        allow_shell,
        allow_tmux_passthrough,
        ..Policy::default()
    };

    let opt = BuildOptions {
        project_root: ctx.project_path.clone(),
        project_name: ctx.project_name.clone(),
        session_name: ctx.session_name.clone(),
        prefer_windows: true,
        include_ensure_session,
        policy,
    };

    let (_, plan, _) = build_from_spec(spec, opt)?;
    Ok(plan)
}

/// Lower a spec into a plan, returning the substitution context, the plan,
/// and whether any unsafe capability is required.
///
/// The spec is re-validated (structurally and against the policy) so a
/// directly constructed `Spec` gets the same guarantees as a loaded one.
pub fn build_from_spec(
    spec: &Spec,
    opt: BuildOptions,
) -> Result<(Context, PlanSpec, bool), PlanError> {
    let mut spec = spec.clone();
    spec.validate()?;

    let project_root = opt.project_root.trim();
    if project_root.is_empty() {
        return Err(PlanError::MissingProjectRoot);
    }
    let project_root = expand_user(project_root);

    let project_name = {
        let name = opt.project_name.trim();
        if name.is_empty() {
            path_basename(&project_root)
        } else {
            name.to_string()
        }
    };

    // Session name precedence: caller > spec.session.name > derived.
    let mut session_name = opt.session_name.trim().to_string();
    if session_name.is_empty() {
        let spec_name = spec.session.name.trim();
        if !spec_name.is_empty() {
            session_name = spec_name.to_string();
        } else {
            session_name = derive_session_name(spec.session.prefix.trim(), &project_root);
        }
    }
    if session_name.is_empty() {
        return Err(PlanError::EmptySessionName);
    }

    let session_root = {
        let root = spec.session.root.trim();
        if root.is_empty() {
            project_root.clone()
        } else {
            expand_user(root)
        }
    };

    spec.validate_policy(&opt.policy)?;

    let ctx = Context {
        project_name: project_name.clone(),
        project_path: project_root,
        session_name: session_name.clone(),
        working_dir: session_root.clone(),
        env: spec.env.clone(),
        tmux_socket: String::new(),
    };

    let mut plan = PlanSpec {
        version: spec.version,
        name: if spec.name.trim().is_empty() {
            project_name
        } else {
            spec.name.trim().to_string()
        },
        actions: Vec::new(),
        unsafe_required: false,
    };

    if opt.include_ensure_session {
        plan.actions
            .push(PlanAction::new(PlanOp::EnsureSession(EnsureSessionOp {
                session: session_name.clone(),
                cwd: session_root.clone(),
            })));
    }

    // Mirror the user's index preferences before any window is created.
    if let Some(base_index) = spec.session.base_index {
        plan.actions
            .push(PlanAction::new(PlanOp::SetOption(SetOptionOp {
                session: session_name.clone(),
                option: "base-index".to_string(),
                value: base_index.to_string(),
                global: true,
            })));
    }
    if let Some(pane_base_index) = spec.session.pane_base_index {
        plan.actions
            .push(PlanAction::new(PlanOp::SetOption(SetOptionOp {
                session: session_name.clone(),
                option: "pane-base-index".to_string(),
                value: pane_base_index.to_string(),
                global: true,
            })));
    }

    // Representation choice: script-like actions or declarative windows.
    let use_actions = !spec.actions.is_empty() && !(opt.prefer_windows && !spec.windows.is_empty());

    let mut unsafe_required = false;
    if use_actions {
        let (actions, used_unsafe) =
            convert_actions(&ctx, &session_name, &spec.actions, &opt.policy, "actions")?;
        unsafe_required |= used_unsafe;
        plan.actions.extend(actions);
    } else {
        let (actions, used_unsafe) =
            convert_windows(&ctx, &session_name, &session_root, &spec.windows, &opt.policy)?;
        unsafe_required |= used_unsafe;
        plan.actions.extend(actions);

        // Final window focus, compiled declaratively so users never need
        // tmux passthrough just to pick the active window.
        let focus_window = spec.session.focus_window.trim();
        if !focus_window.is_empty() && !focus_window.eq_ignore_ascii_case("active") {
            plan.actions
                .push(PlanAction::new(PlanOp::SelectWindow(SelectWindowOp {
                    session: session_name.clone(),
                    window: focus_window.to_string(),
                })));
        }
    }

    plan.unsafe_required = unsafe_required;

    debug!(
        event = "core.plan.build_completed",
        session = session_name.as_str(),
        actions = plan.actions.len(),
        unsafe_required = unsafe_required
    );

    Ok((ctx, plan, unsafe_required))
}

fn path_basename(p: &str) -> String {
    let trimmed = p.trim_end_matches(std::path::MAIN_SEPARATOR);
    Path::new(trimmed)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| trimmed.to_string())
}

fn convert_actions(
    ctx: &Context,
    session_name: &str,
    actions: &[Action],
    policy: &Policy,
    path: &str,
) -> Result<(Vec<PlanAction>, bool), PlanError> {
    let mut out = Vec::new();
    let mut unsafe_used = false;

    for (i, a) in actions.iter().enumerate() {
        let (acts, used_unsafe) =
            convert_single_action(ctx, session_name, a, policy, &format!("{}[{}]", path, i))?;
        unsafe_used |= used_unsafe;
        out.extend(acts);
    }

    Ok((out, unsafe_used))
}

fn convert_single_action(
    ctx: &Context,
    default_session: &str,
    a: &Action,
    policy: &Policy,
    path: &str,
) -> Result<(Vec<PlanAction>, bool), PlanError> {
    let session = {
        let s = a.target.session.trim();
        if s.is_empty() {
            default_session.to_string()
        } else {
            s.to_string()
        }
    };
    let window = a.target.window.trim().to_string();
    let pane = a.target.pane.trim().to_string();
    let kind = a.action_type.as_str();

    let wrap = |op: PlanOp| PlanAction::with_ignore_error(op, a.ignore_error);

    match kind {
        "send_keys" => {
            let Some(send_keys) = a.send_keys.as_ref() else {
                return Err(PlanError::invalid(path, kind, "missing send_keys{}"));
            };
            let op = SendKeysOp {
                session,
                window,
                pane,
                keys: send_keys.keys.clone(),
                command: String::new(),
                enter: send_keys.enter,
            };
            Ok((vec![wrap(PlanOp::SendKeys(op))], false))
        }

        "run" => {
            let Some(run) = a.run.as_ref() else {
                return Err(PlanError::invalid(path, kind, "missing run{}"));
            };
            // Modelled as send-keys of a single shell command line.
            let mut argv = vec![run.program.clone()];
            argv.extend(run.args.iter().cloned());
            let op = SendKeysOp {
                session,
                window,
                pane,
                keys: Vec::new(),
                command: shell_join(&argv),
                enter: run.enter(),
            };
            Ok((vec![wrap(PlanOp::SendKeys(op))], false))
        }

        "watch" => {
            let Some(watch) = a.watch.as_ref() else {
                return Err(PlanError::invalid(path, kind, "missing watch{}"));
            };
            let interval = if watch.interval_s > 0 {
                watch.interval_s
            } else {
                2
            };
            let command = watch.command.trim();
            if command.is_empty() {
                return Err(PlanError::invalid(path, kind, "watch.command empty"));
            }
            let op = SendKeysOp {
                session,
                window,
                pane,
                keys: Vec::new(),
                command: format!("watch -n {} -t -- {}", interval, command),
                enter: true,
            };
            Ok((vec![wrap(PlanOp::SendKeys(op))], false))
        }

        "wait_for_prompt" => {
            let Some(wait) = a.wait_for_prompt.as_ref() else {
                return Err(PlanError::invalid(path, kind, "missing wait_for_prompt{}"));
            };
            let op = WaitForPromptOp {
                session,
                window,
                pane,
                timeout_ms: wait.timeout_ms,
                min_quiet_ms: wait.min_quiet_ms,
                settle_ms: wait.settle_ms,
                prompt_regex: wait.prompt_regex.trim().to_string(),
                max_lines: wait.max_lines,
            };
            Ok((vec![wrap(PlanOp::WaitForPrompt(op))], false))
        }

        "ssh_manager_connect" => {
            let Some(connect) = a.ssh_manager_connect.as_ref() else {
                return Err(PlanError::invalid(
                    path,
                    kind,
                    "missing ssh_manager_connect{}",
                ));
            };
            let op = SshManagerConnectOp {
                session,
                window,
                pane,
                host: connect.host.trim().to_string(),
                user: connect.user.trim().to_string(),
                port: connect.port,
                login_mode: connect.login_mode.trim().to_lowercase(),
                connect_timeout_ms: connect.connect_timeout_ms,
            };
            Ok((vec![wrap(PlanOp::SshManagerConnect(op))], false))
        }

        "shell" => {
            let Some(shell) = a.shell.as_ref() else {
                return Err(PlanError::invalid(path, kind, "missing shell{}"));
            };
            if !policy.allow_shell {
                return Err(PlanError::policy(
                    path,
                    kind,
                    "shell actions disabled by policy",
                ));
            }
            let cmd = shell.cmd.trim();
            if cmd.is_empty() {
                return Err(PlanError::invalid(path, kind, "shell.cmd empty"));
            }
            if !policy.is_shell_command_allowed(cmd) {
                return Err(PlanError::policy(
                    path,
                    kind,
                    format!(
                        "shell command does not match any allowed prefix: \"{}\"",
                        cmd
                    ),
                ));
            }
            let op = ShellOp {
                session,
                name: String::new(),
                cwd: String::new(),
                cmd: cmd.to_string(),
            };
            Ok((vec![wrap(PlanOp::Shell(op))], true))
        }

        "tmux" => {
            let Some(tmux) = a.tmux.as_ref() else {
                return Err(PlanError::invalid(path, kind, "missing tmux{}"));
            };
            if !policy.allow_tmux_passthrough {
                return Err(PlanError::policy(
                    path,
                    kind,
                    "tmux passthrough disabled by policy",
                ));
            }
            let name = tmux.name.trim();
            if name.is_empty() {
                return Err(PlanError::invalid(path, kind, "tmux.name empty"));
            }
            if !policy.is_tmux_command_allowed(name) {
                return Err(PlanError::policy(
                    path,
                    kind,
                    format!("tmux subcommand \"{}\" not allowed by policy", name),
                ));
            }
            let mut args = vec![name.to_string()];
            args.extend(tmux.args.iter().cloned());
            Ok((vec![wrap(PlanOp::Tmux(TmuxOp { args }))], true))
        }

        "sleep" => {
            let Some(sleep) = a.sleep.as_ref() else {
                return Err(PlanError::invalid(path, kind, "missing sleep{}"));
            };
            // No native sleep primitive; encode as a shell sleep, which
            // keeps the policy story honest (it IS shell execution).
            if !policy.allow_shell {
                return Err(PlanError::policy(
                    path,
                    kind,
                    "sleep requires shell enabled (policy)",
                ));
            }
            if sleep.ms < 0 {
                return Err(PlanError::invalid(path, kind, "sleep.ms must be >= 0"));
            }
            let op = ShellOp {
                session,
                name: String::new(),
                cwd: String::new(),
                cmd: format!("sleep {:.3}", sleep.ms as f64 / 1000.0),
            };
            Ok((vec![wrap(PlanOp::Shell(op))], true))
        }

        other => Err(PlanError::invalid(
            path,
            other,
            format!("unknown action type \"{}\"", other),
        )),
    }
}

fn convert_windows(
    ctx: &Context,
    session_name: &str,
    session_root: &str,
    windows: &[Window],
    policy: &Policy,
) -> Result<(Vec<PlanAction>, bool), PlanError> {
    if windows.is_empty() {
        return Err(PlanError::EmptyPlan);
    }

    let mut out: Vec<PlanAction> = Vec::new();
    let mut unsafe_used = false;

    for (wi, w) in windows.iter().enumerate() {
        let window_name = w.name.trim();
        if window_name.is_empty() {
            return Err(PlanError::invalid(
                format!("windows[{}]", wi),
                "window",
                "missing name",
            ));
        }

        let win_root = {
            let root = w.root.trim();
            if root.is_empty() {
                session_root.to_string()
            } else {
                expand_user(&subst(ctx, root))
            }
        };

        // Always create spec windows explicitly by name. Relying on the
        // initial session window breaks when base-index is 0 vs 1, and
        // rename-window can race a window that does not exist yet.
        out.push(PlanAction::new(PlanOp::NewWindow(NewWindowOp {
            session: session_name.to_string(),
            name: window_name.to_string(),
            cwd: win_root.clone(),
            command: String::new(),
        })));

        // Select it so subsequent send-keys/splits target a known window.
        out.push(PlanAction::new(PlanOp::SelectWindow(SelectWindowOp {
            session: session_name.to_string(),
            window: window_name.to_string(),
        })));

        if !w.actions.is_empty() {
            let (mut acts, used_unsafe) = convert_actions(
                ctx,
                session_name,
                &w.actions,
                policy,
                &format!("windows[{}]({}).actions", wi, window_name),
            )?;
            unsafe_used |= used_unsafe;
            default_targets(&mut acts, session_name, window_name);
            out.extend(acts);
        }

        if !w.pane_plan.is_empty() {
            let (acts, used_unsafe) =
                convert_pane_plan(ctx, session_name, w, wi, &win_root, policy)?;
            unsafe_used |= used_unsafe;
            out.extend(acts);
        } else if !w.panes.is_empty() {
            let (acts, used_unsafe) =
                convert_legacy_panes(ctx, session_name, w, wi, &win_root, policy)?;
            unsafe_used |= used_unsafe;
            out.extend(acts);
        }

        if !w.layout.trim().is_empty() {
            out.push(PlanAction::new(PlanOp::SelectLayout(SelectLayoutOp {
                session: session_name.to_string(),
                window: window_name.to_string(),
                layout: w.layout.trim().to_string(),
            })));
        }

        if w.focus {
            out.push(PlanAction::new(PlanOp::SelectWindow(SelectWindowOp {
                session: session_name.to_string(),
                window: window_name.to_string(),
            })));
        }

        // Deterministic post-plan pane focus. The index is taken as the
        // user wrote it: with `pane-base-index 1` the first pane is "1".
        let focus_pane = w.focus_pane.trim();
        if !focus_pane.is_empty() && focus_pane != "active" {
            out.push(PlanAction::new(PlanOp::SelectPane(SelectPaneOp {
                session: session_name.to_string(),
                pane: focus_pane.to_string(),
            })));
        }
    }

    Ok((out, unsafe_used))
}

/// Default unset session/window targets to the enclosing window so actions
/// never accidentally land in another window.
fn default_targets(actions: &mut [PlanAction], session_name: &str, window_name: &str) {
    for action in actions.iter_mut() {
        match &mut action.op {
            PlanOp::SendKeys(op) => {
                if op.session.trim().is_empty() {
                    op.session = session_name.to_string();
                }
                if op.window.trim().is_empty() {
                    op.window = window_name.to_string();
                }
            }
            PlanOp::WaitForPrompt(op) => {
                if op.session.trim().is_empty() {
                    op.session = session_name.to_string();
                }
                if op.window.trim().is_empty() {
                    op.window = window_name.to_string();
                }
            }
            PlanOp::SshManagerConnect(op) => {
                if op.session.trim().is_empty() {
                    op.session = session_name.to_string();
                }
                if op.window.trim().is_empty() {
                    op.window = window_name.to_string();
                }
            }
            PlanOp::Shell(op) => {
                if op.session.trim().is_empty() {
                    op.session = session_name.to_string();
                }
            }
            _ => {}
        }
    }
}

/// Lower a pane plan into explicit split/run actions.
///
/// The plan is interpreted left-to-right and relies on tmux behavior that
/// split-window makes the new pane active. Validation guarantees the first
/// and last steps are panes.
fn convert_pane_plan(
    ctx: &Context,
    session_name: &str,
    w: &Window,
    wi: usize,
    win_root: &str,
    policy: &Policy,
) -> Result<(Vec<PlanAction>, bool), PlanError> {
    let window_name = w.name.trim();
    let mut out: Vec<PlanAction> = Vec::new();
    let mut unsafe_used = false;

    for (i, step) in w.pane_plan.iter().enumerate() {
        match (step.pane.as_ref(), step.split.as_ref()) {
            (Some(pane), None) => {
                let pane_root = {
                    let root = pane.root.trim();
                    if root.is_empty() {
                        win_root.to_string()
                    } else {
                        expand_user(&subst(ctx, root))
                    }
                };

                // The first pane already exists (created with the window);
                // a differing root becomes an explicit cd.
                if i == 0 && !pane_root.is_empty() && pane_root != win_root {
                    out.push(PlanAction::new(PlanOp::SendKeys(SendKeysOp {
                        session: session_name.to_string(),
                        window: window_name.to_string(),
                        pane: String::new(),
                        keys: Vec::new(),
                        command: format!("cd {}", shell_quote(&pane_root)),
                        enter: true,
                    })));
                }

                if !pane.actions.is_empty() {
                    let (mut acts, used_unsafe) = convert_actions(
                        ctx,
                        session_name,
                        &pane.actions,
                        policy,
                        &format!(
                            "windows[{}]({}).pane_plan[{}].pane.actions",
                            wi, window_name, i
                        ),
                    )?;
                    unsafe_used |= used_unsafe;
                    default_targets(&mut acts, session_name, window_name);
                    out.extend(acts);
                }

                if pane.focus {
                    // Never a hardcoded pane index: pane-base-index varies
                    // across user configs, and the pane just touched is
                    // already active. Selecting the window is sufficient.
                    out.push(PlanAction::new(PlanOp::SelectWindow(SelectWindowOp {
                        session: session_name.to_string(),
                        window: window_name.to_string(),
                    })));
                }
            }

            (None, Some(split)) => {
                let Some(direction) = SplitDirection::parse(&split.direction) else {
                    return Err(PlanError::invalid(
                        format!("windows[{}]({}).pane_plan[{}]", wi, window_name, i),
                        "split",
                        "split.direction must be 'h' or 'v'",
                    ));
                };

                out.push(PlanAction::new(PlanOp::SplitWindow(SplitWindowOp {
                    session: session_name.to_string(),
                    window: window_name.to_string(),
                    direction,
                    cwd: win_root.to_string(),
                    percent: parse_percent(&split.size),
                    command: String::new(),
                })));
            }

            // Unreachable after validation.
            _ => {
                return Err(PlanError::invalid(
                    format!("windows[{}]({}).pane_plan[{}]", wi, window_name, i),
                    "pane_plan",
                    "invalid step (expected pane or split)",
                ));
            }
        }
    }

    Ok((out, unsafe_used))
}

/// Extract a percentage from a `"NN%"` size. Absolute sizes (plain `"NN"`)
/// are not expressible through `-p` and pass through as no percent.
fn parse_percent(size: &str) -> Option<u8> {
    let size = size.trim();
    let num = size.strip_suffix('%')?;
    if num.is_empty() || !num.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let value: u32 = num.parse().ok()?;
    if value > 0 && value < 100 {
        Some(value as u8)
    } else {
        None
    }
}

/// Legacy sequential pane list: first pane reuses the window, every later
/// pane is a horizontal split from the active pane.
fn convert_legacy_panes(
    ctx: &Context,
    session_name: &str,
    w: &Window,
    wi: usize,
    win_root: &str,
    policy: &Policy,
) -> Result<(Vec<PlanAction>, bool), PlanError> {
    let window_name = w.name.trim();
    let mut out: Vec<PlanAction> = Vec::new();
    let mut unsafe_used = false;

    for (pi, pane) in w.panes.iter().enumerate() {
        let pane_root = {
            let root = pane.root.trim();
            if root.is_empty() {
                win_root.to_string()
            } else {
                expand_user(&subst(ctx, root))
            }
        };

        if pi == 0 {
            if !pane_root.is_empty() && pane_root != win_root {
                out.push(PlanAction::new(PlanOp::SendKeys(SendKeysOp {
                    session: session_name.to_string(),
                    window: window_name.to_string(),
                    pane: String::new(),
                    keys: Vec::new(),
                    command: format!("cd {}", shell_quote(&pane_root)),
                    enter: true,
                })));
            }
        } else {
            out.push(PlanAction::new(PlanOp::SplitWindow(SplitWindowOp {
                session: session_name.to_string(),
                window: window_name.to_string(),
                direction: SplitDirection::Horizontal,
                cwd: pane_root.clone(),
                percent: None,
                command: String::new(),
            })));
        }

        if !pane.actions.is_empty() {
            let (mut acts, used_unsafe) = convert_actions(
                ctx,
                session_name,
                &pane.actions,
                policy,
                &format!("windows[{}]({}).panes[{}].actions", wi, window_name, pi),
            )?;
            unsafe_used |= used_unsafe;
            default_targets(&mut acts, session_name, window_name);
            out.extend(acts);
        }

        if pane.focus {
            out.push(PlanAction::new(PlanOp::SelectWindow(SelectWindowOp {
                session: session_name.to_string(),
                window: window_name.to_string(),
            })));
        }
    }

    Ok((out, unsafe_used))
}
