//! Compiler stage B: plan actions -> concrete tmux command invocations.
//!
//! Substitution is applied to every user-authored string right before it
//! becomes part of a command. The output is a pure function of its inputs:
//! compiling the same plan with the same context and policy yields the same
//! command list, which is what makes dry-run previews trustworthy.

use std::path::Path;

use tracing::debug;

use crate::policy::Policy;
use crate::subst::{expand_user, subst, Context};

use super::action::{PlanAction, PlanOp, PlanSpec};
use super::errors::PlanError;
use super::quote::shell_join;

/// Reserved first token for the readiness-gate sentinel.
pub const SENTINEL_WAIT_FOR_PROMPT: &str = "__wait_for_prompt__";

/// Reserved first token for the structured-connect sentinel.
pub const SENTINEL_SSH_MANAGER_CONNECT: &str = "__ssh_manager_connect__";

/// A single tmux invocation (argv after the tmux binary).
#[derive(Debug, Clone)]
pub struct Command {
    pub args: Vec<String>,

    /// Human-readable line for previews.
    pub explanation: String,

    /// Produced through an escape hatch (shell or tmux passthrough).
    pub is_unsafe: bool,

    /// A failure of this command does not abort the plan.
    pub ignore_error: bool,
}

/// The result of compiling a plan.
#[derive(Debug, Clone, Default)]
pub struct Compiled {
    pub commands: Vec<Command>,

    /// Compilation required an unsafe capability.
    pub unsafe_used: bool,

    /// Non-fatal notes, rendered in dry-run output.
    pub warnings: Vec<String>,
}

/// Compile a plan into tmux commands without executing anything.
pub fn compile(ctx: &Context, policy: &Policy, plan: &PlanSpec) -> Result<Compiled, PlanError> {
    let max_actions = if policy.max_actions == 0 {
        crate::policy::DEFAULT_MAX_ACTIONS
    } else {
        policy.max_actions
    };
    let max_command_len = if policy.max_command_len == 0 {
        crate::policy::DEFAULT_MAX_COMMAND_LEN
    } else {
        policy.max_command_len
    };

    if ctx.session_name.trim().is_empty() {
        return Err(PlanError::MissingSessionName);
    }
    if ctx.project_path.trim().is_empty() {
        return Err(PlanError::MissingProjectPath);
    }

    let mut ctx = ctx.clone();
    ctx.project_path = absolutize(&expand_user(&ctx.project_path));
    if ctx.project_name.trim().is_empty() {
        ctx.project_name = Path::new(&ctx.project_path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
    }
    if ctx.working_dir.trim().is_empty() {
        ctx.working_dir = ctx.project_path.clone();
    }

    if plan.actions.is_empty() {
        return Err(PlanError::EmptyPlan);
    }
    if plan.actions.len() > max_actions {
        return Err(PlanError::TooManyActions {
            count: plan.actions.len(),
            max: max_actions,
        });
    }

    let mut out = Compiled::default();

    for (i, action) in plan.actions.iter().enumerate() {
        let compiled = compile_action(&ctx, policy, action).map_err(|e| annotate(e, i))?;
        out.commands.extend(compiled.commands);
        out.unsafe_used |= compiled.unsafe_used;
        out.warnings.extend(compiled.warnings);
    }

    for (i, c) in out.commands.iter().enumerate() {
        let total: usize = c.args.iter().map(|a| a.len() + 1).sum();
        if total > max_command_len {
            return Err(PlanError::CommandTooLong {
                index: i,
                len: total,
                max: max_command_len,
            });
        }
    }

    debug!(
        event = "core.plan.compile_completed",
        session = ctx.session_name.as_str(),
        commands = out.commands.len(),
        unsafe_used = out.unsafe_used
    );

    Ok(out)
}

fn annotate(e: PlanError, index: usize) -> PlanError {
    match e {
        PlanError::InvalidAction { kind, message, .. } => PlanError::InvalidAction {
            path: format!("plan action[{}]", index),
            kind,
            message,
        },
        PlanError::PolicyViolation { kind, message, .. } => PlanError::PolicyViolation {
            path: format!("plan action[{}]", index),
            kind,
            message,
        },
        other => other,
    }
}

fn absolutize(p: &str) -> String {
    let path = Path::new(p);
    if path.is_absolute() {
        return p.to_string();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path).display().to_string(),
        Err(_) => p.to_string(),
    }
}

/// Build a send-keys style target: `S`, `S:W`, `S:W.P`, or a raw `%id`.
fn resolve_target(ctx: &Context, session: &str, window: &str, pane: &str) -> String {
    let session = if session.trim().is_empty() {
        ctx.session_name.as_str()
    } else {
        session.trim()
    };

    let mut target = session.to_string();
    if !window.trim().is_empty() {
        target = format!("{}:{}", target, window.trim());
    }
    let pane = pane.trim();
    if !pane.is_empty() {
        if pane.starts_with('%') {
            // A pane id is globally unique; it replaces the target.
            target = pane.to_string();
        } else {
            target = format!("{}.{}", target, pane);
        }
    }
    target
}

fn resolve_cwd(ctx: &Context, cwd: &str) -> String {
    let cwd = cwd.trim();
    if cwd.is_empty() {
        ctx.working_dir.clone()
    } else {
        expand_user(&subst(ctx, cwd))
    }
}

struct CompiledAction {
    commands: Vec<Command>,
    unsafe_used: bool,
    warnings: Vec<String>,
}

impl CompiledAction {
    fn one(args: Vec<String>, explanation: String, ignore_error: bool) -> Self {
        Self {
            commands: vec![Command {
                args,
                explanation,
                is_unsafe: false,
                ignore_error,
            }],
            unsafe_used: false,
            warnings: Vec::new(),
        }
    }

    fn one_unsafe(args: Vec<String>, explanation: String, ignore_error: bool) -> Self {
        Self {
            commands: vec![Command {
                args,
                explanation,
                is_unsafe: true,
                ignore_error,
            }],
            unsafe_used: true,
            warnings: Vec::new(),
        }
    }
}

fn compile_action(
    ctx: &Context,
    policy: &Policy,
    action: &PlanAction,
) -> Result<CompiledAction, PlanError> {
    let kind = action.kind();
    let ignore_error = action.ignore_error;

    match &action.op {
        PlanOp::EnsureSession(op) => {
            let session = default_session(ctx, &op.session);
            let cwd = resolve_cwd(ctx, &op.cwd);
            // tmux has no create-if-missing primitive that fits a pure
            // command list; callers that need atomicity pre-check in code.
            let mut out = CompiledAction::one(
                vec![
                    "new-session".into(),
                    "-d".into(),
                    "-s".into(),
                    session,
                    "-c".into(),
                    cwd,
                ],
                "create detached session if missing (may fail if exists)".into(),
                ignore_error,
            );
            out.warnings.push(
                "ensure_session is non-atomic in pure tmux command lists; consider pre-checking in code"
                    .to_string(),
            );
            Ok(out)
        }

        PlanOp::NewWindow(op) => {
            let name = op.name.trim();
            if name.is_empty() {
                return Err(PlanError::invalid("", kind, "missing window name"));
            }
            let session = default_session(ctx, &op.session);
            let cwd = resolve_cwd(ctx, &op.cwd);
            let mut args = vec![
                "new-window".to_string(),
                "-t".to_string(),
                session,
                "-n".to_string(),
                name.to_string(),
                "-c".to_string(),
                cwd,
            ];
            if !op.command.trim().is_empty() {
                args.extend(window_shell_command(&subst(ctx, &op.command)));
            }
            Ok(CompiledAction::one(
                args,
                format!("create window {}", name),
                ignore_error,
            ))
        }

        PlanOp::SplitWindow(op) => {
            let session = default_session(ctx, &op.session);
            let cwd = resolve_cwd(ctx, &op.cwd);
            let target = if op.window.trim().is_empty() {
                session
            } else {
                format!("{}:{}", session, op.window.trim())
            };
            let mut args = vec![
                "split-window".to_string(),
                op.direction.flag().to_string(),
                "-t".to_string(),
                target,
                "-c".to_string(),
                cwd,
            ];
            if let Some(percent) = op.percent {
                if !(1..=99).contains(&percent) {
                    return Err(PlanError::invalid(
                        "",
                        kind,
                        "split percent must be 1-99",
                    ));
                }
                args.push("-p".to_string());
                args.push(percent.to_string());
            }
            if !op.command.trim().is_empty() {
                args.extend(window_shell_command(&subst(ctx, &op.command)));
            }
            Ok(CompiledAction::one(
                args,
                format!("split window ({})", op.direction.short()),
                ignore_error,
            ))
        }

        PlanOp::RenameWindow(op) => {
            let new_name = op.name.trim();
            if new_name.is_empty() {
                return Err(PlanError::invalid("", kind, "missing new window name"));
            }
            let session = default_session(ctx, &op.session);
            let from = if op.from.trim().is_empty() {
                "0"
            } else {
                op.from.trim()
            };
            let target = format!("{}:{}", session, from);
            Ok(CompiledAction::one(
                vec![
                    "rename-window".into(),
                    "-t".into(),
                    target.clone(),
                    new_name.to_string(),
                ],
                format!("rename window {} -> {}", target, new_name),
                ignore_error,
            ))
        }

        PlanOp::SelectWindow(op) => {
            let window = op.window.trim();
            if window.is_empty() {
                return Err(PlanError::invalid("", kind, "missing window"));
            }
            let session = default_session(ctx, &op.session);
            let target = format!("{}:{}", session, window);
            Ok(CompiledAction::one(
                vec!["select-window".into(), "-t".into(), target.clone()],
                format!("select window {}", target),
                ignore_error,
            ))
        }

        PlanOp::SelectPane(op) => {
            let pane = op.pane.trim();
            if pane.is_empty() {
                return Err(PlanError::invalid("", kind, "missing pane"));
            }
            let session = default_session(ctx, &op.session);
            let target = if !pane.starts_with('%') && !pane.contains(':') {
                // Bare index: pane of the session's current window.
                format!("{}:.{}", session, pane)
            } else {
                pane.to_string()
            };
            Ok(CompiledAction::one(
                vec!["select-pane".into(), "-t".into(), target.clone()],
                format!("select pane {}", target),
                ignore_error,
            ))
        }

        PlanOp::SelectLayout(op) => {
            let layout = op.layout.trim();
            if layout.is_empty() {
                return Err(PlanError::invalid("", kind, "missing layout"));
            }
            let session = default_session(ctx, &op.session);
            let target = if op.window.trim().is_empty() {
                session
            } else {
                format!("{}:{}", session, op.window.trim())
            };
            Ok(CompiledAction::one(
                vec![
                    "select-layout".into(),
                    "-t".into(),
                    target,
                    layout.to_string(),
                ],
                format!("select layout {}", layout),
                ignore_error,
            ))
        }

        PlanOp::SendKeys(op) => {
            let target = resolve_target(ctx, &op.session, &op.window, &op.pane);

            let mut keys: Vec<String> = Vec::new();
            if !op.keys.is_empty() {
                for k in &op.keys {
                    let k = subst(ctx, k).trim().to_string();
                    if !k.is_empty() {
                        keys.push(k);
                    }
                }
            } else if !op.command.trim().is_empty() {
                keys.push(subst(ctx, &op.command));
            }
            if keys.is_empty() {
                return Err(PlanError::invalid("", kind, "missing keys or command"));
            }

            let mut args = vec!["send-keys".to_string(), "-t".to_string(), target.clone()];
            args.extend(keys);
            if op.enter {
                args.push("C-m".to_string());
            }
            Ok(CompiledAction::one(
                args,
                format!("send keys to {}", target),
                ignore_error,
            ))
        }

        PlanOp::SetOption(op) => {
            let option = op.option.trim();
            if option.is_empty() {
                return Err(PlanError::invalid("", kind, "missing option"));
            }
            let value = subst(ctx, &op.value);
            let mut args = vec!["set-option".to_string()];
            if op.global {
                args.push("-g".to_string());
            } else {
                args.push("-t".to_string());
                args.push(default_session(ctx, &op.session));
            }
            args.push(option.to_string());
            args.push(value);
            Ok(CompiledAction::one(
                args,
                format!("set option {}", option),
                ignore_error,
            ))
        }

        PlanOp::DisplayMessage(op) => {
            let message = subst(ctx, &op.message);
            if message.trim().is_empty() {
                return Err(PlanError::invalid("", kind, "missing message"));
            }
            let duration = if op.duration_ms > 0 {
                op.duration_ms
            } else {
                1500
            };
            Ok(CompiledAction::one(
                vec![
                    "display-message".into(),
                    "-d".into(),
                    duration.to_string(),
                    message,
                ],
                "display message".into(),
                ignore_error,
            ))
        }

        PlanOp::WaitForPrompt(op) => {
            let target = resolve_target(ctx, &op.session, &op.window, &op.pane);
            let timeout_ms = if op.timeout_ms > 0 { op.timeout_ms } else { 15000 };
            let min_quiet_ms = if op.min_quiet_ms > 0 {
                op.min_quiet_ms
            } else {
                500
            };
            let settle_ms = if op.settle_ms > 0 { op.settle_ms } else { 250 };
            let max_lines = if op.max_lines > 0 { op.max_lines } else { 200 };

            Ok(CompiledAction::one(
                vec![
                    SENTINEL_WAIT_FOR_PROMPT.to_string(),
                    target.clone(),
                    timeout_ms.to_string(),
                    min_quiet_ms.to_string(),
                    settle_ms.to_string(),
                    max_lines.to_string(),
                    op.prompt_regex.trim().to_string(),
                ],
                format!("wait for prompt (best-effort) in {}", target),
                ignore_error,
            ))
        }

        PlanOp::SshManagerConnect(op) => {
            let target = resolve_target(ctx, &op.session, &op.window, &op.pane);
            let host = op.host.trim();
            if host.is_empty() {
                return Err(PlanError::invalid("", kind, "missing host"));
            }
            let login_mode = {
                let mode = op.login_mode.trim().to_lowercase();
                if mode.is_empty() {
                    "askpass".to_string()
                } else {
                    mode
                }
            };
            let port = op.port.max(0);
            let connect_timeout_ms = op.connect_timeout_ms.max(0);

            Ok(CompiledAction::one(
                vec![
                    SENTINEL_SSH_MANAGER_CONNECT.to_string(),
                    target.clone(),
                    host.to_string(),
                    op.user.trim().to_string(),
                    port.to_string(),
                    login_mode,
                    connect_timeout_ms.to_string(),
                ],
                format!("ssh_manager_connect {} in {}", host, target),
                ignore_error,
            ))
        }

        PlanOp::Shell(op) => {
            if !policy.allow_shell {
                return Err(PlanError::policy(
                    "",
                    kind,
                    "shell action disabled by policy",
                ));
            }
            let cmd = op.cmd.trim();
            if cmd.is_empty() {
                return Err(PlanError::invalid("", kind, "missing shell command"));
            }
            let session = default_session(ctx, &op.session);
            let cwd = resolve_cwd(ctx, &op.cwd);
            let name = if op.name.trim().is_empty() {
                "shell"
            } else {
                op.name.trim()
            };
            let cmd = subst(ctx, cmd);

            // Run in a fresh window so the output stays visible; specs that
            // want output in a specific pane use send_keys instead.
            let mut args = vec![
                "new-window".to_string(),
                "-t".to_string(),
                session,
                "-n".to_string(),
                name.to_string(),
                "-c".to_string(),
                cwd,
            ];
            args.extend(window_shell_command(&cmd));
            Ok(CompiledAction::one_unsafe(
                args,
                format!("unsafe shell window {}", name),
                ignore_error,
            ))
        }

        PlanOp::Tmux(op) => {
            if !policy.allow_tmux_passthrough {
                return Err(PlanError::policy(
                    "",
                    kind,
                    "tmux passthrough disabled by policy",
                ));
            }
            if op.args.is_empty() {
                return Err(PlanError::invalid("", kind, "missing tmux args"));
            }

            let args: Vec<String> = op.args.iter().map(|a| subst(ctx, a)).collect();

            // Re-check the leading token after substitution; variables must
            // not be able to smuggle in a denied subcommand.
            let sub = args[0].trim();
            let sub = sub.strip_prefix("tmux ").unwrap_or(sub);
            let sub = sub.split_whitespace().next().unwrap_or("");
            if sub.is_empty() {
                return Err(PlanError::invalid("", kind, "empty tmux subcommand"));
            }
            if !policy.is_tmux_command_allowed(sub) {
                return Err(PlanError::policy(
                    "",
                    kind,
                    format!("tmux subcommand \"{}\" not allowed by policy", sub),
                ));
            }

            Ok(CompiledAction::one_unsafe(
                args,
                "unsafe tmux passthrough".into(),
                ignore_error,
            ))
        }
    }
}

fn default_session(ctx: &Context, session: &str) -> String {
    let session = session.trim();
    if session.is_empty() {
        ctx.session_name.clone()
    } else {
        session.to_string()
    }
}

/// `-- bash -lc <cmd>` suffix for window-creating commands.
fn window_shell_command(cmd: &str) -> Vec<String> {
    vec![
        "--".to_string(),
        "bash".to_string(),
        "-lc".to_string(),
        cmd.to_string(),
    ]
}

/// Render a compiled plan as preview lines, one per command, with
/// explanations and warnings. Deterministic.
pub fn dry_run_lines(compiled: &Compiled) -> Vec<String> {
    let mut lines = Vec::new();
    if compiled.unsafe_used {
        lines.push("WARNING: unsafe actions present (shell and/or tmux passthrough)".to_string());
    }
    for w in &compiled.warnings {
        lines.push(format!("WARN: {}", w));
    }
    for c in &compiled.commands {
        let prefix = if c.is_unsafe { "tmux (unsafe) " } else { "tmux " };
        if !c.explanation.is_empty() {
            lines.push(format!("{}# {}", prefix, c.explanation));
        }
        lines.push(format!("{}{}", prefix, shell_join(&c.args)));
    }
    lines
}

/// Joined [`dry_run_lines`], suitable for CLI output and logs.
pub fn render_dry_run(compiled: &Compiled) -> String {
    dry_run_lines(compiled).join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::action::{
        DisplayMessageOp, PlanAction, RenameWindowOp, SelectPaneOp, SendKeysOp, SetOptionOp,
        ShellOp, TmuxOp, WaitForPromptOp,
    };
    use crate::plan::build::{build_from_spec, BuildOptions};
    use crate::spec::Spec;

    fn ctx() -> Context {
        Context {
            project_name: "demo".to_string(),
            project_path: "/tmp/demo".to_string(),
            session_name: "demo".to_string(),
            working_dir: "/tmp/demo".to_string(),
            ..Context::default()
        }
    }

    fn plan_of(actions: Vec<PlanAction>) -> PlanSpec {
        PlanSpec {
            version: 1,
            name: "test".to_string(),
            actions,
            unsafe_required: false,
        }
    }

    fn argv(compiled: &Compiled) -> Vec<Vec<&str>> {
        compiled
            .commands
            .iter()
            .map(|c| c.args.iter().map(String::as_str).collect())
            .collect()
    }

    #[test]
    fn test_pane_plan_geometry_exact_command_sequence() {
        let spec: Spec = serde_yaml::from_str(
            r#"
version: 1
windows:
  - name: editor
    root: /tmp/demo
    pane_plan:
      - pane:  { name: nvim, focus: true, actions: [{type: run, run: {program: nvim, args: [.]}}] }
      - split: { direction: h, size: "50%" }
      - pane:  { name: shell, actions: [{type: run, run: {program: bash, args: [-l]}}] }
"#,
        )
        .unwrap();

        let (ctx, plan, _) = build_from_spec(
            &spec,
            BuildOptions {
                project_root: "/tmp/demo".to_string(),
                session_name: "demo".to_string(),
                ..BuildOptions::default()
            },
        )
        .unwrap();
        let compiled = compile(&ctx, &Policy::default(), &plan).unwrap();

        assert_eq!(
            argv(&compiled),
            vec![
                vec!["new-window", "-t", "demo", "-n", "editor", "-c", "/tmp/demo"],
                vec!["select-window", "-t", "demo:editor"],
                vec!["send-keys", "-t", "demo:editor", "nvim .", "C-m"],
                vec!["select-window", "-t", "demo:editor"],
                vec![
                    "split-window",
                    "-h",
                    "-t",
                    "demo:editor",
                    "-c",
                    "/tmp/demo",
                    "-p",
                    "50"
                ],
                vec!["send-keys", "-t", "demo:editor", "bash -l", "C-m"],
            ]
        );
        assert!(!compiled.unsafe_used);
    }

    #[test]
    fn test_compile_is_deterministic() {
        let spec: Spec = serde_yaml::from_str(
            r#"
windows:
  - name: dev
    panes:
      - actions: [{type: run, run: {program: "npm", args: [start]}}]
      - actions: [{type: watch, watch: {interval_s: 3, command: "git status"}}]
"#,
        )
        .unwrap();

        let opts = || BuildOptions {
            project_root: "/tmp/demo".to_string(),
            session_name: "demo".to_string(),
            ..BuildOptions::default()
        };

        let (ctx_a, plan_a, _) = build_from_spec(&spec, opts()).unwrap();
        let (ctx_b, plan_b, _) = build_from_spec(&spec, opts()).unwrap();
        let compiled_a = compile(&ctx_a, &Policy::default(), &plan_a).unwrap();
        let compiled_b = compile(&ctx_b, &Policy::default(), &plan_b).unwrap();

        assert_eq!(argv(&compiled_a), argv(&compiled_b));
        assert_eq!(
            dry_run_lines(&compiled_a),
            dry_run_lines(&compiled_b)
        );
    }

    #[test]
    fn test_compile_requires_session_and_project() {
        let plan = plan_of(vec![PlanAction::new(PlanOp::SelectPane(SelectPaneOp {
            session: String::new(),
            pane: "1".to_string(),
        }))]);

        let mut c = ctx();
        c.session_name = String::new();
        assert!(matches!(
            compile(&c, &Policy::default(), &plan),
            Err(PlanError::MissingSessionName)
        ));

        let mut c = ctx();
        c.project_path = String::new();
        assert!(matches!(
            compile(&c, &Policy::default(), &plan),
            Err(PlanError::MissingProjectPath)
        ));
    }

    #[test]
    fn test_compile_empty_plan_fails() {
        let plan = plan_of(vec![]);
        assert!(matches!(
            compile(&ctx(), &Policy::default(), &plan),
            Err(PlanError::EmptyPlan)
        ));
    }

    #[test]
    fn test_max_actions_guard() {
        let actions: Vec<PlanAction> = (0..201)
            .map(|_| {
                PlanAction::new(PlanOp::SendKeys(SendKeysOp {
                    command: "ls".to_string(),
                    enter: true,
                    ..SendKeysOp::default()
                }))
            })
            .collect();
        let plan = plan_of(actions);
        let err = compile(&ctx(), &Policy::default(), &plan).unwrap_err();
        assert!(matches!(err, PlanError::TooManyActions { count: 201, .. }));
    }

    #[test]
    fn test_max_command_len_guard() {
        let mut policy = Policy::default();
        policy.allow_shell = true;
        let plan = plan_of(vec![PlanAction::new(PlanOp::Shell(ShellOp {
            cmd: "x".repeat(5000),
            ..ShellOp::default()
        }))]);
        let err = compile(&ctx(), &policy, &plan).unwrap_err();
        assert!(matches!(err, PlanError::CommandTooLong { .. }));
    }

    #[test]
    fn test_substitution_happens_at_emission() {
        let plan = plan_of(vec![PlanAction::new(PlanOp::SendKeys(SendKeysOp {
            command: "cd ${PROJECT_PATH} && echo ${PROJECT_NAME}".to_string(),
            enter: true,
            ..SendKeysOp::default()
        }))]);
        let compiled = compile(&ctx(), &Policy::default(), &plan).unwrap();
        assert_eq!(
            compiled.commands[0].args[3],
            "cd /tmp/demo && echo demo"
        );
    }

    #[test]
    fn test_send_keys_pane_id_replaces_target() {
        let plan = plan_of(vec![PlanAction::new(PlanOp::SendKeys(SendKeysOp {
            window: "editor".to_string(),
            pane: "%7".to_string(),
            command: "ls".to_string(),
            enter: false,
            ..SendKeysOp::default()
        }))]);
        let compiled = compile(&ctx(), &Policy::default(), &plan).unwrap();
        assert_eq!(compiled.commands[0].args, vec!["send-keys", "-t", "%7", "ls"]);
    }

    #[test]
    fn test_send_keys_pane_index_appends() {
        let plan = plan_of(vec![PlanAction::new(PlanOp::SendKeys(SendKeysOp {
            window: "editor".to_string(),
            pane: "2".to_string(),
            command: "ls".to_string(),
            enter: true,
            ..SendKeysOp::default()
        }))]);
        let compiled = compile(&ctx(), &Policy::default(), &plan).unwrap();
        assert_eq!(compiled.commands[0].args[2], "demo:editor.2");
    }

    #[test]
    fn test_select_pane_bare_index_targets_current_window() {
        let plan = plan_of(vec![PlanAction::new(PlanOp::SelectPane(SelectPaneOp {
            session: String::new(),
            pane: "1".to_string(),
        }))]);
        let compiled = compile(&ctx(), &Policy::default(), &plan).unwrap();
        assert_eq!(
            compiled.commands[0].args,
            vec!["select-pane", "-t", "demo:.1"]
        );
    }

    #[test]
    fn test_select_pane_id_passthrough() {
        let plan = plan_of(vec![PlanAction::new(PlanOp::SelectPane(SelectPaneOp {
            session: String::new(),
            pane: "%3".to_string(),
        }))]);
        let compiled = compile(&ctx(), &Policy::default(), &plan).unwrap();
        assert_eq!(compiled.commands[0].args, vec!["select-pane", "-t", "%3"]);
    }

    #[test]
    fn test_rename_window_defaults_to_first_window() {
        let plan = plan_of(vec![PlanAction::new(PlanOp::RenameWindow(RenameWindowOp {
            name: "editor".to_string(),
            ..RenameWindowOp::default()
        }))]);
        let compiled = compile(&ctx(), &Policy::default(), &plan).unwrap();
        assert_eq!(
            compiled.commands[0].args,
            vec!["rename-window", "-t", "demo:0", "editor"]
        );
    }

    #[test]
    fn test_set_option_global_vs_session() {
        let global = plan_of(vec![PlanAction::new(PlanOp::SetOption(SetOptionOp {
            option: "base-index".to_string(),
            value: "1".to_string(),
            global: true,
            ..SetOptionOp::default()
        }))]);
        let compiled = compile(&ctx(), &Policy::default(), &global).unwrap();
        assert_eq!(
            compiled.commands[0].args,
            vec!["set-option", "-g", "base-index", "1"]
        );

        let scoped = plan_of(vec![PlanAction::new(PlanOp::SetOption(SetOptionOp {
            option: "status".to_string(),
            value: "off".to_string(),
            global: false,
            ..SetOptionOp::default()
        }))]);
        let compiled = compile(&ctx(), &Policy::default(), &scoped).unwrap();
        assert_eq!(
            compiled.commands[0].args,
            vec!["set-option", "-t", "demo", "status", "off"]
        );
    }

    #[test]
    fn test_display_message_default_duration() {
        let plan = plan_of(vec![PlanAction::new(PlanOp::DisplayMessage(
            DisplayMessageOp {
                message: "ready: ${SESSION_NAME}".to_string(),
                duration_ms: 0,
            },
        ))]);
        let compiled = compile(&ctx(), &Policy::default(), &plan).unwrap();
        assert_eq!(
            compiled.commands[0].args,
            vec!["display-message", "-d", "1500", "ready: demo"]
        );
    }

    #[test]
    fn test_wait_for_prompt_sentinel_encoding_with_defaults() {
        let plan = plan_of(vec![PlanAction::new(PlanOp::WaitForPrompt(
            WaitForPromptOp {
                window: "ssh".to_string(),
                ..WaitForPromptOp::default()
            },
        ))]);
        let compiled = compile(&ctx(), &Policy::default(), &plan).unwrap();
        assert_eq!(
            compiled.commands[0].args,
            vec![
                "__wait_for_prompt__",
                "demo:ssh",
                "15000",
                "500",
                "250",
                "200",
                ""
            ]
        );
    }

    #[test]
    fn test_ssh_connect_sentinel_encoding() {
        let plan = plan_of(vec![PlanAction::new(PlanOp::SshManagerConnect(
            crate::plan::action::SshManagerConnectOp {
                window: "remote".to_string(),
                host: "db1".to_string(),
                user: "admin".to_string(),
                port: 2222,
                login_mode: "key".to_string(),
                ..crate::plan::action::SshManagerConnectOp::default()
            },
        ))]);
        let compiled = compile(&ctx(), &Policy::default(), &plan).unwrap();
        assert_eq!(
            compiled.commands[0].args,
            vec![
                "__ssh_manager_connect__",
                "demo:remote",
                "db1",
                "admin",
                "2222",
                "key",
                "0"
            ]
        );
    }

    #[test]
    fn test_shell_compiles_to_unsafe_window() {
        let mut policy = Policy::default();
        policy.allow_shell = true;
        let plan = plan_of(vec![PlanAction::new(PlanOp::Shell(ShellOp {
            cmd: "make dev".to_string(),
            ..ShellOp::default()
        }))]);
        let compiled = compile(&ctx(), &policy, &plan).unwrap();
        assert!(compiled.unsafe_used);
        assert!(compiled.commands[0].is_unsafe);
        assert_eq!(
            compiled.commands[0].args,
            vec![
                "new-window", "-t", "demo", "-n", "shell", "-c", "/tmp/demo", "--", "bash",
                "-lc", "make dev"
            ]
        );
    }

    #[test]
    fn test_shell_rejected_without_policy() {
        let plan = plan_of(vec![PlanAction::new(PlanOp::Shell(ShellOp {
            cmd: "make dev".to_string(),
            ..ShellOp::default()
        }))]);
        let err = compile(&ctx(), &Policy::default(), &plan).unwrap_err();
        assert!(err.to_string().contains("disabled by policy"));
    }

    #[test]
    fn test_tmux_passthrough_recheck_on_substituted_args() {
        let mut policy = Policy::default();
        policy.allow_tmux_passthrough = true;

        let plan = plan_of(vec![PlanAction::new(PlanOp::Tmux(TmuxOp {
            args: vec!["new-window".to_string(), "-t".to_string(), "x".to_string()],
        }))]);
        let compiled = compile(&ctx(), &policy, &plan).unwrap();
        assert!(compiled.commands[0].is_unsafe);

        let denied = plan_of(vec![PlanAction::new(PlanOp::Tmux(TmuxOp {
            args: vec!["run-shell".to_string(), "ls".to_string()],
        }))]);
        let err = compile(&ctx(), &policy, &denied).unwrap_err();
        assert!(err.to_string().contains("not allowed by policy"));
    }

    #[test]
    fn test_ensure_session_warns_non_atomic() {
        let plan = plan_of(vec![PlanAction::new(PlanOp::EnsureSession(
            crate::plan::action::EnsureSessionOp::default(),
        ))]);
        let compiled = compile(&ctx(), &Policy::default(), &plan).unwrap();
        assert_eq!(
            compiled.commands[0].args,
            vec!["new-session", "-d", "-s", "demo", "-c", "/tmp/demo"]
        );
        assert_eq!(compiled.warnings.len(), 1);
        assert!(compiled.warnings[0].contains("non-atomic"));
    }

    #[test]
    fn test_ignore_error_propagates_to_commands() {
        let plan = plan_of(vec![PlanAction::with_ignore_error(
            PlanOp::SendKeys(SendKeysOp {
                command: "ls".to_string(),
                enter: true,
                ..SendKeysOp::default()
            }),
            true,
        )]);
        let compiled = compile(&ctx(), &Policy::default(), &plan).unwrap();
        assert!(compiled.commands[0].ignore_error);
    }

    #[test]
    fn test_dry_run_rendering() {
        let mut policy = Policy::default();
        policy.allow_shell = true;
        let plan = plan_of(vec![
            PlanAction::new(PlanOp::SelectPane(SelectPaneOp {
                session: String::new(),
                pane: "1".to_string(),
            })),
            PlanAction::new(PlanOp::Shell(ShellOp {
                cmd: "make dev".to_string(),
                ..ShellOp::default()
            })),
        ]);
        let compiled = compile(&ctx(), &policy, &plan).unwrap();
        let lines = dry_run_lines(&compiled);

        assert_eq!(
            lines[0],
            "WARNING: unsafe actions present (shell and/or tmux passthrough)"
        );
        assert!(lines.contains(&"tmux # select pane demo:.1".to_string()));
        assert!(lines.contains(&"tmux select-pane -t demo:.1".to_string()));
        assert!(lines.iter().any(|l| l.starts_with("tmux (unsafe) ")));
        assert_eq!(render_dry_run(&compiled), lines.join("\n"));
    }

    #[test]
    fn test_dry_run_includes_warnings() {
        let plan = plan_of(vec![PlanAction::new(PlanOp::EnsureSession(
            crate::plan::action::EnsureSessionOp::default(),
        ))]);
        let compiled = compile(&ctx(), &Policy::default(), &plan).unwrap();
        let lines = dry_run_lines(&compiled);
        assert!(lines[0].starts_with("WARN: "));
    }
}
