//! Structural validation and normalization of a parsed spec.
//!
//! `Spec::validate` runs before any other consumer sees the document. It
//! normalizes in place (type lower-casing, trimming, `command` shorthand
//! expansion) and checks structural invariants. Security policy is NOT
//! applied here; call `Spec::validate_policy` separately so schema problems
//! and policy rejections surface as distinct errors.

use crate::policy::Policy;

use super::errors::SpecError;
use super::naming::validate_tmux_name;
use super::types::{Action, PanePlanStep, ShellAction, Spec, CURRENT_VERSION};

impl Spec {
    /// Structural validation. Mutates the spec in place for normalization.
    pub fn validate(&mut self) -> Result<(), SpecError> {
        if self.version == 0 {
            // Version is optional; default to the current schema.
            self.version = CURRENT_VERSION;
        }
        if self.version != CURRENT_VERSION {
            return Err(SpecError::UnsupportedVersion {
                found: self.version,
                expected: CURRENT_VERSION,
            });
        }

        if self.actions.is_empty() && self.windows.is_empty() {
            return Err(SpecError::EmptySpec);
        }

        for wi in 0..self.windows.len() {
            let window_name = self.windows[wi].name.trim().to_string();
            if window_name.is_empty() {
                return Err(SpecError::schema(
                    format!("windows[{}]", wi),
                    "name is required",
                ));
            }

            let w = &mut self.windows[wi];

            w.focus_pane = w.focus_pane.trim().to_lowercase();
            if !w.focus_pane.is_empty()
                && w.focus_pane != "active"
                && !w.focus_pane.chars().all(|c| c.is_ascii_digit())
            {
                return Err(SpecError::schema(
                    format!("windows[{}]({})", wi, window_name),
                    format!(
                        "focus_pane must be \"active\" or a numeric string (got \"{}\")",
                        w.focus_pane
                    ),
                ));
            }

            if !w.pane_plan.is_empty() {
                validate_pane_plan(&w.pane_plan, &format!("windows[{}]({})", wi, window_name))?;

                for si in 0..w.pane_plan.len() {
                    let Some(pane) = w.pane_plan[si].pane.as_mut() else {
                        continue;
                    };

                    // Normalize shorthand command -> shell action before
                    // policy validation, so policy rejections name the
                    // resulting action type.
                    if !pane.command.is_empty() && pane.actions.is_empty() {
                        pane.actions = vec![shell_shorthand(&pane.command)];
                    }

                    for ak in 0..pane.actions.len() {
                        validate_action(
                            &mut pane.actions[ak],
                            &format!(
                                "windows[{}]({}).pane_plan[{}].pane.actions[{}]",
                                wi, window_name, si, ak
                            ),
                        )?;
                    }
                }
            }

            for pj in 0..w.panes.len() {
                let pane = &mut w.panes[pj];
                if !pane.command.is_empty() && pane.actions.is_empty() {
                    pane.actions = vec![shell_shorthand(&pane.command)];
                }
                for ak in 0..pane.actions.len() {
                    validate_action(
                        &mut pane.actions[ak],
                        &format!(
                            "windows[{}]({}).panes[{}].actions[{}]",
                            wi, window_name, pj, ak
                        ),
                    )?;
                }
            }

            for ak in 0..w.actions.len() {
                validate_action(
                    &mut w.actions[ak],
                    &format!("windows[{}]({}).actions[{}]", wi, window_name, ak),
                )?;
            }
        }

        for ai in 0..self.actions.len() {
            validate_action(&mut self.actions[ai], &format!("actions[{}]", ai))?;
        }

        if !self.session.name.is_empty() {
            validate_tmux_name(&self.session.name).map_err(|e| {
                SpecError::schema("session.name", e.to_string())
            })?;
        }

        self.session.focus_window = self.session.focus_window.trim().to_string();
        if !self.session.focus_window.is_empty() {
            if self.session.focus_window.eq_ignore_ascii_case("active") {
                self.session.focus_window = "active".to_string();
            } else if !self
                .session
                .focus_window
                .chars()
                .all(|c| c.is_ascii_digit())
            {
                validate_tmux_name(&self.session.focus_window).map_err(|e| {
                    SpecError::schema("session.focus_window", e.to_string())
                })?;
            }
        }

        Ok(())
    }

    /// Enforce execution policy rules (shell allow, tmux allow/deny lists).
    pub fn validate_policy(&self, policy: &Policy) -> Result<(), SpecError> {
        for (ai, a) in self.actions.iter().enumerate() {
            check_action_policy(a, policy, &format!("actions[{}]", ai))?;
        }
        for w in &self.windows {
            for a in &w.actions {
                check_action_policy(a, policy, &format!("window \"{}\"", w.name))?;
            }
            for p in &w.panes {
                for a in &p.actions {
                    check_action_policy(
                        a,
                        policy,
                        &format!("window \"{}\" pane \"{}\"", w.name, p.name),
                    )?;
                }
            }
            for (si, step) in w.pane_plan.iter().enumerate() {
                let Some(pane) = step.pane.as_ref() else {
                    continue;
                };
                for a in &pane.actions {
                    check_action_policy(
                        a,
                        policy,
                        &format!("window \"{}\" pane_plan[{}]", w.name, si),
                    )?;
                }
            }
        }
        Ok(())
    }
}

fn shell_shorthand(command: &str) -> Action {
    Action {
        action_type: "shell".to_string(),
        shell: Some(ShellAction {
            cmd: command.to_string(),
            shell: String::new(),
        }),
        ..Action::default()
    }
}

fn check_action_policy(a: &Action, policy: &Policy, path: &str) -> Result<(), SpecError> {
    match a.action_type.as_str() {
        "shell" => {
            if !policy.allow_shell {
                return Err(SpecError::policy(
                    path,
                    "shell actions are disabled by policy",
                ));
            }
        }
        // "mux" covers callers that gate policy before validation has
        // normalized the alias.
        "tmux" | "mux" => {
            let Some(tmux) = a.tmux.as_ref() else {
                return Err(SpecError::schema(path, "tmux action missing tmux{}"));
            };
            let cmd = tmux.name.trim();
            if cmd.is_empty() {
                return Err(SpecError::schema(path, "tmux.name is required"));
            }
            if policy.is_tmux_command_denied(cmd) {
                return Err(SpecError::policy(
                    path,
                    format!("tmux command \"{}\" is disallowed by policy", cmd),
                ));
            }
            if !policy.allow_tmux_passthrough && !policy.is_tmux_command_allowlisted(cmd) {
                return Err(SpecError::policy(
                    path,
                    format!("tmux command \"{}\" not allowed by policy", cmd),
                ));
            }
        }
        _ => {}
    }
    Ok(())
}

fn validate_pane_plan(steps: &[PanePlanStep], path: &str) -> Result<(), SpecError> {
    if steps.is_empty() {
        return Ok(());
    }

    if steps[0].pane.is_none() || steps[0].split.is_some() {
        return Err(SpecError::schema(
            format!("{}.pane_plan", path),
            "first step must be pane",
        ));
    }

    for (i, step) in steps.iter().enumerate() {
        let has_pane = step.pane.is_some();
        let has_split = step.split.is_some();

        if has_pane == has_split {
            return Err(SpecError::schema(
                format!("{}.pane_plan[{}]", path, i),
                "step must have exactly one of pane or split",
            ));
        }

        if let Some(split) = step.split.as_ref() {
            let dir = split.direction.trim().to_lowercase();
            if dir != "h" && dir != "v" {
                return Err(SpecError::schema(
                    format!("{}.pane_plan[{}]", path, i),
                    "split.direction must be 'h' or 'v'",
                ));
            }
            // Size is optional; the compiler decides percent vs absolute.
        }
    }

    // A split must be followed by a pane for a meaningful plan.
    if steps[steps.len() - 1].split.is_some() {
        return Err(SpecError::schema(
            format!("{}.pane_plan", path),
            "last step must be pane (cannot end with split)",
        ));
    }

    Ok(())
}

fn validate_action(a: &mut Action, path: &str) -> Result<(), SpecError> {
    a.action_type = a.action_type.trim().to_lowercase();
    if a.action_type.is_empty() {
        return Err(SpecError::schema(path, "missing type"));
    }
    // "mux" is the multiplexer-agnostic spelling of the passthrough type;
    // normalize it here so policy checks and lowering see one name.
    if a.action_type == "mux" {
        a.action_type = "tmux".to_string();
    }

    match a.action_type.as_str() {
        "tmux" => {
            let Some(tmux) = a.tmux.as_mut() else {
                return Err(SpecError::schema(path, "tmux action missing tmux{}"));
            };
            tmux.name = tmux.name.trim().to_string();
            if tmux.name.is_empty() {
                return Err(SpecError::schema(path, "tmux.name is required"));
            }
        }
        "run" => {
            let Some(run) = a.run.as_mut() else {
                return Err(SpecError::schema(path, "run action missing run{}"));
            };
            run.program = run.program.trim().to_string();
            if run.program.is_empty() {
                return Err(SpecError::schema(path, "run.program is required"));
            }
        }
        "send_keys" => {
            let Some(send_keys) = a.send_keys.as_ref() else {
                return Err(SpecError::schema(path, "send_keys action missing send_keys{}"));
            };
            if send_keys.keys.is_empty() {
                return Err(SpecError::schema(path, "send_keys.keys is required"));
            }
        }
        "shell" => {
            let Some(shell) = a.shell.as_mut() else {
                return Err(SpecError::schema(path, "shell action missing shell{}"));
            };
            shell.cmd = shell.cmd.trim().to_string();
            if shell.cmd.is_empty() {
                return Err(SpecError::schema(path, "shell.cmd is required"));
            }
        }
        "sleep" => {
            let Some(sleep) = a.sleep.as_ref() else {
                return Err(SpecError::schema(path, "sleep action missing sleep{}"));
            };
            if sleep.ms < 0 {
                return Err(SpecError::schema(path, "sleep.ms must be >= 0"));
            }
        }
        "watch" => {
            let Some(watch) = a.watch.as_mut() else {
                return Err(SpecError::schema(path, "watch action missing watch{}"));
            };
            if watch.interval_s < 0 {
                return Err(SpecError::schema(path, "watch.interval_s must be >= 0"));
            }
            watch.command = watch.command.trim().to_string();
            if watch.command.is_empty() {
                return Err(SpecError::schema(path, "watch.command is required"));
            }
        }
        "wait_for_prompt" => {
            let Some(wait) = a.wait_for_prompt.as_mut() else {
                return Err(SpecError::schema(
                    path,
                    "wait_for_prompt action missing wait_for_prompt{}",
                ));
            };
            if wait.timeout_ms < 0 {
                return Err(SpecError::schema(path, "wait_for_prompt.timeout_ms must be >= 0"));
            }
            if wait.min_quiet_ms < 0 {
                return Err(SpecError::schema(
                    path,
                    "wait_for_prompt.min_quiet_ms must be >= 0",
                ));
            }
            if wait.settle_ms < 0 {
                return Err(SpecError::schema(path, "wait_for_prompt.settle_ms must be >= 0"));
            }
            if wait.max_lines < 0 {
                return Err(SpecError::schema(path, "wait_for_prompt.max_lines must be >= 0"));
            }
            wait.prompt_regex = wait.prompt_regex.trim().to_string();
        }
        "ssh_manager_connect" => {
            let Some(connect) = a.ssh_manager_connect.as_mut() else {
                return Err(SpecError::schema(
                    path,
                    "ssh_manager_connect action missing ssh_manager_connect{}",
                ));
            };
            connect.host = connect.host.trim().to_string();
            if connect.host.is_empty() {
                return Err(SpecError::schema(path, "ssh_manager_connect.host is required"));
            }
            connect.user = connect.user.trim().to_string();
            if connect.port < 0 {
                return Err(SpecError::schema(path, "ssh_manager_connect.port must be >= 0"));
            }
            connect.login_mode = connect.login_mode.trim().to_lowercase();
            if connect.login_mode.is_empty() {
                connect.login_mode = "askpass".to_string();
            }
            match connect.login_mode.as_str() {
                "askpass" | "manual" | "key" => {}
                other => {
                    return Err(SpecError::schema(
                        path,
                        format!(
                            "ssh_manager_connect.login_mode must be askpass|manual|key (got \"{}\")",
                            other
                        ),
                    ));
                }
            }
            if connect.connect_timeout_ms < 0 {
                return Err(SpecError::schema(
                    path,
                    "ssh_manager_connect.connect_timeout_ms must be >= 0",
                ));
            }
        }
        other => {
            return Err(SpecError::schema(
                path,
                format!("unknown action type \"{}\"", other),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Spec {
        serde_yaml::from_str(yaml).expect("test fixture parses")
    }

    #[test]
    fn test_validate_empty_spec_fails() {
        let mut spec = parse("version: 1");
        let err = spec.validate().unwrap_err();
        assert!(err.to_string().contains("windows[] or actions[]"));
    }

    #[test]
    fn test_validate_version_zero_defaults_to_current() {
        let mut spec = parse("windows: [{name: main}]");
        spec.validate().unwrap();
        assert_eq!(spec.version, CURRENT_VERSION);
    }

    #[test]
    fn test_validate_unsupported_version_fails() {
        let mut spec = parse("version: 2\nwindows: [{name: main}]");
        let err = spec.validate().unwrap_err();
        assert!(err.to_string().contains("unsupported spec version 2"));
    }

    #[test]
    fn test_validate_window_name_required() {
        let mut spec = parse("windows: [{layout: tiled}]");
        let err = spec.validate().unwrap_err();
        assert_eq!(err.to_string(), "windows[0]: name is required");
    }

    #[test]
    fn test_validate_session_name_charset() {
        let mut spec = parse("session: {name: \"bad:name\"}\nwindows: [{name: main}]");
        let err = spec.validate().unwrap_err();
        assert!(err.to_string().starts_with("session.name:"));

        let mut spec = parse("session: {name: good-name_2}\nwindows: [{name: main}]");
        spec.validate().unwrap();
    }

    #[test]
    fn test_validate_focus_window_forms() {
        let mut spec = parse("session: {focus_window: Active}\nwindows: [{name: main}]");
        spec.validate().unwrap();
        assert_eq!(spec.session.focus_window, "active");

        let mut spec = parse("session: {focus_window: \"2\"}\nwindows: [{name: main}]");
        spec.validate().unwrap();
        assert_eq!(spec.session.focus_window, "2");

        let mut spec = parse("session: {focus_window: files}\nwindows: [{name: main}]");
        spec.validate().unwrap();

        let mut spec = parse("session: {focus_window: \"no good\"}\nwindows: [{name: main}]");
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_validate_focus_pane_forms() {
        let mut spec = parse("windows: [{name: main, focus_pane: ACTIVE}]");
        spec.validate().unwrap();
        assert_eq!(spec.windows[0].focus_pane, "active");

        let mut spec = parse("windows: [{name: main, focus_pane: \"1\"}]");
        spec.validate().unwrap();

        let mut spec = parse("windows: [{name: main, focus_pane: topleft}]");
        let err = spec.validate().unwrap_err();
        assert!(err.to_string().contains("focus_pane"));
        assert!(err.to_string().contains("windows[0](main)"));
    }

    #[test]
    fn test_validate_pane_plan_first_step_must_be_pane() {
        let mut spec = parse(
            r#"
windows:
  - name: editor
    pane_plan:
      - split: { direction: h }
      - pane: { name: shell }
"#,
        );
        let err = spec.validate().unwrap_err();
        assert!(err.to_string().contains("first step must be pane"));
    }

    #[test]
    fn test_validate_pane_plan_trailing_split_fails() {
        let mut spec = parse(
            r#"
windows:
  - name: editor
    pane_plan:
      - pane: { name: nvim }
      - split: { direction: v }
"#,
        );
        let err = spec.validate().unwrap_err();
        assert!(err.to_string().contains("last step must be pane"));
    }

    #[test]
    fn test_validate_pane_plan_bad_direction_fails() {
        let mut spec = parse(
            r#"
windows:
  - name: editor
    pane_plan:
      - pane: { name: nvim }
      - split: { direction: x }
      - pane: { name: shell }
"#,
        );
        let err = spec.validate().unwrap_err();
        assert!(err.to_string().contains("split.direction must be 'h' or 'v'"));
        assert!(err.to_string().contains("pane_plan[1]"));
    }

    #[test]
    fn test_validate_pane_plan_step_with_both_fails() {
        let mut spec = parse(
            r#"
windows:
  - name: editor
    pane_plan:
      - pane: { name: nvim }
        split: { direction: h }
"#,
        );
        let err = spec.validate().unwrap_err();
        assert!(err.to_string().contains("exactly one of pane or split"));
    }

    #[test]
    fn test_validate_unknown_action_type_rejected() {
        let mut spec = parse("actions: [{type: teleport}]");
        let err = spec.validate().unwrap_err();
        assert!(err.to_string().contains("unknown action type \"teleport\""));
    }

    #[test]
    fn test_validate_missing_payload_rejected() {
        for (ty, needle) in [
            ("run", "missing run{}"),
            ("send_keys", "missing send_keys{}"),
            ("shell", "missing shell{}"),
            ("sleep", "missing sleep{}"),
            ("watch", "missing watch{}"),
            ("wait_for_prompt", "missing wait_for_prompt{}"),
            ("ssh_manager_connect", "missing ssh_manager_connect{}"),
            ("tmux", "missing tmux{}"),
        ] {
            let mut spec = parse(&format!("actions: [{{type: {}}}]", ty));
            let err = spec.validate().unwrap_err();
            assert!(
                err.to_string().contains(needle),
                "{}: got {}",
                ty,
                err
            );
        }
    }

    #[test]
    fn test_validate_mux_alias_normalized_to_tmux() {
        // Both the type tag and the payload key accept the "mux" spelling.
        let mut spec = parse(
            r#"
actions:
  - type: mux
    mux: { name: new-window, args: [-t, x] }
"#,
        );
        spec.validate().unwrap();
        assert_eq!(spec.actions[0].action_type, "tmux");
        assert_eq!(spec.actions[0].tmux.as_ref().unwrap().name, "new-window");

        // Mixed spelling works too.
        let mut spec = parse(
            r#"
actions:
  - type: mux
    tmux: { name: select-layout }
"#,
        );
        spec.validate().unwrap();
        assert_eq!(spec.actions[0].action_type, "tmux");
    }

    #[test]
    fn test_validate_policy_applies_to_mux_alias() {
        let mut spec = parse("actions: [{type: mux, mux: {name: run-shell, args: [ls]}}]");
        spec.validate().unwrap();

        let mut open = Policy::default();
        open.allow_tmux_passthrough = true;
        let err = spec.validate_policy(&open).unwrap_err();
        assert!(err.to_string().contains("disallowed by policy"));
    }

    #[test]
    fn test_validate_action_type_normalized() {
        let mut spec = parse(
            r#"
actions:
  - type: "  RUN  "
    run: { program: ls }
"#,
        );
        spec.validate().unwrap();
        assert_eq!(spec.actions[0].action_type, "run");
    }

    #[test]
    fn test_validate_negative_numeric_fields_rejected() {
        let mut spec = parse("actions: [{type: sleep, sleep: {ms: -1}}]");
        assert!(spec.validate().is_err());

        let mut spec = parse(
            "actions: [{type: wait_for_prompt, wait_for_prompt: {timeout_ms: -5}}]",
        );
        assert!(spec.validate().is_err());

        let mut spec =
            parse("actions: [{type: watch, watch: {interval_s: -2, command: uptime}}]");
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_validate_login_mode_defaults_and_constrains() {
        let mut spec =
            parse("actions: [{type: ssh_manager_connect, ssh_manager_connect: {host: db1}}]");
        spec.validate().unwrap();
        assert_eq!(
            spec.actions[0]
                .ssh_manager_connect
                .as_ref()
                .unwrap()
                .login_mode,
            "askpass"
        );

        let mut spec = parse(
            "actions: [{type: ssh_manager_connect, ssh_manager_connect: {host: db1, login_mode: quantum}}]",
        );
        let err = spec.validate().unwrap_err();
        assert!(err.to_string().contains("askpass|manual|key"));
    }

    #[test]
    fn test_pane_command_shorthand_normalized_to_shell_action() {
        let mut spec = parse(
            r#"
windows:
  - name: test
    panes:
      - command: "npm test"
"#,
        );
        spec.validate().unwrap();
        let actions = &spec.windows[0].panes[0].actions;
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].action_type, "shell");
        assert_eq!(actions[0].shell.as_ref().unwrap().cmd, "npm test");
    }

    #[test]
    fn test_pane_plan_command_shorthand_normalized() {
        let mut spec = parse(
            r#"
windows:
  - name: dev
    pane_plan:
      - pane: { command: "cargo watch" }
"#,
        );
        spec.validate().unwrap();
        let pane = spec.windows[0].pane_plan[0].pane.as_ref().unwrap();
        assert_eq!(pane.actions.len(), 1);
        assert_eq!(pane.actions[0].action_type, "shell");
    }

    #[test]
    fn test_shorthand_does_not_override_explicit_actions() {
        let mut spec = parse(
            r#"
windows:
  - name: dev
    panes:
      - command: "echo hi"
        actions:
          - type: run
            run: { program: ls }
"#,
        );
        spec.validate().unwrap();
        let actions = &spec.windows[0].panes[0].actions;
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].action_type, "run");
    }

    #[test]
    fn test_valid_spec_content_unchanged() {
        let mut spec = parse(
            r#"
version: 1
windows:
  - name: editor
    root: /tmp/demo
    layout: main-vertical
    pane_plan:
      - pane: { name: nvim, focus: true, actions: [{type: run, run: {program: nvim, args: ["."]}}] }
      - split: { direction: h, size: "50%" }
      - pane: { name: shell }
"#,
        );
        spec.validate().unwrap();
        assert_eq!(spec.windows[0].layout, "main-vertical");
        assert_eq!(spec.windows[0].pane_plan.len(), 3);
        let nvim = spec.windows[0].pane_plan[0].pane.as_ref().unwrap();
        assert_eq!(nvim.actions[0].run.as_ref().unwrap().program, "nvim");
    }

    #[test]
    fn test_validate_policy_shell_gate() {
        let mut spec = parse("actions: [{type: shell, shell: {cmd: \"make dev\"}}]");
        spec.validate().unwrap();

        let locked = Policy::default();
        let err = spec.validate_policy(&locked).unwrap_err();
        assert!(err.to_string().contains("disabled by policy"));

        let mut open = Policy::default();
        open.allow_shell = true;
        spec.validate_policy(&open).unwrap();
    }

    #[test]
    fn test_validate_policy_tmux_allowlist() {
        let mut spec =
            parse("actions: [{type: tmux, tmux: {name: new-window, args: [-t, x]}}]");
        spec.validate().unwrap();

        // Allowlisted name passes even without passthrough at this stage;
        // the compile-time gate still requires the passthrough toggle.
        spec.validate_policy(&Policy::default()).unwrap();

        let mut spec = parse("actions: [{type: tmux, tmux: {name: choose-tree}}]");
        spec.validate().unwrap();
        let err = spec.validate_policy(&Policy::default()).unwrap_err();
        assert!(err.to_string().contains("not allowed by policy"));
    }

    #[test]
    fn test_validate_policy_tmux_denylist() {
        let mut spec = parse("actions: [{type: tmux, tmux: {name: run-shell, args: [ls]}}]");
        spec.validate().unwrap();

        let mut open = Policy::default();
        open.allow_tmux_passthrough = true;
        let err = spec.validate_policy(&open).unwrap_err();
        assert!(err.to_string().contains("disallowed by policy"));
    }

    #[test]
    fn test_validate_policy_walks_nested_actions() {
        let mut spec = parse(
            r#"
windows:
  - name: dev
    pane_plan:
      - pane: { command: "make dev" }
"#,
        );
        spec.validate().unwrap();
        let err = spec.validate_policy(&Policy::default()).unwrap_err();
        assert!(err.to_string().contains("disabled by policy"));
        assert!(err.to_string().contains("pane_plan"));
    }
}
