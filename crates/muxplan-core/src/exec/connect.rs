//! The `ssh_manager_connect` structured-connect handler.
//!
//! Starts an interactive ssh session in the target pane by typing a fixed,
//! shell-quoted command line. For `login_mode=askpass` the command is the
//! external connector binary, which owns password retrieval and prompt
//! detection; passwords are never held by this process and never pass
//! through tmux send-keys.

use tracing::info;

use crate::plan::{shell_join, SENTINEL_SSH_MANAGER_CONNECT};
use crate::runner::Runner;

use super::errors::ExecError;

/// External PTY connector invoked for askpass logins.
pub const SSH_CONNECTOR_BIN: &str = "tmux-ssh-manager";

/// Handle a `__ssh_manager_connect__` sentinel.
///
/// Argv encoding (from the compiler):
/// `["__ssh_manager_connect__", target, host, user, port, login_mode, connect_timeout_ms]`
pub fn ssh_manager_connect(runner: &dyn Runner, args: &[String]) -> Result<(), ExecError> {
    if args.len() < 7 {
        return Err(ExecError::invalid_sentinel(
            SENTINEL_SSH_MANAGER_CONNECT,
            format!("expected 7 args, got {}", args.len()),
        ));
    }

    let target = args[1].trim();
    let host = args[2].trim();
    let user = args[3].trim();
    let port: i64 = args[4].trim().parse().unwrap_or(0);
    let login_mode = {
        let mode = args[5].trim().to_lowercase();
        if mode.is_empty() {
            "askpass".to_string()
        } else {
            mode
        }
    };
    // connect_timeout_ms (args[6]) is honored by a subsequent
    // wait_for_prompt action when the spec wants a readiness bound.

    if target.is_empty() {
        return Err(ExecError::invalid_sentinel(
            SENTINEL_SSH_MANAGER_CONNECT,
            "empty target",
        ));
    }
    if host.is_empty() {
        return Err(ExecError::invalid_sentinel(
            SENTINEL_SSH_MANAGER_CONNECT,
            "empty host",
        ));
    }

    let argv: Vec<String> = match login_mode.as_str() {
        "askpass" => {
            // The connector fetches the password from the OS keychain,
            // detects the prompt, and leaves the pane in the remote shell.
            let mut argv = vec![
                SSH_CONNECTOR_BIN.to_string(),
                "__connect".to_string(),
                "--host".to_string(),
                host.to_string(),
            ];
            if !user.is_empty() {
                argv.push("--user".to_string());
                argv.push(user.to_string());
            }
            // The connector resolves ports via ssh config / host aliases.
            argv
        }

        "manual" | "key" => {
            let dest = if user.is_empty() {
                host.to_string()
            } else {
                format!("{}@{}", user, host)
            };
            let mut argv = vec!["ssh".to_string()];
            if port > 0 {
                argv.push("-p".to_string());
                argv.push(port.to_string());
            }
            argv.push(dest);
            argv
        }

        other => {
            return Err(ExecError::UnsupportedLoginMode {
                mode: other.to_string(),
            });
        }
    };

    info!(
        event = "core.exec.connect_started",
        target = target,
        host = host,
        login_mode = login_mode.as_str()
    );

    runner
        .run(&[
            "send-keys".to_string(),
            "-t".to_string(),
            target.to_string(),
            shell_join(&argv),
            "C-m".to_string(),
        ])
        .map_err(ExecError::from)
}
