//! Environment-driven safety configuration.
//!
//! The core pipeline reads no environment variables itself; everything
//! caller-facing funnels through here. Defaults are the locked-down
//! [`Policy::default`], with opt-in overrides:
//!
//! - `MUXPLAN_ALLOW_SHELL` / `MUXPLAN_ALLOW_TMUX_PASSTHROUGH` - booleans
//! - `MUXPLAN_ALLOWED_TMUX_COMMANDS` / `MUXPLAN_DENIED_TMUX_COMMANDS` -
//!   comma-separated subcommand lists (replace the defaults)
//! - `MUXPLAN_ALLOWED_SHELL_PREFIXES` - comma-separated prefixes; spaces
//!   inside a prefix are preserved
//! - `MUXPLAN_TMUX_BIN` - tmux executable override
//! - `MUXPLAN_COMMAND_TIMEOUT_MS` - per-command runner timeout (0 disables)
//!
//! Malformed values are errors, not silent fallbacks: a typo in a safety
//! toggle must never quietly leave the default in place.

use std::collections::BTreeSet;
use std::time::Duration;

use muxplan_core::{MuxplanError, Policy, TmuxRunner};

pub const ENV_ALLOW_SHELL: &str = "MUXPLAN_ALLOW_SHELL";
pub const ENV_ALLOW_TMUX_PASSTHROUGH: &str = "MUXPLAN_ALLOW_TMUX_PASSTHROUGH";
pub const ENV_ALLOWED_TMUX_COMMANDS: &str = "MUXPLAN_ALLOWED_TMUX_COMMANDS";
pub const ENV_DENIED_TMUX_COMMANDS: &str = "MUXPLAN_DENIED_TMUX_COMMANDS";
pub const ENV_ALLOWED_SHELL_PREFIXES: &str = "MUXPLAN_ALLOWED_SHELL_PREFIXES";
pub const ENV_TMUX_BIN: &str = "MUXPLAN_TMUX_BIN";
pub const ENV_COMMAND_TIMEOUT_MS: &str = "MUXPLAN_COMMAND_TIMEOUT_MS";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: \"{value}\" (expected 1/0, true/false, yes/no, on/off)")]
    InvalidBool { key: &'static str, value: String },

    #[error("Invalid value for {key}: \"{value}\" (expected milliseconds as a non-negative integer)")]
    InvalidTimeout { key: &'static str, value: String },
}

impl MuxplanError for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            ConfigError::InvalidBool { .. } => "CONFIG_INVALID_BOOL",
            ConfigError::InvalidTimeout { .. } => "CONFIG_INVALID_TIMEOUT",
        }
    }

    fn is_user_error(&self) -> bool {
        true
    }
}

/// Build the runtime policy from defaults plus environment overrides.
pub fn policy_from_env() -> Result<Policy, ConfigError> {
    let mut policy = Policy::default();

    if let Some(v) = env_trimmed(ENV_ALLOW_SHELL) {
        policy.allow_shell = parse_bool(ENV_ALLOW_SHELL, &v)?;
    }
    if let Some(v) = env_trimmed(ENV_ALLOW_TMUX_PASSTHROUGH) {
        policy.allow_tmux_passthrough = parse_bool(ENV_ALLOW_TMUX_PASSTHROUGH, &v)?;
    }
    if let Some(v) = env_trimmed(ENV_ALLOWED_TMUX_COMMANDS) {
        let list = split_comma_list(&v);
        if !list.is_empty() {
            policy.allowed_tmux_commands = list;
        }
    }
    if let Some(v) = env_trimmed(ENV_DENIED_TMUX_COMMANDS) {
        let list = split_comma_list(&v);
        if !list.is_empty() {
            policy.denied_tmux_commands = list;
        }
    }
    if let Some(v) = env_trimmed(ENV_ALLOWED_SHELL_PREFIXES) {
        policy.allowed_shell_prefixes = split_comma_list_preserve_spaces(&v);
    }

    Ok(policy)
}

/// Build the tmux runner from environment overrides.
pub fn runner_from_env() -> Result<TmuxRunner, ConfigError> {
    let mut runner = TmuxRunner::new();
    if let Some(bin) = env_trimmed(ENV_TMUX_BIN) {
        runner.bin = bin;
    }
    if let Some(v) = env_trimmed(ENV_COMMAND_TIMEOUT_MS) {
        runner.timeout = parse_timeout_ms(&v)?;
    }
    Ok(runner)
}

/// Parse a millisecond timeout value; 0 means "no timeout".
fn parse_timeout_ms(v: &str) -> Result<Option<Duration>, ConfigError> {
    let ms: u64 = v.trim().parse().map_err(|_| ConfigError::InvalidTimeout {
        key: ENV_COMMAND_TIMEOUT_MS,
        value: v.to_string(),
    })?;
    if ms > 0 {
        Ok(Some(Duration::from_millis(ms)))
    } else {
        Ok(None)
    }
}

fn env_trimmed(key: &str) -> Option<String> {
    match std::env::var(key) {
        Ok(v) => {
            let v = v.trim().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        }
        Err(_) => None,
    }
}

fn parse_bool(key: &'static str, v: &str) -> Result<bool, ConfigError> {
    match v.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            key,
            value: v.to_string(),
        }),
    }
}

fn split_comma_list(v: &str) -> BTreeSet<String> {
    v.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split on commas keeping interior spaces ("npm ,cargo run " keeps
/// "npm " and "cargo run "), since shell prefixes are space-significant.
fn split_comma_list_preserve_spaces(v: &str) -> Vec<String> {
    v.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_forms() {
        assert!(parse_bool(ENV_ALLOW_SHELL, "1").unwrap());
        assert!(parse_bool(ENV_ALLOW_SHELL, "TRUE").unwrap());
        assert!(parse_bool(ENV_ALLOW_SHELL, "yes").unwrap());
        assert!(!parse_bool(ENV_ALLOW_SHELL, "0").unwrap());
        assert!(!parse_bool(ENV_ALLOW_SHELL, "off").unwrap());
    }

    #[test]
    fn test_parse_bool_rejects_gibberish() {
        let err = parse_bool(ENV_ALLOW_SHELL, "gibberish").unwrap_err();
        assert!(err.to_string().contains(ENV_ALLOW_SHELL));
        assert!(err.to_string().contains("gibberish"));
        assert_eq!(err.error_code(), "CONFIG_INVALID_BOOL");
        assert!(err.is_user_error());
    }

    #[test]
    fn test_split_comma_list() {
        let list = split_comma_list("new-window, split-window ,,send-keys");
        assert!(list.contains("new-window"));
        assert!(list.contains("split-window"));
        assert!(list.contains("send-keys"));
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_split_comma_list_preserve_spaces() {
        let list = split_comma_list_preserve_spaces("npm ,cargo run ,  ");
        assert_eq!(list, vec!["npm ".to_string(), "cargo run ".to_string()]);
    }

    #[test]
    fn test_policy_from_env_defaults_locked_down() {
        // No env vars set in the test environment for these keys.
        std::env::remove_var(ENV_ALLOW_SHELL);
        std::env::remove_var(ENV_ALLOW_TMUX_PASSTHROUGH);
        let policy = policy_from_env().unwrap();
        assert!(!policy.allow_shell);
        assert!(!policy.allow_tmux_passthrough);
        assert!(policy.allowed_tmux_commands.contains("new-window"));
        assert!(policy.denied_tmux_commands.contains("run-shell"));
    }

    #[test]
    fn test_parse_timeout_ms_rejects_non_numeric() {
        let err = parse_timeout_ms("soon").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTimeout { .. }));
        assert!(err.to_string().contains("soon"));
        assert!(err.to_string().contains(ENV_COMMAND_TIMEOUT_MS));
        assert_eq!(err.error_code(), "CONFIG_INVALID_TIMEOUT");
    }

    #[test]
    fn test_parse_timeout_ms_zero_disables() {
        assert!(parse_timeout_ms("0").unwrap().is_none());
        assert_eq!(
            parse_timeout_ms("2500").unwrap(),
            Some(Duration::from_millis(2500))
        );
    }
}
