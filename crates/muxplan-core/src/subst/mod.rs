//! Variable substitution for user-authored spec strings.
//!
//! Supports `${VAR}` and `${VAR:-default}`. Lookup order: built-ins
//! (`PROJECT_NAME`, `PROJECT_PATH`, `SESSION_NAME`, `TMUX_SOCK`), then the
//! spec's `env` map, then the process environment, then the default. An
//! unresolved variable with no default expands to the empty string.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;

/// Substitution and targeting context supplied by the caller.
///
/// Built by the CLI (or any other embedder) from the project directory and
/// the resolved session name. The core never reads configuration from the
/// environment itself; process env is consulted only as a substitution
/// fallback.
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub project_name: String,
    pub project_path: String,

    /// The tmux session to create/target.
    pub session_name: String,

    /// Default cwd when not otherwise specified.
    pub working_dir: String,

    /// Values for `${VAR}` substitutions (in addition to process env).
    pub env: BTreeMap<String, String>,

    /// Optional socket name for multi-server setups.
    pub tmux_socket: String,
}

fn var_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // ${NAME} or ${NAME:-default}; default may be empty.
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-(.*?))?\}").expect("static var pattern")
    })
}

/// Expand `${VAR}` / `${VAR:-default}` occurrences in `s` against `ctx`.
pub fn subst(ctx: &Context, s: &str) -> String {
    if s.is_empty() || !s.contains("${") {
        return s.to_string();
    }

    var_pattern()
        .replace_all(s, |caps: &regex::Captures<'_>| {
            let key = &caps[1];
            let def = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            lookup(ctx, key).unwrap_or_else(|| def.to_string())
        })
        .into_owned()
}

fn lookup(ctx: &Context, key: &str) -> Option<String> {
    let builtin = match key {
        "PROJECT_NAME" => Some(ctx.project_name.as_str()),
        "PROJECT_PATH" => Some(ctx.project_path.as_str()),
        "SESSION_NAME" => Some(ctx.session_name.as_str()),
        "TMUX_SOCK" => Some(ctx.tmux_socket.as_str()),
        _ => None,
    };
    if let Some(v) = builtin {
        if !v.is_empty() {
            return Some(v.to_string());
        }
    }
    if let Some(v) = ctx.env.get(key) {
        if !v.is_empty() {
            return Some(v.clone());
        }
    }
    match std::env::var(key) {
        Ok(v) if !v.is_empty() => Some(v),
        _ => None,
    }
}

/// Expand a leading `~` or `~/` to the user's home directory.
///
/// A `~` anywhere else in the string is left untouched.
pub fn expand_user(p: &str) -> String {
    let p = p.trim();
    if p.is_empty() {
        return String::new();
    }
    if p == "~" || p.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            if p == "~" {
                return home.display().to_string();
            }
            let mut out = PathBuf::from(home);
            out.push(&p[2..]);
            return out.display().to_string();
        }
    }
    p.to_string()
}
