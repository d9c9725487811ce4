//! tmux-safe name validation and session-name derivation.
//!
//! tmux itself is permissive, but `:` and `.` in names break target syntax
//! (`session:window.pane`), so a conservative subset is enforced.

use std::path::MAIN_SEPARATOR;
use std::sync::OnceLock;

use regex::Regex;

use super::errors::SpecError;

fn name_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("static name pattern"))
}

/// Validate a tmux session/window name against the conservative subset.
pub fn validate_tmux_name(name: &str) -> Result<(), SpecError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SpecError::InvalidName {
            name: String::new(),
        });
    }
    if !name_pattern().is_match(name) {
        return Err(SpecError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Derive a tmux-safe session name from an optional prefix and the project
/// path basename. Collision handling is the caller's concern.
pub fn derive_session_name(prefix: &str, project_path: &str) -> String {
    let trimmed = project_path.trim_end_matches(MAIN_SEPARATOR);
    let base = trimmed
        .rsplit(MAIN_SEPARATOR)
        .next()
        .unwrap_or(trimmed);
    let base = sanitize_name(base);

    let prefix = sanitize_name(prefix.trim());
    if prefix.is_empty() {
        base
    } else {
        format!("{}-{}", prefix, base)
    }
}

/// Reduce an arbitrary string to the tmux-safe charset: lowercase, spaces
/// and path separators become `-`, everything else outside `[a-z0-9_-]` is
/// dropped, leading/trailing `-`/`_` trimmed, runs collapsed.
pub fn sanitize_name(s: &str) -> String {
    let s = s.trim().to_lowercase();
    if s.is_empty() {
        return String::new();
    }

    let mapped: String = s
        .chars()
        .map(|c| {
            if c == ' ' || c == MAIN_SEPARATOR {
                '-'
            } else {
                c
            }
        })
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();

    let collapsed = collapse_repeats(&collapse_repeats(&mapped, '-'), '_');
    let out = collapsed.trim_matches(|c| c == '-' || c == '_').to_string();
    if out.is_empty() {
        "session".to_string()
    } else {
        out
    }
}

fn collapse_repeats(s: &str, ch: char) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev: Option<char> = None;
    for c in s.chars() {
        if c == ch && prev == Some(ch) {
            continue;
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_tmux_name_accepts_safe_names() {
        assert!(validate_tmux_name("dev").is_ok());
        assert!(validate_tmux_name("my-project_2").is_ok());
        assert!(validate_tmux_name("A1").is_ok());
    }

    #[test]
    fn test_validate_tmux_name_rejects_target_breaking_chars() {
        for bad in ["my:session", "a.b", "with space", "emoji🎉", ""] {
            assert!(
                validate_tmux_name(bad).is_err(),
                "should reject {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_derive_session_name_from_basename() {
        assert_eq!(derive_session_name("", "/home/me/MyProject"), "myproject");
        assert_eq!(derive_session_name("", "/srv/apps/web-api/"), "web-api");
    }

    #[test]
    fn test_derive_session_name_with_prefix() {
        assert_eq!(derive_session_name("dev", "/home/me/demo"), "dev-demo");
        assert_eq!(
            derive_session_name("Team X", "/home/me/demo"),
            "team-x-demo"
        );
    }

    #[test]
    fn test_sanitize_name_replaces_and_collapses() {
        assert_eq!(sanitize_name("My Cool App"), "my-cool-app");
        assert_eq!(sanitize_name("a//b"), "a-b");
        assert_eq!(sanitize_name("--x--"), "x");
        assert_eq!(sanitize_name("a!!!b"), "a-b");
    }

    #[test]
    fn test_sanitize_name_empty_falls_back() {
        assert_eq!(sanitize_name("!!!"), "session");
        assert_eq!(sanitize_name(""), "");
    }
}
