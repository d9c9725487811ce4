//! The `wait_for_prompt` readiness gate.
//!
//! Approximates an expect(1) sequence without shell passthrough: poll the
//! target pane's visible output (`capture-pane -p`) until it has been quiet
//! for a minimum window AND its last non-blank line looks like a prompt,
//! then optionally settle before letting the plan proceed. Transient
//! capture failures are retried until the deadline.

use std::time::{Duration, Instant};

use regex::Regex;
use tracing::debug;

use crate::plan::SENTINEL_WAIT_FOR_PROMPT;
use crate::runner::Runner;

use super::errors::ExecError;

/// Conservative default: a prompt-like last line ending in a common prompt
/// terminator.
pub const DEFAULT_PROMPT_REGEX: &str = r"(?m)(^.*[#>$] ?$)";

const POLL_EVERY: Duration = Duration::from_millis(100);

/// Handle a `__wait_for_prompt__` sentinel.
///
/// Argv encoding (from the compiler):
/// `["__wait_for_prompt__", target, timeout_ms, min_quiet_ms, settle_ms, max_lines, prompt_regex]`
pub fn wait_for_prompt(runner: &dyn Runner, args: &[String]) -> Result<(), ExecError> {
    if args.len() < 6 {
        return Err(ExecError::invalid_sentinel(
            SENTINEL_WAIT_FOR_PROMPT,
            format!("expected at least 6 args, got {}", args.len()),
        ));
    }

    let target = args[1].trim();
    if target.is_empty() {
        return Err(ExecError::invalid_sentinel(
            SENTINEL_WAIT_FOR_PROMPT,
            "empty target",
        ));
    }

    let timeout_ms = match parse_or(&args[2], 15000) {
        n if n <= 0 => 15000,
        n => n,
    };
    let min_quiet_ms = parse_or(&args[3], 500).max(0);
    let settle_ms = parse_or(&args[4], 250).max(0);
    let max_lines = match parse_or(&args[5], 200) {
        n if n <= 0 => 200,
        n => n,
    };

    let pattern = {
        let raw = args.get(6).map(|s| s.trim()).unwrap_or("");
        if raw.is_empty() {
            DEFAULT_PROMPT_REGEX
        } else {
            raw
        }
    };

    // Compiled lazily, here, so a bad user-supplied pattern surfaces as an
    // executor error instead of a startup panic.
    let prompt = Regex::new(pattern).map_err(|e| ExecError::InvalidPromptRegex {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;

    debug!(
        event = "core.exec.gate_started",
        target = target,
        timeout_ms = timeout_ms,
        min_quiet_ms = min_quiet_ms
    );

    let deadline = Instant::now() + Duration::from_millis(timeout_ms as u64);
    let min_quiet = Duration::from_millis(min_quiet_ms as u64);

    let mut last_snapshot = String::new();
    let mut last_change = Instant::now();

    while Instant::now() < deadline {
        let snapshot = match capture(runner, target, max_lines) {
            Ok(snapshot) => snapshot,
            Err(_) => {
                // Transient capture failure (pane mid-creation, server
                // busy); keep trying until the deadline.
                std::thread::sleep(POLL_EVERY);
                continue;
            }
        };

        if snapshot != last_snapshot {
            last_snapshot = snapshot.clone();
            last_change = Instant::now();
        }

        if last_change.elapsed() < min_quiet {
            std::thread::sleep(POLL_EVERY);
            continue;
        }

        let last_line = last_non_blank_line(&snapshot);
        if !last_line.is_empty() && prompt.is_match(last_line) {
            if settle_ms > 0 {
                std::thread::sleep(Duration::from_millis(settle_ms as u64));
            }
            debug!(event = "core.exec.gate_ready", target = target);
            return Ok(());
        }

        std::thread::sleep(POLL_EVERY);
    }

    Err(ExecError::GateTimeout {
        timeout_ms,
        target: target.to_string(),
    })
}

fn parse_or(s: &str, default: i64) -> i64 {
    let s = s.trim();
    if s.is_empty() {
        return default;
    }
    s.parse().unwrap_or(default)
}

/// Capture the last `max_lines` lines of the pane, normalized for stable
/// quiet detection (CRLF/CR to LF, trailing newlines trimmed).
fn capture(runner: &dyn Runner, target: &str, max_lines: i64) -> Result<String, ExecError> {
    let out = runner.run_output(&[
        "capture-pane".to_string(),
        "-p".to_string(),
        "-t".to_string(),
        target.to_string(),
        "-S".to_string(),
        format!("-{}", max_lines),
    ])?;
    let out = out.replace("\r\n", "\n").replace('\r', "\n");
    Ok(out.trim_end_matches('\n').to_string())
}

fn last_non_blank_line(s: &str) -> &str {
    s.lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("")
}
