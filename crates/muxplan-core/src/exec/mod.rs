//! Plan execution.
//!
//! The executor iterates a compiled command list strictly in order. Most
//! commands are forwarded verbatim to the [`Runner`]; the two sentinel
//! commands (`__wait_for_prompt__`, `__ssh_manager_connect__`) are handled
//! internally and never reach the runner. Ordering matters: layout
//! construction is order-sensitive (a split changes the active pane), so
//! nothing is batched or reordered and every command's side effects are
//! observable before the next command starts.

pub mod connect;
pub mod errors;
pub mod gate;

pub use errors::ExecError;

use tracing::{info, warn};

use crate::plan::{
    dry_run_lines, Compiled, SENTINEL_SSH_MANAGER_CONNECT, SENTINEL_WAIT_FOR_PROMPT,
};
use crate::runner::Runner;

/// Drives a compiled plan against a runner.
pub struct Executor {
    runner: Box<dyn Runner>,
}

impl Executor {
    pub fn new(runner: Box<dyn Runner>) -> Self {
        Self { runner }
    }

    /// Execute the plan, or just render it when `dry_run` is set.
    ///
    /// Returns the dry-run lines in both cases; callers log them as the
    /// canonical record of what was (or would have been) executed. A
    /// failing command aborts the remaining plan unless it was compiled
    /// from an action marked `ignore_error`.
    pub fn execute(&self, compiled: &Compiled, dry_run: bool) -> Result<Vec<String>, ExecError> {
        let lines = dry_run_lines(compiled);
        if dry_run {
            return Ok(lines);
        }

        info!(
            event = "core.exec.plan_started",
            commands = compiled.commands.len()
        );

        for (i, command) in compiled.commands.iter().enumerate() {
            let result = self.execute_one(&command.args);

            if let Err(e) = result {
                if command.ignore_error {
                    warn!(
                        event = "core.exec.command_failed_ignored",
                        index = i,
                        error = %e
                    );
                    continue;
                }
                return Err(e);
            }
        }

        info!(event = "core.exec.plan_completed");
        Ok(lines)
    }

    fn execute_one(&self, args: &[String]) -> Result<(), ExecError> {
        match args.first().map(String::as_str) {
            Some(SENTINEL_WAIT_FOR_PROMPT) => gate::wait_for_prompt(self.runner.as_ref(), args),
            Some(SENTINEL_SSH_MANAGER_CONNECT) => {
                connect::ssh_manager_connect(self.runner.as_ref(), args)
            }
            _ => self.runner.run(args).map_err(ExecError::from),
        }
    }
}
