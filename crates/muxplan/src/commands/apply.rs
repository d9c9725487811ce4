use clap::ArgMatches;
use tracing::{info, warn};

use muxplan_core::{render_dry_run, Executor};

use super::helpers::compile_from_matches;
use crate::config;

pub(crate) fn handle_apply_command(
    matches: &ArgMatches,
) -> Result<(), Box<dyn std::error::Error>> {
    let compiled = match compile_from_matches(matches) {
        Ok(compiled) => compiled,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Err(e);
        }
    };

    let dry_run = matches.get_flag("dry-run");
    if dry_run {
        println!("{}", render_dry_run(&compiled.compiled));
        return Ok(());
    }

    info!(
        event = "cli.apply_started",
        spec = %compiled.spec_path.display(),
        session = compiled.session_name.as_str(),
        commands = compiled.compiled.commands.len()
    );

    let runner = match config::runner_from_env() {
        Ok(runner) => runner,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Err(e.into());
        }
    };
    let executor = Executor::new(Box::new(runner));

    match executor.execute(&compiled.compiled, false) {
        Ok(_) => {
            for w in &compiled.compiled.warnings {
                eprintln!("Warning: {}", w);
            }
            println!(
                "Session '{}' applied ({} commands).",
                compiled.session_name,
                compiled.compiled.commands.len()
            );
            info!(event = "cli.apply_completed", session = compiled.session_name.as_str());
            Ok(())
        }
        Err(e) if e.is_server_gone() => {
            // The server went away mid-plan (client detached, server
            // killed). Expected during teardown; exit cleanly.
            warn!(event = "cli.apply_server_gone", error = %e);
            eprintln!("muxplan: tmux server exited; stopping");
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            Err(e.into())
        }
    }
}
