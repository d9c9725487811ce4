use clap::ArgMatches;
use tracing::info;

use muxplan_core::render_dry_run;

use super::helpers::compile_from_matches;

pub(crate) fn handle_preview_command(
    matches: &ArgMatches,
) -> Result<(), Box<dyn std::error::Error>> {
    let compiled = match compile_from_matches(matches) {
        Ok(compiled) => compiled,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Err(e);
        }
    };

    info!(
        event = "cli.preview_completed",
        spec = %compiled.spec_path.display(),
        session = compiled.session_name.as_str()
    );

    println!("{}", render_dry_run(&compiled.compiled));
    Ok(())
}
