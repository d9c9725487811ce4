mod apply;
mod helpers;
mod preview;

use clap::ArgMatches;

pub(crate) fn run_command(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    match matches.subcommand() {
        Some(("preview", sub)) => preview::handle_preview_command(sub),
        Some(("apply", sub)) => apply::handle_apply_command(sub),
        _ => {
            eprintln!("No command specified. Try 'muxplan --help'.");
            Err("no command specified".into())
        }
    }
}
