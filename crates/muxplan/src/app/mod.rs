mod global;
mod spec;

use clap::Command;

pub fn build_cli() -> Command {
    global::root_command()
        .subcommand(spec::preview_command())
        .subcommand(spec::apply_command())
}
