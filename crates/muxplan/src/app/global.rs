use clap::{Arg, ArgAction, Command};

pub fn root_command() -> Command {
    Command::new("muxplan")
        .about("Compile and apply declarative tmux session specs")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(false)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Emit JSON logs to stderr")
                .action(ArgAction::SetTrue)
                .global(true),
        )
}
