use clap::{Arg, ArgAction, Command};

fn spec_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("spec")
            .help("Path to the spec file (.muxplan.yaml/.yml/.json)")
            .required(true)
            .index(1),
    )
    .arg(
        Arg::new("project")
            .long("project")
            .short('p')
            .help("Project root for ${PROJECT_PATH} and cwd defaults (default: spec file directory)"),
    )
    .arg(
        Arg::new("session")
            .long("session")
            .short('s')
            .help("Session name override (default: spec session.name, then project name)"),
    )
    .arg(
        Arg::new("allow-shell")
            .long("allow-shell")
            .help("Permit shell actions declared in the spec (unsafe)")
            .action(ArgAction::SetTrue),
    )
    .arg(
        Arg::new("allow-tmux-passthrough")
            .long("allow-tmux-passthrough")
            .help("Permit raw tmux actions declared in the spec (unsafe, allowlisted)")
            .action(ArgAction::SetTrue),
    )
    .arg(
        Arg::new("ensure-session")
            .long("ensure-session")
            .help("Prepend a create-session step instead of assuming the session exists")
            .action(ArgAction::SetTrue),
    )
}

pub fn preview_command() -> Command {
    spec_args(
        Command::new("preview")
            .about("Compile a spec and print the tmux commands without executing"),
    )
}

pub fn apply_command() -> Command {
    spec_args(
        Command::new("apply").about("Compile a spec and execute it against the tmux server"),
    )
    .arg(
        Arg::new("dry-run")
            .long("dry-run")
            .help("Print the compiled plan instead of executing it")
            .action(ArgAction::SetTrue),
    )
}
