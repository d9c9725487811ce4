use muxplan_core::init_logging;

mod app;
mod commands;
mod config;

fn main() {
    let app = app::build_cli();
    let matches = app.get_matches();

    let verbose = matches.get_flag("verbose");
    let quiet = !verbose;
    init_logging(quiet);

    if let Err(e) = commands::run_command(&matches) {
        // Error already printed to the user via eprintln! in the handlers;
        // verbose mode also emitted JSON logs. Exit non-zero without
        // dumping a Debug representation.
        drop(e);
        std::process::exit(1);
    }
}
