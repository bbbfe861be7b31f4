use anyhow::Result;
use human_panic::setup_panic;
use siteval::cli::run_cli;
use siteval::log;

fn main() {
    setup_panic!();

    if let Err(err) = execute_cli_command() {
        if log::is_logger_initialised() {
            ::log::error!("{err:?}");
        } else {
            eprintln!("Error: {err:?}");
        }

        // Terminate program, signalling an error
        std::process::exit(1);
    }
}

fn execute_cli_command() -> Result<()> {
    run_cli()
}
